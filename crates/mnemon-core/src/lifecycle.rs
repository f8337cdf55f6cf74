//! Lifecycle: Effective Importance, Immunity, Pruning
//!
//! Effective importance (EI) is the derived scalar behind pruning decisions:
//!
//! ```text
//! EI = base_weight(importance)
//!    * max(1, ln(1 + access_count))
//!    * 0.5 ^ (days_since_access / 30)
//!    * (1 + 0.1 * min(incident_edges, 5))
//! ```
//!
//! Immunity (importance >= 4 or access_count >= 3) excludes an insight from
//! auto-pruning. Pruning runs inside the write transaction once the active
//! set exceeds 1000, removing at most ten lowest-EI non-immune insights.

use chrono::{DateTime, Utc};
use rusqlite::{Transaction, params};
use std::collections::HashMap;

use crate::config::{
    ACTIVE_INSIGHT_CAP, DECAY_HALF_LIFE_DAYS, EDGE_FACTOR_CAP, EDGE_FACTOR_STEP,
    IMMUNITY_ACCESS_MIN, IMMUNITY_IMPORTANCE_MIN, PRUNE_BATCH_MAX,
};
use crate::error::Result;

// ============================================================================
// FORMULA
// ============================================================================

/// Importance tier weight
pub fn base_weight(importance: i32) -> f64 {
    match importance {
        5 => 1.0,
        4 => 0.8,
        3 => 0.5,
        2 => 0.3,
        _ => 0.15,
    }
}

/// Deterministic effective-importance formula
pub fn effective_importance(
    importance: i32,
    access_count: i64,
    days_since_access: f64,
    edge_count: i64,
) -> f64 {
    let access_factor = (1.0 + access_count as f64).ln().max(1.0);
    let decay_factor = 0.5_f64.powf(days_since_access.max(0.0) / DECAY_HALF_LIFE_DAYS);
    let edge_factor = 1.0 + EDGE_FACTOR_STEP * edge_count.min(EDGE_FACTOR_CAP) as f64;
    base_weight(importance) * access_factor * decay_factor * edge_factor
}

/// Prune immunity: high importance or repeated access
pub fn is_immune(importance: i32, access_count: i64) -> bool {
    importance >= IMMUNITY_IMPORTANCE_MIN || access_count >= IMMUNITY_ACCESS_MIN
}

fn days_since(now: DateTime<Utc>, then: DateTime<Utc>) -> f64 {
    (now - then).num_milliseconds().max(0) as f64 / 86_400_000.0
}

// ============================================================================
// TRANSACTION APPLIERS
// ============================================================================

/// Incident edge rows per insight id
fn incident_edge_counts(tx: &Transaction<'_>) -> Result<HashMap<String, i64>> {
    let mut counts: HashMap<String, i64> = HashMap::new();
    let mut stmt = tx.prepare(
        "SELECT source_id, COUNT(*) FROM edges GROUP BY source_id
         UNION ALL
         SELECT target_id, COUNT(*) FROM edges GROUP BY target_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (id, count) = row?;
        *counts.entry(id).or_default() += count;
    }
    Ok(counts)
}

/// Recompute EI for every active insight
pub(crate) fn refresh_all(tx: &Transaction<'_>, now: DateTime<Utc>) -> Result<()> {
    let edge_counts = incident_edge_counts(tx)?;

    let mut stmt = tx.prepare(
        "SELECT id, importance, access_count, last_accessed_at, created_at
         FROM insights WHERE deleted_at IS NULL",
    )?;
    let rows: Vec<(String, i32, i64, Option<DateTime<Utc>>, DateTime<Utc>)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?
        .collect::<std::result::Result<_, _>>()?;
    drop(stmt);

    let mut update = tx.prepare("UPDATE insights SET effective_importance = ?1 WHERE id = ?2")?;
    for (id, importance, access_count, last_accessed_at, created_at) in rows {
        let reference = last_accessed_at.unwrap_or(created_at);
        let ei = effective_importance(
            importance,
            access_count,
            days_since(now, reference),
            edge_counts.get(&id).copied().unwrap_or(0),
        );
        update.execute(params![ei, id])?;
    }

    Ok(())
}

/// Recompute EI for a single insight and return the new value
pub(crate) fn refresh_one(tx: &Transaction<'_>, id: &str, now: DateTime<Utc>) -> Result<f64> {
    let (importance, access_count, last_accessed_at, created_at): (
        i32,
        i64,
        Option<DateTime<Utc>>,
        DateTime<Utc>,
    ) = tx.query_row(
        "SELECT importance, access_count, last_accessed_at, created_at
         FROM insights WHERE id = ?1",
        params![id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;

    let edge_count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM edges WHERE source_id = ?1 OR target_id = ?1",
        params![id],
        |row| row.get(0),
    )?;

    let reference = last_accessed_at.unwrap_or(created_at);
    let ei = effective_importance(
        importance,
        access_count,
        days_since(now, reference),
        edge_count,
    );
    tx.execute(
        "UPDATE insights SET effective_importance = ?1 WHERE id = ?2",
        params![ei, id],
    )?;
    Ok(ei)
}

/// Soft-delete the lowest-EI non-immune insights once the active set
/// exceeds its cap; returns the pruned ids
pub(crate) fn prune(tx: &Transaction<'_>, now: DateTime<Utc>) -> Result<Vec<String>> {
    let active: i64 = tx.query_row(
        "SELECT COUNT(*) FROM insights WHERE deleted_at IS NULL",
        [],
        |row| row.get(0),
    )?;
    if active <= ACTIVE_INSIGHT_CAP as i64 {
        return Ok(Vec::new());
    }

    let mut stmt = tx.prepare(
        "SELECT id FROM insights
         WHERE deleted_at IS NULL AND importance < ?1 AND access_count < ?2
         ORDER BY effective_importance ASC, id ASC
         LIMIT ?3",
    )?;
    let victims: Vec<String> = stmt
        .query_map(
            params![
                IMMUNITY_IMPORTANCE_MIN,
                IMMUNITY_ACCESS_MIN,
                PRUNE_BATCH_MAX as i64
            ],
            |row| row.get(0),
        )?
        .collect::<std::result::Result<_, _>>()?;
    drop(stmt);

    for id in &victims {
        tx.execute(
            "UPDATE insights SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        tx.execute(
            "DELETE FROM edges WHERE source_id = ?1 OR target_id = ?1",
            params![id],
        )?;
        tracing::debug!(id = %id, "auto-pruned low-EI insight");
    }

    Ok(victims)
}

// ============================================================================
// TESTS
// ============================================================================
