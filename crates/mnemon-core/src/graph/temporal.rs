//! Temporal edge builder
//!
//! Backbone: one bidirectional link to the most recent active insight from
//! the same source. Proximity: bidirectional links to insights created
//! within the 24-hour window, weighted 1/(1 + hours apart), at most ten
//! partners per insert.

use rusqlite::Transaction;

use crate::config::{PROXIMITY_EDGE_CAP, PROXIMITY_WINDOW_HOURS};
use crate::error::Result;
use crate::memory::{EdgeMetadata, EdgeType, TemporalSubType};

use super::{PeerSnapshot, insert_bidirectional};

fn hours_between(a: chrono::DateTime<chrono::Utc>, b: chrono::DateTime<chrono::Utc>) -> f64 {
    (a - b).num_milliseconds().abs() as f64 / 3_600_000.0
}

/// Synthesize temporal edges for the new insight; returns rows written
pub(crate) fn synthesize(
    tx: &Transaction<'_>,
    new: &PeerSnapshot,
    peers: &[PeerSnapshot],
) -> Result<usize> {
    let mut rows = 0;

    // Backbone: latest active insight from the same source
    let backbone = peers
        .iter()
        .filter(|p| p.source == new.source)
        .max_by_key(|p| p.created_at);

    if let Some(peer) = backbone {
        let metadata = EdgeMetadata::Temporal {
            sub_type: TemporalSubType::Backbone,
            hours_diff: hours_between(new.created_at, peer.created_at),
        };
        rows += insert_bidirectional(
            tx,
            &new.id,
            &peer.id,
            EdgeType::Temporal,
            1.0,
            &metadata,
            new.created_at,
        )?;
    }

    // Proximity: everything inside the window, closest first, minus the
    // backbone partner (its edge would be overwritten on the shared key)
    let backbone_id = backbone.map(|p| p.id.as_str());
    let mut nearby: Vec<(&PeerSnapshot, f64)> = peers
        .iter()
        .filter(|p| Some(p.id.as_str()) != backbone_id)
        .map(|p| (p, hours_between(new.created_at, p.created_at)))
        .filter(|(_, hours)| *hours <= PROXIMITY_WINDOW_HOURS)
        .collect();
    nearby.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)));

    for (peer, hours) in nearby.into_iter().take(PROXIMITY_EDGE_CAP) {
        let metadata = EdgeMetadata::Temporal {
            sub_type: TemporalSubType::Proximity,
            hours_diff: hours,
        };
        rows += insert_bidirectional(
            tx,
            &new.id,
            &peer.id,
            EdgeType::Temporal,
            1.0 / (1.0 + hours),
            &metadata,
            new.created_at,
        )?;
    }

    Ok(rows)
}
