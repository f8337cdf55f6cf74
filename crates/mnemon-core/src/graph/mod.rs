//! Graph Edge Synthesis
//!
//! Four builders (temporal, entity, causal, semantic) run inside the write
//! transaction after the new insight is inserted. Each consumes the new
//! insight and the active set and reports the count of edge rows it created.
//! Bidirectional links are two directed rows.

pub(crate) mod causal;
pub(crate) mod entity;
pub(crate) mod semantic;
pub(crate) mod temporal;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::{Transaction, params};
use serde::{Deserialize, Serialize};

use crate::embeddings::Embedding;
use crate::error::Result;
use crate::memory::{EdgeMetadata, EdgeType, Source};
use crate::similarity::tokenize;

pub(crate) use causal::detect_causal_signal;

// ============================================================================
// EDGE COUNTS
// ============================================================================

/// Edge rows created per layer during one write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeCounts {
    pub temporal: usize,
    pub entity: usize,
    pub causal: usize,
    pub semantic: usize,
}

impl EdgeCounts {
    /// Sum across all layers
    pub fn total(&self) -> usize {
        self.temporal + self.entity + self.causal + self.semantic
    }
}

// ============================================================================
// ACTIVE-SET SNAPSHOT
// ============================================================================

/// In-memory snapshot of an active insight, shared by the builders, the
/// diff, anchor selection, and candidate surfacing
#[derive(Debug, Clone)]
pub(crate) struct PeerSnapshot {
    pub id: String,
    pub content: String,
    pub source: Source,
    pub created_at: DateTime<Utc>,
    pub entities: Vec<String>,
    pub embedding: Option<Embedding>,
    pub tokens: HashSet<String>,
}

impl PeerSnapshot {
    pub fn new(
        id: String,
        content: String,
        source: Source,
        created_at: DateTime<Utc>,
        entities: Vec<String>,
        embedding: Option<Embedding>,
    ) -> Self {
        let tokens = tokenize(&content);
        Self {
            id,
            content,
            source,
            created_at,
            entities,
            embedding,
            tokens,
        }
    }
}

// ============================================================================
// EDGE WRITERS
// ============================================================================

/// Upsert one directed edge row; the (source, target, type) key is unique
pub(crate) fn upsert_edge(
    tx: &Transaction<'_>,
    source_id: &str,
    target_id: &str,
    edge_type: EdgeType,
    weight: f64,
    metadata: &EdgeMetadata,
    created_at: DateTime<Utc>,
) -> Result<()> {
    tx.execute(
        "INSERT INTO edges (source_id, target_id, edge_type, weight, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(source_id, target_id, edge_type)
         DO UPDATE SET weight = excluded.weight, metadata = excluded.metadata",
        params![
            source_id,
            target_id,
            edge_type.as_str(),
            weight,
            metadata.to_json(),
            created_at,
        ],
    )?;
    Ok(())
}

/// Insert both directions of a bidirectional link; returns rows written
pub(crate) fn insert_bidirectional(
    tx: &Transaction<'_>,
    a: &str,
    b: &str,
    edge_type: EdgeType,
    weight: f64,
    metadata: &EdgeMetadata,
    created_at: DateTime<Utc>,
) -> Result<usize> {
    upsert_edge(tx, a, b, edge_type, weight, metadata, created_at)?;
    upsert_edge(tx, b, a, edge_type, weight, metadata, created_at)?;
    Ok(2)
}
