//! Read Pipeline (Smart Recall)
//!
//! Intent detection, multi-signal anchor selection fused by reciprocal rank
//! fusion, intent-adaptive beam-search traversal of the four-layer graph,
//! multi-factor re-ranking, and a causal topological sort for WHY queries.

pub(crate) mod anchors;
pub mod intent;
pub(crate) mod rerank;
pub(crate) mod topo;
pub(crate) mod traversal;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_RECALL_LIMIT;
use crate::memory::{Category, EdgeType, Source};

pub use anchors::reciprocal_rank_fusion;
pub use intent::Intent;
pub use rerank::RecallSignals;

// ============================================================================
// INPUT
// ============================================================================

/// Input for a recall query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecallInput {
    /// Search query
    pub query: String,
    /// Maximum results to return
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Caller override of the detected intent
    #[serde(default)]
    pub intent: Option<Intent>,
    /// Restrict to one category
    #[serde(default)]
    pub category: Option<Category>,
    /// Restrict to one source
    #[serde(default)]
    pub source: Option<Source>,
    /// Skip graph traversal; rank anchors directly
    #[serde(default)]
    pub basic: bool,
}

fn default_limit() -> usize {
    DEFAULT_RECALL_LIMIT
}

impl Default for RecallInput {
    fn default() -> Self {
        Self {
            query: String::new(),
            limit: DEFAULT_RECALL_LIMIT,
            intent: None,
            category: None,
            source: None,
            basic: false,
        }
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

/// One ranked recall hit with its signal breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallResult {
    pub id: String,
    pub content: String,
    pub category: Category,
    pub importance: i32,
    pub tags: Vec<String>,
    pub entities: Vec<String>,
    pub source: Source,
    pub created_at: DateTime<Utc>,
    /// Final weighted score
    pub score: f64,
    /// The four rerank signals, verbatim
    pub signals: RecallSignals,
    /// Edge layer that led the traversal to this insight
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<EdgeType>,
    /// Intent the pipeline ran under
    pub intent: Intent,
}

/// Query-level metadata returned alongside the results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallMeta {
    pub intent: Intent,
    pub anchors: usize,
    pub candidates: usize,
    pub embedded: bool,
}

/// Full recall response: meta + ranked results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallResponse {
    pub meta: RecallMeta,
    pub results: Vec<RecallResult>,
}
