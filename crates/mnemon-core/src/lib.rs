//! # Mnemon Core
//!
//! Persistent memory engine for LLM-driven agents:
//!
//! - **Four-layer typed graph**: temporal, entity, causal, and semantic
//!   edges synthesized automatically on every write
//! - **Atomic write pipeline**: dedup/conflict diff, insert or replace,
//!   edge synthesis, effective-importance refresh, and bounded pruning as
//!   one transaction
//! - **Intent-adaptive recall**: bilingual intent detection, four anchor
//!   signals fused by reciprocal rank fusion, beam-search graph traversal,
//!   multi-factor re-ranking, and causal topological ordering for WHY
//! - **Effective-importance decay**: base importance, access history,
//!   30-day half-life, and connectivity combine into the pruning score
//! - **Embedding-aware fallback**: a remote Ollama-compatible provider when
//!   reachable, token overlap otherwise; failures never surface as errors
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mnemon_core::{RememberInput, RecallInput, Store};
//!
//! let store = Store::open("/path/to/mnemon.db".into())?;
//!
//! let outcome = store.remember(RememberInput {
//!     content: "Chose Qdrant over Milvus for vector DB".to_string(),
//!     importance: 5,
//!     ..Default::default()
//! })?;
//!
//! let response = store.recall(RecallInput {
//!     query: "why did we choose Qdrant".to_string(),
//!     ..Default::default()
//! })?;
//! ```

// ============================================================================
// MODULES
// ============================================================================

pub mod config;
pub mod dedup;
pub mod embeddings;
pub mod error;
pub mod extract;
pub mod graph;
pub mod lifecycle;
pub mod memory;
pub mod recall;
pub mod similarity;
pub mod storage;
pub mod surface;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Memory types
pub use memory::{
    Action, Category, CausalLink, Edge, EdgeMetadata, EdgeType, Insight, RememberInput,
    RememberOutcome, Source, TemporalSubType,
};

// Graph
pub use graph::EdgeCounts;

// Lifecycle math
pub use lifecycle::{base_weight, effective_importance, is_immune};

// Recall pipeline
pub use recall::{
    Intent, RecallInput, RecallMeta, RecallResponse, RecallResult, RecallSignals,
    reciprocal_rank_fusion,
};

// Candidate surfacing
pub use surface::{CausalCandidate, SemanticCandidate};

// Storage layer
pub use storage::{
    BoostOutcome, EmbedBackfill, ForgetOutcome, LinkOutcome, OpLogEntry, PruneCandidate,
    RelatedInsight, SearchHit, Store, StoreStatus,
};

// Errors
pub use error::{Result, StoreError};

// Embeddings
pub use embeddings::{Embedding, EmbeddingClient, EmbeddingError, cosine_similarity};

// Extraction
pub use extract::extract_entities;

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Action, Category, EdgeType, Insight, Intent, RecallInput, RecallResponse, RememberInput,
        RememberOutcome, Result, Source, Store, StoreError,
    };
}
