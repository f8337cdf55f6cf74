//! Engine configuration constants.
//!
//! Every threshold, cap, and weight the engine uses is a named constant here.
//! They are immutable process-wide state; nothing in the engine mutates them
//! after startup.

use std::time::Duration;

// ============================================================================
// DATA MODEL LIMITS
// ============================================================================

/// Maximum insight content length in characters
pub const MAX_CONTENT_LEN: usize = 8000;

/// Maximum tags per insight
pub const MAX_TAGS: usize = 20;

/// Maximum entities per insight (excess is silently truncated)
pub const MAX_ENTITIES: usize = 50;

/// Importance range (inclusive)
pub const MIN_IMPORTANCE: i32 = 1;
pub const MAX_IMPORTANCE: i32 = 5;

// ============================================================================
// EMBEDDINGS
// ============================================================================

/// Expected embedding dimension for the default model
pub const DEFAULT_EMBEDDING_DIM: usize = 768;

/// Hard timeout on every embedding call; a timeout degrades to
/// "embedding unavailable" with no retry
pub const EMBED_TIMEOUT: Duration = Duration::from_secs(2);

/// Default Ollama-compatible endpoint
pub const DEFAULT_EMBED_ENDPOINT: &str = "http://127.0.0.1:11434";

/// Default embedding model name
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

/// Query-embedding LRU cache capacity
pub const QUERY_CACHE_CAPACITY: usize = 100;

// ============================================================================
// DEDUPLICATION / CONFLICT DIFF
// ============================================================================

/// Above this similarity the new insight is skipped as a duplicate
pub const DIFF_SKIP_MIN: f64 = 0.90;

/// At or above this similarity (and not a skip) the prior insight is replaced
pub const DIFF_REPLACE_MIN: f64 = 0.65;

/// Cosine overrides token overlap once it reaches this bar
pub const DIFF_COSINE_AUTHORITATIVE_MIN: f64 = 0.70;

// ============================================================================
// EDGE SYNTHESIS
// ============================================================================

/// Proximity window for temporal edges
pub const PROXIMITY_WINDOW_HOURS: f64 = 24.0;

/// Maximum proximity partners per insert
pub const PROXIMITY_EDGE_CAP: usize = 10;

/// Maximum co-occurrence partners per entity
pub const ENTITY_PEERS_PER_ENTITY: usize = 5;

/// Hard cap on entity edge rows per insert
pub const ENTITY_EDGE_CAP: usize = 50;

/// How many recent insights the causal builder scans
pub const CAUSAL_SCAN_RECENT: usize = 10;

/// Minimum token overlap (of the smaller set) for a causal link
pub const CAUSAL_OVERLAP_MIN: f64 = 0.15;

/// Cosine similarity at or above which semantic edges are created
pub const SEMANTIC_AUTO_LINK_MIN: f64 = 0.80;

/// Maximum semantic auto-link partners per insert
pub const SEMANTIC_AUTO_LINK_CAP: usize = 3;

/// Token-overlap floor for semantic auto-links when cosine is absent
pub const TOKEN_AUTO_LINK_MIN: f64 = 0.10;

/// When cosine is present but below the auto-link bar, token overlap must
/// clear this bar before it may auto-link anyway
pub const TOKEN_OVERRIDE_BAR: f64 = 0.70;

// ============================================================================
// CANDIDATE SURFACING
// ============================================================================

/// Lower cosine bound for advisory semantic candidates
pub const SEMANTIC_SURFACE_MIN: f64 = 0.40;

/// Maximum advisory semantic candidates
pub const SEMANTIC_SURFACE_CAP: usize = 5;

/// BFS radius for advisory causal candidates
pub const CAUSAL_SURFACE_HOPS: usize = 2;

/// Maximum advisory causal candidates
pub const CAUSAL_SURFACE_CAP: usize = 10;

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Half-life of the access-recency decay, in days
pub const DECAY_HALF_LIFE_DAYS: f64 = 30.0;

/// Connectivity bonus per incident edge
pub const EDGE_FACTOR_STEP: f64 = 0.1;

/// Incident edges counted toward the connectivity bonus
pub const EDGE_FACTOR_CAP: i64 = 5;

/// Importance at or above which an insight is prune-immune
pub const IMMUNITY_IMPORTANCE_MIN: i32 = 4;

/// Access count at or above which an insight is prune-immune
pub const IMMUNITY_ACCESS_MIN: i64 = 3;

/// Active insights allowed before auto-pruning kicks in
pub const ACTIVE_INSIGHT_CAP: usize = 1000;

/// Maximum insights pruned per write
pub const PRUNE_BATCH_MAX: usize = 10;

/// Access-count increment applied by boost ("keep")
pub const BOOST_INCREMENT: i64 = 3;

// ============================================================================
// OP-LOG
// ============================================================================

/// Most recent operations retained in the op-log
pub const OPLOG_CAP: usize = 5000;

// ============================================================================
// RECALL
// ============================================================================

/// Reciprocal rank fusion constant
pub const RRF_K: f64 = 60.0;

/// Per-signal anchor list length
pub const ANCHOR_SIGNAL_LIMIT: usize = 20;

/// Minimum cosine for the vector anchor signal
pub const VECTOR_ANCHOR_SIM_MIN: f64 = 0.10;

/// Structural contribution weight during traversal (lambda 1)
pub const TRAVERSAL_STRUCTURAL_WEIGHT: f64 = 1.0;

/// Semantic contribution weight during traversal (lambda 2)
pub const TRAVERSAL_SEMANTIC_WEIGHT: f64 = 0.4;

/// Default recall result count
pub const DEFAULT_RECALL_LIMIT: usize = 10;
