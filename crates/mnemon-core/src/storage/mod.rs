//! Storage Module
//!
//! SQLite-based storage layer with:
//! - WAL journaling and a multi-reader / single-writer discipline
//! - The atomic write pipeline (diff, insert, edge synthesis, EI refresh,
//!   bounded prune) as one transaction
//! - Edge cascade on soft delete
//! - A bounded append-only op-log

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{
    BoostOutcome, EmbedBackfill, ForgetOutcome, LinkOutcome, OpLogEntry, PruneCandidate,
    RelatedInsight, SearchHit, Store, StoreStatus,
};
