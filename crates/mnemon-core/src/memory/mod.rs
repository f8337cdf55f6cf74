//! Memory Data Model
//!
//! Insights (the atomic memory node) and the four-layer typed edge model,
//! plus the input/outcome types of the write pipeline.

mod edge;
mod insight;

pub use edge::{CausalLink, Edge, EdgeMetadata, EdgeType, TemporalSubType};
pub use insight::{
    Action, Category, Insight, RememberInput, RememberOutcome, Source,
};
