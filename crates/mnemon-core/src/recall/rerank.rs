//! Multi-Factor Re-Ranking
//!
//! Each pool candidate is scored on four signals: keyword coverage of the
//! query, entity overlap, embedding similarity, and min-max-normalized
//! traversal score. Signal weights adapt to the intent; without a query
//! embedding the similarity weight is redistributed (one third to keyword,
//! two thirds to graph, matching the WHY reference point).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::embeddings::{Embedding, cosine_similarity};
use crate::graph::PeerSnapshot;
use crate::memory::EdgeType;
use crate::similarity::query_coverage;

use super::intent::Intent;
use super::traversal::PoolEntry;

// ============================================================================
// SIGNALS
// ============================================================================

/// The four rerank signals, exposed verbatim on every result
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RecallSignals {
    pub keyword: f64,
    pub entity: f64,
    pub similarity: f64,
    pub graph: f64,
}

/// Signal weights for one intent
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SignalWeights {
    pub keyword: f64,
    pub entity: f64,
    pub similarity: f64,
    pub graph: f64,
}

/// Intent-adaptive weights; redistributes the similarity weight when the
/// query has no embedding
pub(crate) fn weights_for(intent: Intent, embedding_available: bool) -> SignalWeights {
    let base = match intent {
        Intent::Why => SignalWeights {
            keyword: 0.10,
            entity: 0.10,
            similarity: 0.30,
            graph: 0.50,
        },
        Intent::When => SignalWeights {
            keyword: 0.15,
            entity: 0.15,
            similarity: 0.30,
            graph: 0.40,
        },
        Intent::Entity => SignalWeights {
            keyword: 0.20,
            entity: 0.40,
            similarity: 0.20,
            graph: 0.20,
        },
        Intent::General => SignalWeights {
            keyword: 0.25,
            entity: 0.25,
            similarity: 0.25,
            graph: 0.25,
        },
    };

    if embedding_available {
        base
    } else {
        SignalWeights {
            keyword: base.keyword + base.similarity / 3.0,
            entity: base.entity,
            similarity: 0.0,
            graph: base.graph + 2.0 * base.similarity / 3.0,
        }
    }
}

// ============================================================================
// RERANK
// ============================================================================

/// A pool candidate after re-ranking
#[derive(Debug, Clone)]
pub(crate) struct RankedCandidate {
    pub id: String,
    pub score: f64,
    pub signals: RecallSignals,
    pub via: Option<EdgeType>,
}

/// Score and sort the candidate pool
pub(crate) fn rerank(
    pool: &HashMap<String, PoolEntry>,
    peers_by_id: &HashMap<&str, &PeerSnapshot>,
    query_tokens: &HashSet<String>,
    query_entities: &[String],
    query_embedding: Option<&Embedding>,
    intent: Intent,
) -> Vec<RankedCandidate> {
    let weights = weights_for(intent, query_embedding.is_some());

    // min-max bounds of the traversal scores across the pool
    let (min_pool, max_pool) = pool.values().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(min, max), entry| (min.min(entry.score), max.max(entry.score)),
    );
    let spread = max_pool - min_pool;

    let wanted_entities: HashSet<&str> = query_entities.iter().map(String::as_str).collect();

    let mut ranked: Vec<RankedCandidate> = pool
        .iter()
        .filter_map(|(id, entry)| {
            let peer = peers_by_id.get(id.as_str())?;

            let keyword = query_coverage(query_tokens, &peer.tokens);
            let entity = if wanted_entities.is_empty() {
                0.0
            } else {
                let shared = peer
                    .entities
                    .iter()
                    .filter(|e| wanted_entities.contains(e.as_str()))
                    .count();
                shared as f64 / wanted_entities.len().max(1) as f64
            };
            let similarity = match (query_embedding, &peer.embedding) {
                (Some(q), Some(p)) => cosine_similarity(&q.vector, &p.vector),
                _ => 0.0,
            };
            let graph = if spread > 0.0 {
                (entry.score - min_pool) / spread
            } else {
                0.0
            };

            let signals = RecallSignals {
                keyword,
                entity,
                similarity,
                graph,
            };
            let score = weights.keyword * keyword
                + weights.entity * entity
                + weights.similarity * similarity
                + weights.graph * graph;

            Some(RankedCandidate {
                id: id.clone(),
                score,
                signals,
                via: entry.via,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    ranked
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_weights_sum_to_one() {
        for intent in [Intent::Why, Intent::When, Intent::Entity, Intent::General] {
            for available in [true, false] {
                let w = weights_for(intent, available);
                let sum = w.keyword + w.entity + w.similarity + w.graph;
                assert!((sum - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn why_redistribution_matches_reference_point() {
        let w = weights_for(Intent::Why, false);
        assert!((w.keyword - 0.20).abs() < 1e-9);
        assert!((w.entity - 0.10).abs() < 1e-9);
        assert_eq!(w.similarity, 0.0);
        assert!((w.graph - 0.70).abs() < 1e-9);
    }

    #[test]
    fn entity_intent_weights_favor_entities() {
        let w = weights_for(Intent::Entity, true);
        assert!((w.entity - 0.40).abs() < 1e-9);
        assert!(w.entity > w.keyword && w.entity > w.graph);
    }
}
