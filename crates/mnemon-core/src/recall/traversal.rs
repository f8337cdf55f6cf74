//! Beam-Search Graph Traversal
//!
//! Best-first expansion from each anchor over the four-layer graph, with
//! intent-adaptive beam width, depth, visit budget, and edge-type weights.
//! The candidate pool accumulates every node reached, annotated with the
//! highest running score any anchor achieved and the edge layer that led
//! there.

use std::collections::{HashMap, HashSet};

use crate::config::{TRAVERSAL_SEMANTIC_WEIGHT, TRAVERSAL_STRUCTURAL_WEIGHT};
use crate::embeddings::{Embedding, cosine_similarity};
use crate::memory::EdgeType;

use super::intent::Intent;

// ============================================================================
// INTENT-ADAPTIVE PARAMETERS
// ============================================================================

/// Traversal bounds per intent
#[derive(Debug, Clone, Copy)]
pub(crate) struct BeamParams {
    pub beam_width: usize,
    pub max_depth: usize,
    pub max_visited: usize,
}

impl BeamParams {
    pub(crate) fn for_intent(intent: Intent) -> Self {
        match intent {
            Intent::Why => Self {
                beam_width: 15,
                max_depth: 5,
                max_visited: 500,
            },
            Intent::When => Self {
                beam_width: 10,
                max_depth: 5,
                max_visited: 400,
            },
            Intent::Entity => Self {
                beam_width: 10,
                max_depth: 4,
                max_visited: 400,
            },
            Intent::General => Self {
                beam_width: 10,
                max_depth: 4,
                max_visited: 500,
            },
        }
    }
}

/// Structural weight of one edge layer under one intent
pub(crate) fn edge_type_weight(intent: Intent, edge_type: EdgeType) -> f64 {
    match intent {
        Intent::Why => match edge_type {
            EdgeType::Causal => 0.70,
            EdgeType::Temporal => 0.20,
            EdgeType::Entity => 0.05,
            EdgeType::Semantic => 0.05,
        },
        Intent::When => match edge_type {
            EdgeType::Causal => 0.15,
            EdgeType::Temporal => 0.65,
            EdgeType::Entity => 0.10,
            EdgeType::Semantic => 0.10,
        },
        Intent::Entity => match edge_type {
            EdgeType::Causal => 0.10,
            EdgeType::Temporal => 0.05,
            EdgeType::Entity => 0.55,
            EdgeType::Semantic => 0.30,
        },
        Intent::General => 0.25,
    }
}

// ============================================================================
// TRAVERSAL
// ============================================================================

/// One outgoing edge in the in-memory adjacency
#[derive(Debug, Clone)]
pub(crate) struct EdgeRef {
    pub target: String,
    pub edge_type: EdgeType,
    pub weight: f64,
}

/// Pool annotation: best running score and the edge layer that achieved it
#[derive(Debug, Clone, Copy)]
pub(crate) struct PoolEntry {
    pub score: f64,
    pub via: Option<EdgeType>,
}

/// Expand every anchor and accumulate the candidate pool
pub(crate) fn traverse(
    anchors: &[(String, f64)],
    adjacency: &HashMap<String, Vec<EdgeRef>>,
    embeddings: &HashMap<String, Embedding>,
    query_embedding: Option<&Embedding>,
    intent: Intent,
) -> HashMap<String, PoolEntry> {
    let params = BeamParams::for_intent(intent);
    let mut pool: HashMap<String, PoolEntry> = HashMap::new();
    let mut budget = params.max_visited;

    let semantic_gain = |id: &str| -> f64 {
        match (query_embedding, embeddings.get(id)) {
            (Some(q), Some(n)) => cosine_similarity(&q.vector, &n.vector),
            _ => 0.0,
        }
    };

    fn update_pool(
        pool: &mut HashMap<String, PoolEntry>,
        id: &str,
        score: f64,
        via: Option<EdgeType>,
    ) {
        pool.entry(id.to_string())
            .and_modify(|entry| {
                if score > entry.score {
                    entry.score = score;
                    entry.via = via;
                }
            })
            .or_insert(PoolEntry { score, via });
    }

    'anchors: for (anchor_id, anchor_score) in anchors {
        update_pool(&mut pool, anchor_id, *anchor_score, None);

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(anchor_id.clone());
        let mut frontier: Vec<(String, f64)> = vec![(anchor_id.clone(), *anchor_score)];

        for _depth in 0..params.max_depth {
            // best improvement per neighbor at this depth
            let mut improvements: HashMap<String, (f64, EdgeType)> = HashMap::new();

            for (node, score) in &frontier {
                if budget == 0 {
                    break 'anchors;
                }
                budget -= 1;

                let Some(edges) = adjacency.get(node) else {
                    continue;
                };
                for edge in edges {
                    if seen.contains(&edge.target) {
                        continue;
                    }
                    let structural = edge.weight * edge_type_weight(intent, edge.edge_type);
                    let semantic = semantic_gain(&edge.target);
                    let total = score
                        + TRAVERSAL_STRUCTURAL_WEIGHT * structural
                        + TRAVERSAL_SEMANTIC_WEIGHT * semantic;

                    improvements
                        .entry(edge.target.clone())
                        .and_modify(|best| {
                            if total > best.0 {
                                *best = (total, edge.edge_type);
                            }
                        })
                        .or_insert((total, edge.edge_type));
                }
            }

            if improvements.is_empty() {
                break;
            }

            // beam: keep only the strongest frontier nodes at this depth
            let mut next: Vec<(String, f64, EdgeType)> = improvements
                .into_iter()
                .map(|(id, (score, via))| (id, score, via))
                .collect();
            next.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            next.truncate(params.beam_width);

            frontier = next
                .into_iter()
                .map(|(id, score, via)| {
                    seen.insert(id.clone());
                    update_pool(&mut pool, &id, score, Some(via));
                    (id, score)
                })
                .collect();
        }
    }

    pool
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(target: &str, edge_type: EdgeType, weight: f64) -> EdgeRef {
        EdgeRef {
            target: target.to_string(),
            edge_type,
            weight,
        }
    }

    #[test]
    fn beam_params_match_intents() {
        let why = BeamParams::for_intent(Intent::Why);
        assert_eq!((why.beam_width, why.max_depth, why.max_visited), (15, 5, 500));
        let entity = BeamParams::for_intent(Intent::Entity);
        assert_eq!(
            (entity.beam_width, entity.max_depth, entity.max_visited),
            (10, 4, 400)
        );
    }

    #[test]
    fn edge_weights_sum_to_one_per_intent() {
        for intent in [Intent::Why, Intent::When, Intent::Entity, Intent::General] {
            let sum: f64 = EdgeType::ALL
                .iter()
                .map(|t| edge_type_weight(intent, *t))
                .sum();
            assert!((sum - 1.0).abs() < 1e-9, "{:?} sums to {}", intent, sum);
        }
    }

    #[test]
    fn traversal_reaches_neighbors_and_scores_them() {
        let mut adjacency = HashMap::new();
        adjacency.insert(
            "a".to_string(),
            vec![edge("b", EdgeType::Causal, 1.0), edge("c", EdgeType::Entity, 1.0)],
        );
        let pool = traverse(
            &[("a".to_string(), 0.1)],
            &adjacency,
            &HashMap::new(),
            None,
            Intent::Why,
        );

        assert_eq!(pool.len(), 3);
        // under WHY, the causal neighbor outranks the entity neighbor
        assert!(pool["b"].score > pool["c"].score);
        assert_eq!(pool["b"].via, Some(EdgeType::Causal));
        assert_eq!(pool["a"].via, None);
    }

    #[test]
    fn traversal_tolerates_cycles() {
        let mut adjacency = HashMap::new();
        adjacency.insert("a".to_string(), vec![edge("b", EdgeType::Semantic, 0.9)]);
        adjacency.insert("b".to_string(), vec![edge("a", EdgeType::Semantic, 0.9)]);
        let pool = traverse(
            &[("a".to_string(), 0.1)],
            &adjacency,
            &HashMap::new(),
            None,
            Intent::General,
        );
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn scores_accumulate_along_paths() {
        let mut adjacency = HashMap::new();
        adjacency.insert("a".to_string(), vec![edge("b", EdgeType::Causal, 1.0)]);
        adjacency.insert("b".to_string(), vec![edge("c", EdgeType::Causal, 1.0)]);
        let pool = traverse(
            &[("a".to_string(), 0.0)],
            &adjacency,
            &HashMap::new(),
            None,
            Intent::Why,
        );
        // two causal hops accumulate two structural contributions
        assert!((pool["c"].score - 2.0 * 0.70).abs() < 1e-9);
    }
}
