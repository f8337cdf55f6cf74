//! WHY Post-Processing - Causal Topological Sort
//!
//! Kahn-style topological sort over the causal subgraph restricted to the
//! result set, so causes precede effects in the final ordering. Ties break
//! by descending final score. Cycles are tolerated: the lowest-weight edge
//! among the remaining nodes is dropped deterministically and the sort
//! continues.

use std::collections::{HashMap, HashSet};

/// A causal edge inside the result set: cause -> effect with its weight
#[derive(Debug, Clone)]
pub(crate) struct CausalEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

/// Order result ids so causes precede effects
pub(crate) fn causal_order(
    ids: &[String],
    edges: &[CausalEdge],
    final_scores: &HashMap<String, f64>,
) -> Vec<String> {
    let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();

    // restrict to edges with both endpoints in the result set
    let mut remaining: Vec<&CausalEdge> = edges
        .iter()
        .filter(|e| {
            e.source != e.target
                && id_set.contains(e.source.as_str())
                && id_set.contains(e.target.as_str())
        })
        .collect();

    let mut in_degree: HashMap<&str, usize> = ids.iter().map(|id| (id.as_str(), 0)).collect();
    for edge in &remaining {
        *in_degree.get_mut(edge.target.as_str()).unwrap() += 1;
    }

    let score_of = |id: &str| final_scores.get(id).copied().unwrap_or(0.0);

    let mut placed: HashSet<String> = HashSet::new();
    let mut ordered: Vec<String> = Vec::with_capacity(ids.len());

    while ordered.len() < ids.len() {
        // highest-scoring ready node; ties break on id for determinism
        let next: Option<String> = in_degree
            .iter()
            .filter(|(id, degree)| **degree == 0 && !placed.contains(**id))
            .map(|(id, _)| *id)
            .max_by(|a, b| {
                score_of(a)
                    .total_cmp(&score_of(b))
                    .then_with(|| b.cmp(a))
            })
            .map(str::to_string);

        match next {
            Some(id) => {
                placed.insert(id.clone());
                for edge in &remaining {
                    if edge.source == id && !placed.contains(&edge.target) {
                        *in_degree.get_mut(edge.target.as_str()).unwrap() -= 1;
                    }
                }
                ordered.push(id);
            }
            None => {
                // cycle: drop the lowest-weight edge among unplaced nodes
                let Some(victim_index) = remaining
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| !placed.contains(&e.source) && !placed.contains(&e.target))
                    .min_by(|(_, a), (_, b)| {
                        a.weight
                            .total_cmp(&b.weight)
                            .then_with(|| a.source.cmp(&b.source))
                            .then_with(|| a.target.cmp(&b.target))
                    })
                    .map(|(i, _)| i)
                else {
                    break;
                };
                let victim = remaining.remove(victim_index);
                *in_degree.get_mut(victim.target.as_str()).unwrap() -= 1;
            }
        }
    }

    ordered
}

// ============================================================================
// TESTS
// ============================================================================
