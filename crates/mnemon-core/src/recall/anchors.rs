//! Anchor Selection - Reciprocal Rank Fusion
//!
//! Four anchor signals run over the active set: keyword overlap, vector
//! similarity (skipped without a query embedding), recency, and shared
//! entities. Their ranked lists fuse via RRF with k = 60; the fused set,
//! strongest first, seeds the graph traversal.

use std::collections::{HashMap, HashSet};

use crate::config::{ANCHOR_SIGNAL_LIMIT, RRF_K, VECTOR_ANCHOR_SIM_MIN};
use crate::embeddings::{Embedding, cosine_similarity};
use crate::extract::extract_entities;
use crate::graph::PeerSnapshot;
use crate::similarity::{token_overlap, tokenize};

// ============================================================================
// FUSION
// ============================================================================

/// Reciprocal rank fusion over ranked id lists
///
/// `RRF(d) = Σ 1 / (k + rank + 1)` across the lists `d` appears in, with
/// 0-indexed ranks. Result is sorted by fused score descending.
pub fn reciprocal_rank_fusion(lists: &[Vec<String>], k: f64) -> Vec<(String, f64)> {
    let mut scores: HashMap<String, f64> = HashMap::new();

    for list in lists {
        for (rank, id) in list.iter().enumerate() {
            *scores.entry(id.clone()).or_default() += 1.0 / (k + rank as f64 + 1.0);
        }
    }

    let mut fused: Vec<(String, f64)> = scores.into_iter().collect();
    fused.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    fused
}

// ============================================================================
// SIGNALS
// ============================================================================

fn keyword_signal(peers: &[PeerSnapshot], query_tokens: &HashSet<String>) -> Vec<String> {
    let mut scored: Vec<(&PeerSnapshot, f64)> = peers
        .iter()
        .map(|p| (p, token_overlap(query_tokens, &p.tokens)))
        .filter(|(_, score)| *score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
    scored
        .into_iter()
        .take(ANCHOR_SIGNAL_LIMIT)
        .map(|(p, _)| p.id.clone())
        .collect()
}

fn vector_signal(peers: &[PeerSnapshot], query_embedding: &Embedding) -> Vec<String> {
    let mut scored: Vec<(&PeerSnapshot, f64)> = peers
        .iter()
        .filter_map(|p| {
            let embedding = p.embedding.as_ref()?;
            let cosine = cosine_similarity(&query_embedding.vector, &embedding.vector);
            (cosine >= VECTOR_ANCHOR_SIM_MIN).then_some((p, cosine))
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
    scored
        .into_iter()
        .take(ANCHOR_SIGNAL_LIMIT)
        .map(|(p, _)| p.id.clone())
        .collect()
}

fn recency_signal(peers: &[PeerSnapshot]) -> Vec<String> {
    let mut ordered: Vec<&PeerSnapshot> = peers.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    ordered
        .into_iter()
        .take(ANCHOR_SIGNAL_LIMIT)
        .map(|p| p.id.clone())
        .collect()
}

fn entity_signal(peers: &[PeerSnapshot], query_entities: &[String]) -> Vec<String> {
    if query_entities.is_empty() {
        return Vec::new();
    }
    let wanted: HashSet<&str> = query_entities.iter().map(String::as_str).collect();
    let mut scored: Vec<(&PeerSnapshot, usize)> = peers
        .iter()
        .filter_map(|p| {
            let shared = p
                .entities
                .iter()
                .filter(|e| wanted.contains(e.as_str()))
                .count();
            (shared > 0).then_some((p, shared))
        })
        .collect();
    scored.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| b.0.created_at.cmp(&a.0.created_at))
            .then_with(|| a.0.id.cmp(&b.0.id))
    });
    scored.into_iter().map(|(p, _)| p.id.clone()).collect()
}

// ============================================================================
// SELECTION
// ============================================================================

/// Fused anchor set for a query, strongest first
pub(crate) fn select_anchors(
    peers: &[PeerSnapshot],
    query: &str,
    query_embedding: Option<&Embedding>,
) -> Vec<(String, f64)> {
    let query_tokens = tokenize(query);
    let query_entities = extract_entities(query, &[]);

    let mut lists = vec![
        keyword_signal(peers, &query_tokens),
        recency_signal(peers),
        entity_signal(peers, &query_entities),
    ];
    if let Some(embedding) = query_embedding {
        lists.push(vector_signal(peers, embedding));
    }

    reciprocal_rank_fusion(&lists, RRF_K)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Source;
    use chrono::{Duration, Utc};

    fn peer(id: &str, content: &str, entities: &[&str], minutes_ago: i64) -> PeerSnapshot {
        PeerSnapshot::new(
            id.to_string(),
            content.to_string(),
            Source::User,
            Utc::now() - Duration::minutes(minutes_ago),
            entities.iter().map(|e| e.to_string()).collect(),
            None,
        )
    }

    #[test]
    fn rrf_rewards_presence_in_multiple_lists() {
        let lists = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["b".to_string(), "c".to_string()],
        ];
        let fused = reciprocal_rank_fusion(&lists, 60.0);
        assert_eq!(fused[0].0, "b");
        // rank 0 in one list + rank 1 in the other
        let expected = 1.0 / 62.0 + 1.0 / 61.0;
        assert!((fused[0].1 - expected).abs() < 1e-12);
    }

    #[test]
    fn rrf_uses_zero_indexed_ranks() {
        let lists = vec![vec!["only".to_string()]];
        let fused = reciprocal_rank_fusion(&lists, 60.0);
        assert!((fused[0].1 - 1.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn rrf_with_empty_lists_does_not_crash() {
        let fused = reciprocal_rank_fusion(&[vec![], vec![]], 60.0);
        assert!(fused.is_empty());
    }

    #[test]
    fn anchors_without_keyword_or_vector_fall_back_to_recency_and_entity() {
        let peers = vec![
            peer("p1", "alpha beta", &["ServiceMesh"], 10),
            peer("p2", "gamma delta", &[], 5),
        ];
        // query shares no tokens (stopwords only) and has no embedding
        let anchors = select_anchors(&peers, "the of and", None);
        assert_eq!(anchors.len(), 2);
    }

    #[test]
    fn entity_overlap_pulls_in_matching_peers() {
        let peers = vec![
            peer("p1", "notes on mesh rollout", &["ServiceMesh"], 600),
            peer("p2", "unrelated grocery list", &[], 1),
        ];
        let anchors = select_anchors(&peers, "what is ServiceMesh", None);
        assert_eq!(anchors.first().map(|(id, _)| id.as_str()), Some("p1"));
    }
}
