//! Deduplication / Conflict Diff
//!
//! Runs before the write transaction, read-only, against the active set.
//! The maximum similarity to any prior insight picks the action:
//! above 0.90 the insert is skipped, in [0.65, 0.90] the closest prior
//! insight is replaced, below 0.65 the insert proceeds normally.

use crate::config::{DIFF_COSINE_AUTHORITATIVE_MIN, DIFF_REPLACE_MIN, DIFF_SKIP_MIN};
use crate::embeddings::{Embedding, cosine_similarity};
use crate::graph::PeerSnapshot;
use crate::similarity::{token_overlap, tokenize};

// ============================================================================
// DECISION
// ============================================================================

/// Outcome of the pre-transaction diff
#[derive(Debug, Clone, PartialEq)]
pub enum DiffDecision {
    /// No close match; insert normally
    Add,
    /// Near-duplicate; do not insert
    Skip { duplicate_id: String, similarity: f64 },
    /// Close match; supersede the prior insight
    Replace { replaced_id: String, similarity: f64 },
}

/// Similarity of the new content against one prior insight.
///
/// Cosine is authoritative once it reaches 0.7 and exceeds the token score;
/// below that the two signals compete and the larger wins.
fn pair_similarity(
    new_tokens: &std::collections::HashSet<String>,
    new_embedding: Option<&Embedding>,
    peer: &PeerSnapshot,
) -> f64 {
    let overlap = token_overlap(new_tokens, &peer.tokens);
    let cosine = match (new_embedding, &peer.embedding) {
        (Some(a), Some(b)) => cosine_similarity(&a.vector, &b.vector),
        _ => 0.0,
    };
    if cosine >= DIFF_COSINE_AUTHORITATIVE_MIN && cosine > overlap {
        cosine
    } else {
        overlap.max(cosine)
    }
}

/// Decide what to do with new content given the active set
pub(crate) fn diff(
    content: &str,
    embedding: Option<&Embedding>,
    peers: &[PeerSnapshot],
) -> DiffDecision {
    let new_tokens = tokenize(content);

    let best = peers
        .iter()
        .map(|peer| (peer, pair_similarity(&new_tokens, embedding, peer)))
        .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.id.cmp(&a.0.id)));

    match best {
        Some((peer, similarity)) if similarity > DIFF_SKIP_MIN => DiffDecision::Skip {
            duplicate_id: peer.id.clone(),
            similarity,
        },
        Some((peer, similarity)) if similarity >= DIFF_REPLACE_MIN => DiffDecision::Replace {
            replaced_id: peer.id.clone(),
            similarity,
        },
        _ => DiffDecision::Add,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Source;
    use chrono::Utc;

    fn peer(id: &str, content: &str, embedding: Option<Embedding>) -> PeerSnapshot {
        PeerSnapshot::new(
            id.to_string(),
            content.to_string(),
            Source::User,
            Utc::now(),
            vec![],
            embedding,
        )
    }

    #[test]
    fn empty_store_always_adds() {
        assert_eq!(diff("anything at all", None, &[]), DiffDecision::Add);
    }

    #[test]
    fn exact_duplicate_is_skipped() {
        let peers = vec![peer("p1", "user prefers dark mode editors", None)];
        match diff("user prefers dark mode editors", None, &peers) {
            DiffDecision::Skip { duplicate_id, .. } => assert_eq!(duplicate_id, "p1"),
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[test]
    fn unrelated_content_is_added() {
        let peers = vec![peer("p1", "user prefers dark mode editors", None)];
        assert_eq!(
            diff("kafka consumer lag is rising", None, &peers),
            DiffDecision::Add
        );
    }

    #[test]
    fn cosine_in_replace_band_replaces() {
        // vectors engineered for cosine ~0.82
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![0.82, (1.0_f64 - 0.82 * 0.82).sqrt()]);
        let peers = vec![peer("old", "User prefers PostgreSQL", Some(a))];
        match diff(
            "User prefers PostgreSQL as the primary DB",
            Some(&b),
            &peers,
        ) {
            DiffDecision::Replace {
                replaced_id,
                similarity,
            } => {
                assert_eq!(replaced_id, "old");
                assert!((similarity - 0.82).abs() < 1e-9);
            }
            other => panic!("expected replace, got {:?}", other),
        }
    }

    #[test]
    fn band_boundaries_are_pinned() {
        // similarity exactly 0.90 replaces; skip needs strictly more
        let q = Embedding::new(vec![1.0, 0.0]);
        let at_ninety = Embedding::new(vec![0.90, (1.0_f64 - 0.81).sqrt()]);
        let peers = vec![peer("x", "irrelevant words entirely", Some(at_ninety))];
        assert!(matches!(
            diff("different tokens altogether", Some(&q), &peers),
            DiffDecision::Replace { .. }
        ));

        // similarity exactly 0.65 replaces
        let at_sixty_five = Embedding::new(vec![0.65, (1.0_f64 - 0.65 * 0.65).sqrt()]);
        let peers = vec![peer("y", "irrelevant words entirely", Some(at_sixty_five))];
        assert!(matches!(
            diff("different tokens altogether", Some(&q), &peers),
            DiffDecision::Replace { .. }
        ));

        // just below 0.65 adds
        let below = Embedding::new(vec![0.649, (1.0_f64 - 0.649 * 0.649).sqrt()]);
        let peers = vec![peer("z", "irrelevant words entirely", Some(below))];
        assert!(matches!(
            diff("different tokens altogether", Some(&q), &peers),
            DiffDecision::Add
        ));
    }

    #[test]
    fn highest_similarity_peer_wins() {
        let q = Embedding::new(vec![1.0, 0.0]);
        let close = Embedding::new(vec![0.99, (1.0_f64 - 0.99 * 0.99).sqrt()]);
        let far = Embedding::new(vec![0.70, (1.0_f64 - 0.49).sqrt()]);
        let peers = vec![
            peer("far", "some words", Some(far)),
            peer("close", "other words", Some(close)),
        ];
        match diff("new words", Some(&q), &peers) {
            DiffDecision::Skip { duplicate_id, .. } => assert_eq!(duplicate_id, "close"),
            other => panic!("expected skip of closest, got {:?}", other),
        }
    }
}
