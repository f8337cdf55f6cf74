//! Semantic edge builder
//!
//! Cosine at or above 0.80 auto-links (at most three partners, weight =
//! cosine). With cosine present but lower, token overlap may still link,
//! but only past the 0.70 bar; with no cosine at all, token overlap past
//! 0.10 links. Near-matches in [0.40, 0.80) are left for candidate
//! surfacing after the transaction commits.

use rusqlite::Transaction;

use crate::config::{
    SEMANTIC_AUTO_LINK_CAP, SEMANTIC_AUTO_LINK_MIN, TOKEN_AUTO_LINK_MIN, TOKEN_OVERRIDE_BAR,
};
use crate::embeddings::cosine_similarity;
use crate::error::Result;
use crate::memory::{EdgeMetadata, EdgeType};
use crate::similarity::token_overlap;

use super::{PeerSnapshot, insert_bidirectional};

/// Auto-link decision for one peer: `Some(similarity)` links
fn auto_link_score(new: &PeerSnapshot, peer: &PeerSnapshot) -> Option<f64> {
    match (&new.embedding, &peer.embedding) {
        (Some(a), Some(b)) => {
            let cosine = cosine_similarity(&a.vector, &b.vector);
            if cosine >= SEMANTIC_AUTO_LINK_MIN {
                return Some(cosine);
            }
            // Embeddings disagree with a high token overlap only past a
            // stricter bar; cosine wins otherwise
            let overlap = token_overlap(&new.tokens, &peer.tokens);
            (overlap > TOKEN_OVERRIDE_BAR).then_some(overlap)
        }
        _ => {
            let overlap = token_overlap(&new.tokens, &peer.tokens);
            (overlap > TOKEN_AUTO_LINK_MIN).then_some(overlap)
        }
    }
}

/// Synthesize semantic edges; returns rows written
pub(crate) fn synthesize(
    tx: &Transaction<'_>,
    new: &PeerSnapshot,
    peers: &[PeerSnapshot],
) -> Result<usize> {
    let mut scored: Vec<(&PeerSnapshot, f64)> = peers
        .iter()
        .filter_map(|p| auto_link_score(new, p).map(|score| (p, score)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));

    let mut rows = 0;
    for (peer, score) in scored.into_iter().take(SEMANTIC_AUTO_LINK_CAP) {
        let metadata = EdgeMetadata::Semantic { cosine: score };
        rows += insert_bidirectional(
            tx,
            &new.id,
            &peer.id,
            EdgeType::Semantic,
            score,
            &metadata,
            new.created_at,
        )?;
    }

    Ok(rows)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::Embedding;
    use crate::memory::Source;
    use chrono::Utc;

    fn snapshot(id: &str, content: &str, embedding: Option<Embedding>) -> PeerSnapshot {
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
    fn high_cosine_links() {
        let new = snapshot("a", "one thing", Some(Embedding::new(vec![1.0, 0.0])));
        let peer = snapshot("b", "другое", Some(Embedding::new(vec![1.0, 0.01])));
        let score = auto_link_score(&new, &peer).unwrap();
        assert!(score >= SEMANTIC_AUTO_LINK_MIN);
    }

    #[test]
    fn low_cosine_suppresses_moderate_token_overlap() {
        // same words, but embeddings say the meaning differs
        let new = snapshot(
            "a",
            "cache layer design notes",
            Some(Embedding::new(vec![1.0, 0.0])),
        );
        let peer = snapshot(
            "b",
            "cache layer design doubts",
            Some(Embedding::new(vec![0.0, 1.0])),
        );
        assert!(auto_link_score(&new, &peer).is_none());
    }

    #[test]
    fn token_overlap_links_when_no_embedding() {
        let new = snapshot("a", "retry budget exhausted quickly", None);
        let peer = snapshot("b", "retry budget exhausted again", None);
        let score = auto_link_score(&new, &peer).unwrap();
        assert!(score > TOKEN_AUTO_LINK_MIN);
    }

    #[test]
    fn weak_token_overlap_does_not_link() {
        let new = snapshot("a", "totally unrelated gardening", None);
        let peer = snapshot("b", "kernel scheduler preemption", None);
        assert!(auto_link_score(&new, &peer).is_none());
    }
}
