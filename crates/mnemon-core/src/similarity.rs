//! Similarity
//!
//! Cosine over embeddings when both sides have one; Jaccard-style token
//! overlap otherwise. Shared by the diff, the semantic edge builder,
//! candidate surfacing, anchor scoring, and the rerank similarity signal.

use std::collections::HashSet;

use crate::embeddings::{Embedding, cosine_similarity};

// ============================================================================
// STOPWORDS
// ============================================================================

/// Tokens carrying no signal; filtered from every token set and used to
/// reject ALL_CAPS pseudo-entities
pub static STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as",
    "at", "be", "because", "been", "before", "but", "by", "can", "could",
    "did", "do", "does", "for", "from", "had", "has", "have", "he", "her",
    "his", "how", "i", "if", "in", "into", "is", "it", "its", "just", "may",
    "me", "more", "most", "my", "no", "not", "now", "of", "on", "only", "or",
    "our", "out", "over", "she", "should", "so", "some", "than", "that",
    "the", "their", "them", "then", "there", "these", "they", "this", "to",
    "under", "up", "use", "was", "we", "were", "what", "when", "where",
    "which", "who", "why", "will", "with", "would", "you", "your",
];

/// Stopword test over a lowercased token
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

// ============================================================================
// TOKENIZATION
// ============================================================================

/// Lowercased, whitespace-split, punctuation-trimmed, stopword-free tokens
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty() && !is_stopword(w))
        .collect()
}

// ============================================================================
// OVERLAP SCORES
// ============================================================================

/// Jaccard overlap: |A ∩ B| / |A ∪ B|
pub fn token_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Overlap relative to the smaller set: |A ∩ B| / min(|A|, |B|)
pub fn smaller_set_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / a.len().min(b.len()) as f64
}

/// Coverage of the query's tokens: |Q ∩ C| / |Q|
pub fn query_coverage(query_tokens: &HashSet<String>, content_tokens: &HashSet<String>) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let intersection = query_tokens.intersection(content_tokens).count();
    intersection as f64 / query_tokens.len() as f64
}

// ============================================================================
// CONTENT SIMILARITY
// ============================================================================

/// Similarity between two texts: cosine when both embeddings are present,
/// token overlap otherwise
pub fn content_similarity(
    a_text: &str,
    a_embedding: Option<&Embedding>,
    b_text: &str,
    b_embedding: Option<&Embedding>,
) -> f64 {
    match (a_embedding, b_embedding) {
        (Some(a), Some(b)) => cosine_similarity(&a.vector, &b.vector),
        _ => token_overlap(&tokenize(a_text), &tokenize(b_text)),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_strips_stopwords_and_punctuation() {
        let tokens = tokenize("The server, because of load, restarts!");

        assert!(tokens.contains("server"));
        assert!(tokens.contains("load"));
        assert!(tokens.contains("restarts"));
        assert!(!tokens.contains("the"));
        assert!(!tokens.contains("because"));
    }

    #[test]
    fn identical_texts_overlap_fully() {
        let a = tokenize("database migration finished cleanly");
        let b = tokenize("database migration finished cleanly");
        assert!((token_overlap(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn disjoint_texts_have_zero_overlap() {
        let a = tokenize("kernel scheduler");
        let b = tokenize("garden flowers");
        assert_eq!(token_overlap(&a, &b), 0.0);
    }

    #[test]
    fn smaller_set_overlap_uses_min_cardinality() {
        let a = tokenize("alpha beta");
        let b = tokenize("alpha beta gamma delta epsilon zeta");
        // both of a's tokens appear in b
        assert!((smaller_set_overlap(&a, &b) - 1.0).abs() < 1e-12);
        assert!(token_overlap(&a, &b) < 1.0);
    }

    #[test]
    fn query_coverage_is_relative_to_query() {
        let q = tokenize("postgres tuning");
        let c = tokenize("postgres connection pool tuning notes");
        assert!((query_coverage(&q, &c) - 1.0).abs() < 1e-12);

        let c2 = tokenize("postgres only");
        assert!((query_coverage(&q, &c2) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn content_similarity_prefers_cosine_when_both_embedded() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![1.0, 0.0]);
        // texts share no tokens, but vectors agree
        let sim = content_similarity("one text", Some(&a), "different words", Some(&b));
        assert!((sim - 1.0).abs() < 1e-12);
    }

    #[test]
    fn content_similarity_falls_back_to_tokens() {
        let sim = content_similarity("shared words here", None, "shared words there", None);
        assert!(sim > 0.0);
    }
}
