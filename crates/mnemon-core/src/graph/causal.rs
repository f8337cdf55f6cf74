//! Causal edge builder
//!
//! Scans the ten most recent active insights regardless of source. A
//! candidate links when the token overlap reaches 15% of the smaller token
//! set and either side carries a causal keyword. The insight carrying the
//! keyword points at its cause: keyword in the new insight means
//! new -> candidate, otherwise candidate -> new.

use std::collections::HashSet;

use rusqlite::Transaction;

use crate::config::{CAUSAL_OVERLAP_MIN, CAUSAL_SCAN_RECENT};
use crate::error::Result;
use crate::memory::{CausalLink, EdgeMetadata, EdgeType};
use crate::similarity::smaller_set_overlap;

use super::{PeerSnapshot, upsert_edge};

// ============================================================================
// KEYWORDS
// ============================================================================

/// Causal trigger phrases and the link flavor they suggest; matched as
/// lowercase substrings, English and Chinese
pub(crate) static CAUSAL_KEYWORDS: &[(&str, CausalLink)] = &[
    ("because", CausalLink::Causes),
    ("due to", CausalLink::Causes),
    ("caused by", CausalLink::Causes),
    ("as a result", CausalLink::Causes),
    ("therefore", CausalLink::Causes),
    ("leads to", CausalLink::Causes),
    ("results in", CausalLink::Causes),
    ("so that", CausalLink::Enables),
    ("enables", CausalLink::Enables),
    ("allows", CausalLink::Enables),
    ("prevents", CausalLink::Prevents),
    ("avoids", CausalLink::Prevents),
    ("因为", CausalLink::Causes),
    ("由于", CausalLink::Causes),
    ("所以", CausalLink::Causes),
    ("因此", CausalLink::Causes),
    ("导致", CausalLink::Causes),
    ("使得", CausalLink::Enables),
    ("避免", CausalLink::Prevents),
];

/// First causal keyword found in the text, if any
pub(crate) fn detect_causal_signal(text: &str) -> Option<(&'static str, CausalLink)> {
    let lower = text.to_lowercase();
    CAUSAL_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(keyword, link)| (*keyword, *link))
}

// ============================================================================
// SYNTHESIS
// ============================================================================

/// Token-overlap test shared with causal candidate surfacing
pub(crate) fn overlap_qualifies(a: &HashSet<String>, b: &HashSet<String>) -> Option<f64> {
    let overlap = smaller_set_overlap(a, b);
    (overlap >= CAUSAL_OVERLAP_MIN).then_some(overlap)
}

/// Synthesize causal edges; returns rows written
pub(crate) fn synthesize(
    tx: &Transaction<'_>,
    new: &PeerSnapshot,
    peers: &[PeerSnapshot],
) -> Result<usize> {
    let mut recent: Vec<&PeerSnapshot> = peers.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

    let new_signal = detect_causal_signal(&new.content);
    let mut rows = 0;

    for peer in recent.into_iter().take(CAUSAL_SCAN_RECENT) {
        let Some(overlap) = overlap_qualifies(&new.tokens, &peer.tokens) else {
            continue;
        };

        // The keyword bearer points at its cause
        let (source, target, (reason, sub_type)) = match new_signal {
            Some(signal) => (&new.id, &peer.id, signal),
            None => match detect_causal_signal(&peer.content) {
                Some(signal) => (&peer.id, &new.id, signal),
                None => continue,
            },
        };

        let metadata = EdgeMetadata::Causal {
            sub_type,
            reason: reason.to_string(),
        };
        upsert_edge(
            tx,
            source,
            target,
            EdgeType::Causal,
            overlap,
            &metadata,
            new.created_at,
        )?;
        rows += 1;
    }

    Ok(rows)
}

// ============================================================================
// TESTS
// ============================================================================
