//! Candidate Surfacing
//!
//! Advisory output computed after the write transaction commits, read-only.
//! Semantic candidates are near-matches below the auto-link bar; causal
//! candidates are nodes within two hops whose content passes the causal
//! keyword and overlap tests. The host agent may follow up with explicit
//! `link` operations.

use std::collections::{HashMap, HashSet, VecDeque};

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::config::{
    CAUSAL_SURFACE_CAP, CAUSAL_SURFACE_HOPS, SEMANTIC_AUTO_LINK_MIN, SEMANTIC_SURFACE_CAP,
    SEMANTIC_SURFACE_MIN,
};
use crate::embeddings::cosine_similarity;
use crate::error::Result;
use crate::graph::causal::overlap_qualifies;
use crate::graph::{PeerSnapshot, detect_causal_signal};
use crate::memory::EdgeType;
use crate::similarity::tokenize;

// ============================================================================
// CANDIDATE TYPES
// ============================================================================

/// A near-match below the semantic auto-link bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticCandidate {
    pub id: String,
    pub content: String,
    pub cosine: f64,
    /// Always false; auto-linked edges are not candidates
    pub auto_linked: bool,
}

/// A causal-link suggestion reached within two hops
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausalCandidate {
    pub id: String,
    pub content: String,
    /// Graph distance from the new insight
    pub hop: usize,
    /// Edge layer of the first hop that reached this node
    pub via_edge: EdgeType,
    /// The keyword that triggered the suggestion
    pub causal_signal: String,
    /// Suggested causal flavor for an explicit link
    pub suggested_sub_type: String,
}

// ============================================================================
// SEMANTIC SURFACING
// ============================================================================

/// Active insights with cosine in [0.40, 0.80), strongest first, capped
pub(crate) fn semantic_candidates(
    new: &PeerSnapshot,
    peers: &[PeerSnapshot],
) -> Vec<SemanticCandidate> {
    let Some(new_embedding) = &new.embedding else {
        return Vec::new();
    };

    let mut candidates: Vec<SemanticCandidate> = peers
        .iter()
        .filter_map(|peer| {
            let embedding = peer.embedding.as_ref()?;
            let cosine = cosine_similarity(&new_embedding.vector, &embedding.vector);
            (SEMANTIC_SURFACE_MIN..SEMANTIC_AUTO_LINK_MIN)
                .contains(&cosine)
                .then(|| SemanticCandidate {
                    id: peer.id.clone(),
                    content: peer.content.clone(),
                    cosine,
                    auto_linked: false,
                })
        })
        .collect();

    candidates.sort_by(|a, b| b.cosine.total_cmp(&a.cosine).then_with(|| a.id.cmp(&b.id)));
    candidates.truncate(SEMANTIC_SURFACE_CAP);
    candidates
}

// ============================================================================
// CAUSAL SURFACING
// ============================================================================

/// BFS up to two hops along any edge type, keeping nodes that pass the
/// causal keyword and overlap tests
pub(crate) fn causal_candidates(
    conn: &Connection,
    new: &PeerSnapshot,
) -> Result<Vec<CausalCandidate>> {
    // (node, hop, first-hop edge layer) discovered in breadth order
    let mut reached: Vec<(String, usize, EdgeType)> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(new.id.clone());

    let mut queue: VecDeque<(String, usize, Option<EdgeType>)> = VecDeque::new();
    queue.push_back((new.id.clone(), 0, None));

    let mut stmt = conn.prepare(
        "SELECT target_id, edge_type FROM edges WHERE source_id = ?1 ORDER BY target_id",
    )?;

    while let Some((node, hop, via)) = queue.pop_front() {
        if hop >= CAUSAL_SURFACE_HOPS {
            continue;
        }
        let neighbors: Vec<(String, String)> = stmt
            .query_map(params![node], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;

        for (neighbor, edge_type) in neighbors {
            if !visited.insert(neighbor.clone()) {
                continue;
            }
            let Some(edge_type) = EdgeType::parse(&edge_type) else {
                continue;
            };
            let via_edge = via.unwrap_or(edge_type);
            reached.push((neighbor.clone(), hop + 1, via_edge));
            queue.push_back((neighbor, hop + 1, Some(via_edge)));
        }
    }
    drop(stmt);

    if reached.is_empty() {
        return Ok(Vec::new());
    }

    // Load contents for the reached nodes (active only)
    let mut contents: HashMap<String, String> = HashMap::new();
    let mut content_stmt =
        conn.prepare("SELECT content FROM insights WHERE id = ?1 AND deleted_at IS NULL")?;
    for (id, _, _) in &reached {
        if let Some(content) = content_stmt
            .query_row(params![id], |row| row.get::<_, String>(0))
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?
        {
            contents.insert(id.clone(), content);
        }
    }

    let mut candidates: Vec<CausalCandidate> = Vec::new();
    for (id, hop, via_edge) in reached {
        let Some(content) = contents.get(&id) else {
            continue;
        };
        let tokens = tokenize(content);
        if overlap_qualifies(&new.tokens, &tokens).is_none() {
            continue;
        }
        let signal =
            detect_causal_signal(&new.content).or_else(|| detect_causal_signal(content));
        let Some((keyword, sub_type)) = signal else {
            continue;
        };
        candidates.push(CausalCandidate {
            id,
            content: content.clone(),
            hop,
            via_edge,
            causal_signal: keyword.to_string(),
            suggested_sub_type: sub_type.as_str().to_string(),
        });
        if candidates.len() >= CAUSAL_SURFACE_CAP {
            break;
        }
    }

    Ok(candidates)
}
