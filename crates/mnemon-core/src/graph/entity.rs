//! Entity edge builder
//!
//! For each entity carried by the new insight, link up to five other active
//! insights carrying the same entity. Links are bidirectional with weight
//! 1.0; at most fifty edge rows per insert. A pair is linked once even when
//! it shares several entities (the entity layer keys on the pair, so the
//! first shared entity wins).

use std::collections::HashSet;

use rusqlite::Transaction;

use crate::config::{ENTITY_EDGE_CAP, ENTITY_PEERS_PER_ENTITY};
use crate::error::Result;
use crate::memory::{EdgeMetadata, EdgeType};

use super::{PeerSnapshot, insert_bidirectional};

/// Synthesize entity co-occurrence edges; returns rows written
pub(crate) fn synthesize(
    tx: &Transaction<'_>,
    new: &PeerSnapshot,
    peers: &[PeerSnapshot],
) -> Result<usize> {
    let mut rows = 0;
    let mut linked: HashSet<&str> = HashSet::new();

    for entity in &new.entities {
        let mut carriers: Vec<&PeerSnapshot> = peers
            .iter()
            .filter(|p| p.entities.iter().any(|e| e == entity))
            .collect();
        carriers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        for peer in carriers.into_iter().take(ENTITY_PEERS_PER_ENTITY) {
            if !linked.insert(peer.id.as_str()) {
                continue;
            }
            let metadata = EdgeMetadata::Entity {
                entity: entity.clone(),
            };
            rows += insert_bidirectional(
                tx,
                &new.id,
                &peer.id,
                EdgeType::Entity,
                1.0,
                &metadata,
                new.created_at,
            )?;
            if rows >= ENTITY_EDGE_CAP {
                return Ok(rows);
            }
        }
    }

    Ok(rows)
}
