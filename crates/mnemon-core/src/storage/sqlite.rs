//! SQLite Storage Implementation
//!
//! The `Store` owns separate reader and writer connections behind mutexes,
//! so every public operation takes `&self` and the store is `Send + Sync`.
//! The write pipeline (diff, soft-delete, insert, edge synthesis, EI
//! refresh, bounded prune, op-log trim) runs as a single transaction; the
//! observable post-commit state is all of it or none of it.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use lru::LruCache;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::config::{DEFAULT_RECALL_LIMIT, OPLOG_CAP, QUERY_CACHE_CAPACITY};
use crate::dedup::{self, DiffDecision};
use crate::embeddings::{Embedding, EmbeddingClient};
use crate::error::{Result, StoreError};
use crate::extract::extract_entities;
use crate::graph::{self, EdgeCounts, PeerSnapshot};
use crate::lifecycle;
use crate::memory::{
    Action, Category, Edge, EdgeMetadata, EdgeType, Insight, RememberInput, RememberOutcome,
    Source,
};
use crate::recall::{
    Intent, RecallInput, RecallMeta, RecallResponse, RecallResult, anchors, intent,
    rerank, topo, traversal,
};
use crate::similarity::{is_stopword, token_overlap, tokenize};
use crate::surface;

// ============================================================================
// OUTCOME TYPES
// ============================================================================

/// Result of an explicit `link`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkOutcome {
    pub source_id: String,
    pub target_id: String,
    pub edge_type: EdgeType,
    pub weight: f64,
}

/// Result of `forget`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgetOutcome {
    pub id: String,
    /// Edge rows removed by the cascade
    pub edges_removed: usize,
}

/// Result of `gc --keep`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostOutcome {
    pub id: String,
    pub access_count: i64,
    pub effective_importance: f64,
}

/// A low-EI, non-immune insight surfaced by `gc --review`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneCandidate {
    pub id: String,
    pub content: String,
    pub category: Category,
    pub importance: i32,
    pub access_count: i64,
    pub effective_importance: f64,
    pub created_at: DateTime<Utc>,
}

/// A node reached by `related`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedInsight {
    pub id: String,
    pub content: String,
    pub category: Category,
    pub importance: i32,
    /// Graph distance from the start insight
    pub hop: usize,
    /// Edge layer that reached this node
    pub via_edge: EdgeType,
}

/// One op-log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpLogEntry {
    pub id: i64,
    pub operation: String,
    pub insight_id: Option<String>,
    pub detail: Value,
    pub created_at: DateTime<Utc>,
}

/// Result of an embedding backfill pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedBackfill {
    pub embedded: usize,
    pub failed: usize,
    pub remaining: usize,
}

/// Aggregate store counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStatus {
    pub active_insights: i64,
    pub deleted_insights: i64,
    pub by_category: BTreeMap<String, i64>,
    pub edges_by_type: BTreeMap<String, i64>,
    pub with_embedding: i64,
    pub oplog_entries: i64,
    pub ollama_available: bool,
    pub embed_endpoint: String,
    pub embed_model: String,
}

/// A basic search hit (no graph pipeline, no side effects)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub category: Category,
    pub importance: i32,
    pub tags: Vec<String>,
    pub entities: Vec<String>,
    pub source: Source,
    pub created_at: DateTime<Utc>,
    pub score: f64,
}

// ============================================================================
// STORE
// ============================================================================

/// Main storage struct: the memory engine over one logical store
///
/// Separate reader/writer connections give interior mutability; concurrent
/// reads proceed against the WAL snapshot while one writer makes progress.
pub struct Store {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    embedder: EmbeddingClient,
    /// LRU cache so a repeated query is not re-embedded
    query_cache: Mutex<LruCache<String, Option<Embedding>>>,
}

impl Store {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Open (or create) a store at the resolved database path, with the
    /// embedding provider configured from the environment
    pub fn open(db_path: PathBuf) -> Result<Self> {
        Self::open_with_embedder(db_path, EmbeddingClient::from_env())
    }

    /// Open a store with an explicit embedding client
    pub fn open_with_embedder(db_path: PathBuf, embedder: EmbeddingClient) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let writer = Connection::open(&db_path)?;
        Self::configure_connection(&writer)?;
        super::migrations::apply_migrations(&writer)?;

        let reader = Connection::open(&db_path)?;
        Self::configure_connection(&reader)?;

        // SAFETY: the capacity constant is non-zero
        let query_cache = Mutex::new(LruCache::new(
            NonZeroUsize::new(QUERY_CACHE_CAPACITY).expect("cache capacity is non-zero"),
        ));

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            embedder,
            query_cache,
        })
    }

    /// The embedding client this store was opened with
    pub fn embedder(&self) -> &EmbeddingClient {
        &self.embedder
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StoreError::Init("writer lock poisoned".into()))
    }

    fn lock_reader(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StoreError::Init("reader lock poisoned".into()))
    }

    /// Embed a query through the LRU cache
    fn query_embedding(&self, query: &str) -> Option<Embedding> {
        if let Ok(mut cache) = self.query_cache.lock() {
            if let Some(cached) = cache.get(query) {
                return cached.clone();
            }
            let fresh = self.embedder.try_embed(query);
            cache.put(query.to_string(), fresh.clone());
            fresh
        } else {
            self.embedder.try_embed(query)
        }
    }

    // ========================================================================
    // WRITE PIPELINE
    // ========================================================================

    /// The write pipeline: diff, then one atomic transaction of insert,
    /// edge synthesis, EI refresh, and bounded prune, then advisory
    /// candidate surfacing
    pub fn remember(&self, input: RememberInput) -> Result<RememberOutcome> {
        input.validate()?;
        let now = Utc::now();

        let entities = extract_entities(&input.content, &input.entities);
        let quality_warnings = quality_warnings(&input.content, &entities);
        let embedding = self.embedder.try_embed(&input.content);
        let embedded = embedding.is_some();

        // diff runs outside the transaction, read-only
        let peers = {
            let reader = self.lock_reader()?;
            load_peer_snapshots(&reader, None, None, None)?
        };
        let decision = if input.no_diff {
            DiffDecision::Add
        } else {
            dedup::diff(&input.content, embedding.as_ref(), &peers)
        };

        if let DiffDecision::Skip {
            duplicate_id,
            similarity,
        } = &decision
        {
            let duplicate_id = duplicate_id.clone();
            let mut writer = self.lock_writer()?;
            let tx = writer.transaction()?;
            append_oplog(
                &tx,
                "remember",
                Some(duplicate_id.as_str()),
                json!({"action": "skipped", "similarity": similarity}),
                now,
            )?;
            trim_oplog(&tx)?;
            tx.commit()?;
            drop(writer);

            let reader = self.lock_reader()?;
            let effective_importance: f64 = reader
                .query_row(
                    "SELECT effective_importance FROM insights WHERE id = ?1",
                    params![duplicate_id],
                    |row| row.get(0),
                )
                .optional()?
                .unwrap_or(0.0);

            tracing::debug!(id = %duplicate_id, similarity, "skipped near-duplicate");
            return Ok(RememberOutcome {
                id: duplicate_id,
                action: Action::Skipped,
                replaced_id: None,
                edges_created: EdgeCounts::default(),
                semantic_candidates: vec![],
                causal_candidates: vec![],
                quality_warnings,
                embedded,
                effective_importance,
                auto_pruned: 0,
            });
        }

        let (action, replaced_id) = match &decision {
            DiffDecision::Replace { replaced_id, .. } => {
                (Action::Replaced, Some(replaced_id.clone()))
            }
            _ => (Action::Added, None),
        };

        let id = Uuid::new_v4().to_string();
        let new_snapshot = PeerSnapshot::new(
            id.clone(),
            input.content.clone(),
            input.source,
            now,
            entities.clone(),
            embedding.clone(),
        );

        let (edges_created, auto_pruned, effective_importance) = {
            let mut writer = self.lock_writer()?;
            let tx = writer.transaction()?;

            if let Some(replaced) = &replaced_id {
                soft_delete_cascade(&tx, replaced, now)?;
            }

            tx.execute(
                "INSERT INTO insights (
                    id, content, category, importance, tags, entities, source,
                    embedding, access_count, last_accessed_at,
                    effective_importance, created_at, updated_at, deleted_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                    ?8, 0, NULL,
                    0, ?9, ?9, NULL
                )",
                params![
                    id,
                    input.content,
                    input.category.as_str(),
                    input.importance,
                    serde_json::to_string(&input.tags).unwrap_or_else(|_| "[]".into()),
                    serde_json::to_string(&entities).unwrap_or_else(|_| "[]".into()),
                    input.source.as_str(),
                    embedding.as_ref().map(|e| e.to_bytes()),
                    now,
                ],
            )?;

            // the synthesis set is the active set minus the superseded row
            let synth_peers: Vec<PeerSnapshot> = peers
                .iter()
                .filter(|p| Some(&p.id) != replaced_id.as_ref())
                .cloned()
                .collect();

            let edges_created = EdgeCounts {
                temporal: graph::temporal::synthesize(&tx, &new_snapshot, &synth_peers)?,
                entity: graph::entity::synthesize(&tx, &new_snapshot, &synth_peers)?,
                causal: graph::causal::synthesize(&tx, &new_snapshot, &synth_peers)?,
                semantic: graph::semantic::synthesize(&tx, &new_snapshot, &synth_peers)?,
            };

            lifecycle::refresh_all(&tx, now)?;
            let pruned = lifecycle::prune(&tx, now)?;
            for victim in &pruned {
                append_oplog(
                    &tx,
                    "gc",
                    Some(victim.as_str()),
                    json!({"mode": "auto_prune"}),
                    now,
                )?;
            }

            append_oplog(
                &tx,
                "remember",
                Some(id.as_str()),
                json!({
                    "action": action.as_str(),
                    "replaced_id": replaced_id,
                    "edges": edges_created.total(),
                }),
                now,
            )?;
            trim_oplog(&tx)?;

            let effective_importance: f64 = tx.query_row(
                "SELECT effective_importance FROM insights WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )?;

            tx.commit()?;
            (edges_created, pruned.len(), effective_importance)
        };

        // advisory surfacing runs after commit, read-only
        let (semantic_candidates, causal_candidates) = {
            let reader = self.lock_reader()?;
            let peers_after = load_peer_snapshots(&reader, Some(&id), None, None)?;
            let semantic = surface::semantic_candidates(&new_snapshot, &peers_after);
            let causal = surface::causal_candidates(&reader, &new_snapshot)?;
            (semantic, causal)
        };

        tracing::debug!(
            id = %id,
            action = action.as_str(),
            edges = edges_created.total(),
            "insight stored"
        );

        Ok(RememberOutcome {
            id,
            action,
            replaced_id,
            edges_created,
            semantic_candidates,
            causal_candidates,
            quality_warnings,
            embedded,
            effective_importance,
            auto_pruned,
        })
    }

    // ========================================================================
    // READ PIPELINE
    // ========================================================================

    /// Smart recall: intent detection, RRF anchor selection, beam traversal,
    /// multi-factor rerank, causal ordering for WHY
    pub fn recall(&self, input: RecallInput) -> Result<RecallResponse> {
        if input.query.trim().is_empty() {
            return Err(StoreError::InvalidInput("query must not be empty".into()));
        }
        let limit = if input.limit == 0 {
            DEFAULT_RECALL_LIMIT
        } else {
            input.limit
        };
        let intent = input.intent.unwrap_or_else(|| intent::detect(&input.query));
        let query_embedding = self.query_embedding(&input.query);
        let now = Utc::now();

        let (ranked, anchors_len, pool_len) = {
            let reader = self.lock_reader()?;
            let peers = load_peer_snapshots(&reader, None, input.category, input.source)?;
            if peers.is_empty() {
                return Ok(RecallResponse {
                    meta: RecallMeta {
                        intent,
                        anchors: 0,
                        candidates: 0,
                        embedded: query_embedding.is_some(),
                    },
                    results: vec![],
                });
            }

            let anchor_set =
                anchors::select_anchors(&peers, &input.query, query_embedding.as_ref());
            let peers_by_id: HashMap<&str, &PeerSnapshot> =
                peers.iter().map(|p| (p.id.as_str(), p)).collect();

            let pool = if input.basic {
                anchor_set
                    .iter()
                    .map(|(id, rrf)| {
                        (
                            id.clone(),
                            traversal::PoolEntry {
                                score: *rrf,
                                via: None,
                            },
                        )
                    })
                    .collect()
            } else {
                let adjacency = load_adjacency(&reader, &peers_by_id)?;
                let embeddings: HashMap<String, Embedding> = peers
                    .iter()
                    .filter_map(|p| p.embedding.clone().map(|e| (p.id.clone(), e)))
                    .collect();
                traversal::traverse(
                    &anchor_set,
                    &adjacency,
                    &embeddings,
                    query_embedding.as_ref(),
                    intent,
                )
            };

            let query_tokens = tokenize(&input.query);
            let query_entities = extract_entities(&input.query, &[]);
            let mut ranked: Vec<rerank::RankedCandidate> = rerank::rerank(
                &pool,
                &peers_by_id,
                &query_tokens,
                &query_entities,
                query_embedding.as_ref(),
                intent,
            );
            let pool_len = ranked.len();
            ranked.truncate(limit);

            // causes precede effects for WHY queries
            if intent == Intent::Why && ranked.len() > 1 {
                let ids: Vec<String> = ranked.iter().map(|r| r.id.clone()).collect();
                let causal_edges = load_causal_edges(&reader, &ids)?;
                let scores: HashMap<String, f64> =
                    ranked.iter().map(|r| (r.id.clone(), r.score)).collect();
                let order = topo::causal_order(&ids, &causal_edges, &scores);
                let index: HashMap<&str, usize> = order
                    .iter()
                    .enumerate()
                    .map(|(i, id)| (id.as_str(), i))
                    .collect();
                ranked.sort_by_key(|r| index.get(r.id.as_str()).copied().unwrap_or(usize::MAX));
            }

            (ranked, anchor_set.len(), pool_len)
        };

        // side effects: access counters, inline EI refresh, op-log
        if !ranked.is_empty() {
            let mut writer = self.lock_writer()?;
            let tx = writer.transaction()?;
            for candidate in &ranked {
                tx.execute(
                    "UPDATE insights
                     SET access_count = access_count + 1, last_accessed_at = ?1
                     WHERE id = ?2 AND deleted_at IS NULL",
                    params![now, candidate.id],
                )?;
                lifecycle::refresh_one(&tx, &candidate.id, now)?;
            }
            append_oplog(
                &tx,
                "recall",
                None,
                json!({
                    "query": input.query,
                    "intent": intent.as_str(),
                    "results": ranked.len(),
                }),
                now,
            )?;
            trim_oplog(&tx)?;
            tx.commit()?;
        }

        // assemble full rows for the final hits
        let reader = self.lock_reader()?;
        let mut results = Vec::with_capacity(ranked.len());
        for candidate in ranked {
            let Some(insight) = get_insight(&reader, &candidate.id)? else {
                continue;
            };
            results.push(RecallResult {
                id: insight.id,
                content: insight.content,
                category: insight.category,
                importance: insight.importance,
                tags: insight.tags,
                entities: insight.entities,
                source: insight.source,
                created_at: insight.created_at,
                score: candidate.score,
                signals: candidate.signals,
                via: candidate.via,
                intent,
            });
        }

        Ok(RecallResponse {
            meta: RecallMeta {
                intent,
                anchors: anchors_len,
                candidates: pool_len,
                embedded: query_embedding.is_some(),
            },
            results,
        })
    }

    /// Basic keyword search over the active set; no graph pipeline, no
    /// access-count side effects
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        category: Option<Category>,
        source: Option<Source>,
    ) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(StoreError::InvalidInput("query must not be empty".into()));
        }
        let limit = if limit == 0 { DEFAULT_RECALL_LIMIT } else { limit };
        let query_tokens = tokenize(query);

        let reader = self.lock_reader()?;
        let peers = load_peer_snapshots(&reader, None, category, source)?;

        let mut scored: Vec<(&PeerSnapshot, f64)> = peers
            .iter()
            .map(|p| (p, token_overlap(&query_tokens, &p.tokens)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));

        let mut hits = Vec::new();
        for (peer, score) in scored.into_iter().take(limit) {
            let Some(insight) = get_insight(&reader, &peer.id)? else {
                continue;
            };
            hits.push(SearchHit {
                id: insight.id,
                content: insight.content,
                category: insight.category,
                importance: insight.importance,
                tags: insight.tags,
                entities: insight.entities,
                source: insight.source,
                created_at: insight.created_at,
                score,
            });
        }
        Ok(hits)
    }

    // ========================================================================
    // EXPLICIT GRAPH OPERATIONS
    // ========================================================================

    /// Idempotent upsert of one directed edge
    pub fn link(
        &self,
        source_id: &str,
        target_id: &str,
        edge_type: EdgeType,
        weight: f64,
        metadata: Option<Map<String, Value>>,
    ) -> Result<LinkOutcome> {
        if source_id == target_id {
            return Err(StoreError::InvalidInput("self-loops are not allowed".into()));
        }
        if !(0.0..=1.0).contains(&weight) {
            return Err(StoreError::InvalidInput(
                "weight must be within [0.0, 1.0]".into(),
            ));
        }

        let now = Utc::now();
        let mut writer = self.lock_writer()?;
        let tx = writer.transaction()?;

        for id in [source_id, target_id] {
            if !insight_is_active(&tx, id)? {
                return Err(StoreError::NotFound(id.to_string()));
            }
        }

        let metadata = EdgeMetadata::Other(metadata.unwrap_or_default());
        graph::upsert_edge(&tx, source_id, target_id, edge_type, weight, &metadata, now)?;

        // connectivity feeds the EI edge factor on both endpoints
        lifecycle::refresh_one(&tx, source_id, now)?;
        lifecycle::refresh_one(&tx, target_id, now)?;

        append_oplog(
            &tx,
            "link",
            Some(source_id),
            json!({
                "target_id": target_id,
                "edge_type": edge_type.as_str(),
                "weight": weight,
            }),
            now,
        )?;
        trim_oplog(&tx)?;
        tx.commit()?;

        Ok(LinkOutcome {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            edge_type,
            weight,
        })
    }

    /// Soft-delete an insight and cascade away its edges
    pub fn forget(&self, id: &str) -> Result<ForgetOutcome> {
        let now = Utc::now();
        let mut writer = self.lock_writer()?;
        let tx = writer.transaction()?;

        if !insight_is_active(&tx, id)? {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let edges_removed = soft_delete_cascade(&tx, id, now)?;
        append_oplog(
            &tx,
            "forget",
            Some(id),
            json!({"edges_removed": edges_removed}),
            now,
        )?;
        trim_oplog(&tx)?;
        tx.commit()?;

        Ok(ForgetOutcome {
            id: id.to_string(),
            edges_removed,
        })
    }

    /// BFS from an insight along one edge type (or all of them)
    pub fn related(
        &self,
        id: &str,
        edge_type: Option<EdgeType>,
        depth: usize,
    ) -> Result<Vec<RelatedInsight>> {
        let depth = depth.max(1);
        let reader = self.lock_reader()?;

        if !insight_is_active(&reader, id)? {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let mut results: Vec<RelatedInsight> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(id.to_string());
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        queue.push_back((id.to_string(), 0));

        let mut stmt = reader.prepare(
            "SELECT e.target_id, e.edge_type, i.content, i.category, i.importance
             FROM edges e
             JOIN insights i ON i.id = e.target_id AND i.deleted_at IS NULL
             WHERE e.source_id = ?1 AND (?2 IS NULL OR e.edge_type = ?2)
             ORDER BY e.target_id",
        )?;

        while let Some((node, hop)) = queue.pop_front() {
            if hop >= depth {
                continue;
            }
            let rows: Vec<(String, String, String, String, i32)> = stmt
                .query_map(
                    params![node, edge_type.map(|t| t.as_str())],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                        ))
                    },
                )?
                .collect::<std::result::Result<_, _>>()?;

            for (target, via, content, category, importance) in rows {
                if !visited.insert(target.clone()) {
                    continue;
                }
                let Some(via_edge) = EdgeType::parse(&via) else {
                    continue;
                };
                results.push(RelatedInsight {
                    id: target.clone(),
                    content,
                    category: Category::parse(&category).unwrap_or_default(),
                    importance,
                    hop: hop + 1,
                    via_edge,
                });
                queue.push_back((target, hop + 1));
            }
        }

        Ok(results)
    }

    // ========================================================================
    // LIFECYCLE OPERATIONS
    // ========================================================================

    /// Boost ("keep"): unconditionally crosses the immunity threshold
    pub fn boost(&self, id: &str) -> Result<BoostOutcome> {
        let now = Utc::now();
        let mut writer = self.lock_writer()?;
        let tx = writer.transaction()?;

        if !insight_is_active(&tx, id)? {
            return Err(StoreError::NotFound(id.to_string()));
        }

        tx.execute(
            "UPDATE insights SET access_count = access_count + ?1, updated_at = ?2 WHERE id = ?3",
            params![crate::config::BOOST_INCREMENT, now, id],
        )?;
        let effective_importance = lifecycle::refresh_one(&tx, id, now)?;
        let access_count: i64 = tx.query_row(
            "SELECT access_count FROM insights WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;

        append_oplog(&tx, "gc", Some(id), json!({"mode": "keep"}), now)?;
        trim_oplog(&tx)?;
        tx.commit()?;

        Ok(BoostOutcome {
            id: id.to_string(),
            access_count,
            effective_importance,
        })
    }

    /// Read-only review of prune candidates below an EI threshold
    pub fn gc_review(&self, threshold: f64, limit: usize) -> Result<Vec<PruneCandidate>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare(
            "SELECT id, content, category, importance, access_count,
                    effective_importance, created_at
             FROM insights
             WHERE deleted_at IS NULL
               AND importance < ?1 AND access_count < ?2
               AND effective_importance < ?3
             ORDER BY effective_importance ASC, id ASC
             LIMIT ?4",
        )?;
        let candidates = stmt
            .query_map(
                params![
                    crate::config::IMMUNITY_IMPORTANCE_MIN,
                    crate::config::IMMUNITY_ACCESS_MIN,
                    threshold,
                    limit as i64,
                ],
                |row| {
                    Ok(PruneCandidate {
                        id: row.get(0)?,
                        content: row.get(1)?,
                        category: Category::parse(&row.get::<_, String>(2)?).unwrap_or_default(),
                        importance: row.get(3)?,
                        access_count: row.get(4)?,
                        effective_importance: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                },
            )?
            .collect::<std::result::Result<_, _>>()?;
        Ok(candidates)
    }

    // ========================================================================
    // INSPECTION
    // ========================================================================

    /// Fetch one insight by id (active or soft-deleted)
    pub fn get(&self, id: &str) -> Result<Option<Insight>> {
        let reader = self.lock_reader()?;
        get_insight(&reader, id)
    }

    /// All edges touching an insight, outgoing first
    pub fn edges_of(&self, id: &str) -> Result<Vec<Edge>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare(
            "SELECT source_id, target_id, edge_type, weight, metadata, created_at
             FROM edges WHERE source_id = ?1 OR target_id = ?1
             ORDER BY source_id, target_id, edge_type",
        )?;
        let edges = stmt
            .query_map(params![id], row_to_edge)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(edges)
    }

    /// Every edge in the store (visualization support)
    pub fn all_edges(&self) -> Result<Vec<Edge>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare(
            "SELECT source_id, target_id, edge_type, weight, metadata, created_at
             FROM edges ORDER BY source_id, target_id, edge_type",
        )?;
        let edges = stmt
            .query_map([], row_to_edge)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(edges)
    }

    /// Every active insight (visualization support)
    pub fn all_active(&self) -> Result<Vec<Insight>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare(
            "SELECT id, content, category, importance, tags, entities, source,
                    embedding, access_count, last_accessed_at,
                    effective_importance, created_at, updated_at, deleted_at
             FROM insights WHERE deleted_at IS NULL ORDER BY created_at",
        )?;
        let insights = stmt
            .query_map([], row_to_insight)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(insights)
    }

    /// Aggregate counters for `status`
    pub fn status(&self) -> Result<StoreStatus> {
        let reader = self.lock_reader()?;

        let active_insights: i64 = reader.query_row(
            "SELECT COUNT(*) FROM insights WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        let deleted_insights: i64 = reader.query_row(
            "SELECT COUNT(*) FROM insights WHERE deleted_at IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        let with_embedding: i64 = reader.query_row(
            "SELECT COUNT(*) FROM insights WHERE deleted_at IS NULL AND embedding IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        let oplog_entries: i64 =
            reader.query_row("SELECT COUNT(*) FROM oplog", [], |row| row.get(0))?;

        let mut by_category = BTreeMap::new();
        let mut stmt = reader.prepare(
            "SELECT category, COUNT(*) FROM insights WHERE deleted_at IS NULL GROUP BY category",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (category, count) = row?;
            by_category.insert(category, count);
        }
        drop(stmt);

        let mut edges_by_type = BTreeMap::new();
        let mut stmt =
            reader.prepare("SELECT edge_type, COUNT(*) FROM edges GROUP BY edge_type")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (edge_type, count) = row?;
            edges_by_type.insert(edge_type, count);
        }
        drop(stmt);

        Ok(StoreStatus {
            active_insights,
            deleted_insights,
            by_category,
            edges_by_type,
            with_embedding,
            oplog_entries,
            ollama_available: self.embedder.is_available(),
            embed_endpoint: self.embedder.endpoint().to_string(),
            embed_model: self.embedder.model().to_string(),
        })
    }

    /// Most recent op-log entries, newest first
    pub fn oplog(&self, limit: usize) -> Result<Vec<OpLogEntry>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare(
            "SELECT id, operation, insight_id, detail, created_at
             FROM oplog ORDER BY id DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit as i64], |row| {
                Ok(OpLogEntry {
                    id: row.get(0)?,
                    operation: row.get(1)?,
                    insight_id: row.get(2)?,
                    detail: serde_json::from_str(&row.get::<_, String>(3)?)
                        .unwrap_or(Value::Null),
                    created_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(entries)
    }

    // ========================================================================
    // EMBEDDING MAINTENANCE
    // ========================================================================

    /// Embed one insight now; `Ok(false)` when the provider declined
    pub fn embed_one(&self, id: &str) -> Result<bool> {
        let content = {
            let reader = self.lock_reader()?;
            reader
                .query_row(
                    "SELECT content FROM insights WHERE id = ?1 AND deleted_at IS NULL",
                    params![id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?
        };

        let Some(embedding) = self.embedder.try_embed(&content) else {
            return Ok(false);
        };

        let now = Utc::now();
        let writer = self.lock_writer()?;
        writer.execute(
            "UPDATE insights SET embedding = ?1, updated_at = ?2 WHERE id = ?3",
            params![embedding.to_bytes(), now, id],
        )?;
        Ok(true)
    }

    /// Backfill embeddings for active insights missing one
    pub fn embed_missing(&self, limit: usize) -> Result<EmbedBackfill> {
        let pending: Vec<(String, String)> = {
            let reader = self.lock_reader()?;
            let mut stmt = reader.prepare(
                "SELECT id, content FROM insights
                 WHERE deleted_at IS NULL AND embedding IS NULL
                 ORDER BY created_at ASC LIMIT ?1",
            )?;
            stmt.query_map(params![limit as i64], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<std::result::Result<_, _>>()?
        };

        let now = Utc::now();
        let mut embedded = 0;
        let mut failed = 0;
        for (id, content) in &pending {
            match self.embedder.try_embed(content) {
                Some(embedding) => {
                    let writer = self.lock_writer()?;
                    writer.execute(
                        "UPDATE insights SET embedding = ?1, updated_at = ?2 WHERE id = ?3",
                        params![embedding.to_bytes(), now, id],
                    )?;
                    embedded += 1;
                }
                None => failed += 1,
            }
        }

        let remaining: i64 = {
            let reader = self.lock_reader()?;
            reader.query_row(
                "SELECT COUNT(*) FROM insights WHERE deleted_at IS NULL AND embedding IS NULL",
                [],
                |row| row.get(0),
            )?
        };

        Ok(EmbedBackfill {
            embedded,
            failed,
            remaining: remaining as usize,
        })
    }
}

// ============================================================================
// ROW MAPPING & SHARED SQL
// ============================================================================

fn row_to_insight(row: &rusqlite::Row<'_>) -> rusqlite::Result<Insight> {
    let tags: String = row.get(4)?;
    let entities: String = row.get(5)?;
    let embedding: Option<Vec<u8>> = row.get(7)?;
    Ok(Insight {
        id: row.get(0)?,
        content: row.get(1)?,
        category: Category::parse(&row.get::<_, String>(2)?).unwrap_or_default(),
        importance: row.get(3)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        entities: serde_json::from_str(&entities).unwrap_or_default(),
        source: Source::parse(&row.get::<_, String>(6)?).unwrap_or_default(),
        embedding: embedding.as_deref().and_then(Embedding::from_bytes),
        access_count: row.get(8)?,
        last_accessed_at: row.get(9)?,
        effective_importance: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
        deleted_at: row.get(13)?,
    })
}

fn row_to_edge(row: &rusqlite::Row<'_>) -> rusqlite::Result<Edge> {
    let metadata: String = row.get(4)?;
    Ok(Edge {
        source_id: row.get(0)?,
        target_id: row.get(1)?,
        edge_type: EdgeType::parse(&row.get::<_, String>(2)?).unwrap_or(EdgeType::Semantic),
        weight: row.get(3)?,
        metadata: serde_json::from_str(&metadata).unwrap_or_default(),
        created_at: row.get(5)?,
    })
}

fn get_insight(conn: &Connection, id: &str) -> Result<Option<Insight>> {
    let insight = conn
        .query_row(
            "SELECT id, content, category, importance, tags, entities, source,
                    embedding, access_count, last_accessed_at,
                    effective_importance, created_at, updated_at, deleted_at
             FROM insights WHERE id = ?1",
            params![id],
            row_to_insight,
        )
        .optional()?;
    Ok(insight)
}

fn insight_is_active(conn: &Connection, id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM insights WHERE id = ?1 AND deleted_at IS NULL",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Load the active set as in-memory snapshots, optionally filtered
fn load_peer_snapshots(
    conn: &Connection,
    exclude_id: Option<&str>,
    category: Option<Category>,
    source: Option<Source>,
) -> Result<Vec<PeerSnapshot>> {
    let mut stmt = conn.prepare(
        "SELECT id, content, source, created_at, entities, embedding, category
         FROM insights WHERE deleted_at IS NULL",
    )?;
    let rows = stmt.query_map([], |row| {
        let entities: String = row.get(4)?;
        let embedding: Option<Vec<u8>> = row.get(5)?;
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, DateTime<Utc>>(3)?,
            entities,
            embedding,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut peers = Vec::new();
    for row in rows {
        let (id, content, source_str, created_at, entities, embedding, category_str) = row?;
        if Some(id.as_str()) == exclude_id {
            continue;
        }
        if let Some(wanted) = category {
            if Category::parse(&category_str) != Some(wanted) {
                continue;
            }
        }
        let row_source = Source::parse(&source_str).unwrap_or_default();
        if let Some(wanted) = source {
            if row_source != wanted {
                continue;
            }
        }
        peers.push(PeerSnapshot::new(
            id,
            content,
            row_source,
            created_at,
            serde_json::from_str(&entities).unwrap_or_default(),
            embedding.as_deref().and_then(Embedding::from_bytes),
        ));
    }
    Ok(peers)
}

/// Adjacency restricted to the given active node set
fn load_adjacency(
    conn: &Connection,
    peers_by_id: &HashMap<&str, &PeerSnapshot>,
) -> Result<HashMap<String, Vec<traversal::EdgeRef>>> {
    let mut stmt =
        conn.prepare("SELECT source_id, target_id, edge_type, weight FROM edges")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, f64>(3)?,
        ))
    })?;

    let mut adjacency: HashMap<String, Vec<traversal::EdgeRef>> = HashMap::new();
    for row in rows {
        let (source, target, edge_type, weight) = row?;
        if !peers_by_id.contains_key(source.as_str()) || !peers_by_id.contains_key(target.as_str())
        {
            continue;
        }
        let Some(edge_type) = EdgeType::parse(&edge_type) else {
            continue;
        };
        adjacency.entry(source).or_default().push(traversal::EdgeRef {
            target,
            edge_type,
            weight,
        });
    }

    // deterministic expansion order
    for edges in adjacency.values_mut() {
        edges.sort_by(|a, b| {
            a.target
                .cmp(&b.target)
                .then_with(|| a.edge_type.as_str().cmp(b.edge_type.as_str()))
        });
    }
    Ok(adjacency)
}

/// Causal edges among a small id set, stored direction read as
/// cause -> effect
fn load_causal_edges(conn: &Connection, ids: &[String]) -> Result<Vec<topo::CausalEdge>> {
    let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let mut stmt = conn.prepare(
        "SELECT source_id, target_id, weight FROM edges WHERE edge_type = 'causal'",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
        ))
    })?;

    let mut edges = Vec::new();
    for row in rows {
        let (source, target, weight) = row?;
        if id_set.contains(source.as_str()) && id_set.contains(target.as_str()) {
            edges.push(topo::CausalEdge {
                source,
                target,
                weight,
            });
        }
    }
    Ok(edges)
}

/// Soft-delete one insight and hard-delete every incident edge
fn soft_delete_cascade(tx: &Transaction<'_>, id: &str, now: DateTime<Utc>) -> Result<usize> {
    tx.execute(
        "UPDATE insights SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        params![now, id],
    )?;
    let removed = tx.execute(
        "DELETE FROM edges WHERE source_id = ?1 OR target_id = ?1",
        params![id],
    )?;
    Ok(removed)
}

fn append_oplog(
    tx: &Transaction<'_>,
    operation: &str,
    insight_id: Option<&str>,
    detail: Value,
    now: DateTime<Utc>,
) -> Result<()> {
    tx.execute(
        "INSERT INTO oplog (operation, insight_id, detail, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![operation, insight_id, detail.to_string(), now],
    )?;
    Ok(())
}

/// Keep only the most recent entries
fn trim_oplog(tx: &Transaction<'_>) -> Result<()> {
    tx.execute(
        "DELETE FROM oplog WHERE id NOT IN (SELECT id FROM oplog ORDER BY id DESC LIMIT ?1)",
        params![OPLOG_CAP as i64],
    )?;
    Ok(())
}

/// Advisory content checks; never fatal
fn quality_warnings(content: &str, entities: &[String]) -> Vec<String> {
    let mut warnings = Vec::new();

    if content.chars().count() < 15 {
        warnings.push("content_very_short".to_string());
    }
    if entities.is_empty() {
        warnings.push("no_entities".to_string());
    }

    let words: Vec<&str> = content.split_whitespace().collect();
    if !words.is_empty() {
        let stopwords = words
            .iter()
            .filter(|w| {
                let trimmed = w
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase();
                !trimmed.is_empty() && is_stopword(&trimmed)
            })
            .count();
        if stopwords as f64 / words.len() as f64 > 0.6 {
            warnings.push("low_information".to_string());
        }
    }

    warnings
}
