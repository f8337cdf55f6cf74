//! End-to-end engine tests over temporary databases.
//!
//! The embedding provider is disabled throughout, so similarity runs on
//! token overlap everywhere; behavior that depends on cosine bands has
//! dedicated unit tests next to the code.

use mnemon_core::{
    Action, Category, EdgeType, EmbeddingClient, Intent, RecallInput, RememberInput, Source, Store,
};
use tempfile::TempDir;

fn test_store() -> (Store, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = Store::open_with_embedder(
        dir.path().join("mnemon.db"),
        EmbeddingClient::disabled(),
    )
    .unwrap();
    (store, dir)
}

fn remember(store: &Store, content: &str) -> String {
    remember_with(store, content, |_| {})
}

fn remember_with(
    store: &Store,
    content: &str,
    tweak: impl FnOnce(&mut RememberInput),
) -> String {
    let mut input = RememberInput {
        content: content.to_string(),
        ..Default::default()
    };
    tweak(&mut input);
    let outcome = store.remember(input).unwrap();
    outcome.id
}

// ============================================================================
// WRITE PIPELINE
// ============================================================================

#[test]
fn fresh_insert_into_empty_store() {
    let (store, _dir) = test_store();

    let outcome = store
        .remember(RememberInput {
            content: "Chose Qdrant over Milvus for vector DB".into(),
            category: Category::Decision,
            importance: 5,
            entities: vec!["Qdrant".into(), "Milvus".into()],
            ..Default::default()
        })
        .unwrap();

    assert_eq!(outcome.action, Action::Added);
    assert_eq!(outcome.edges_created.total(), 0);
    assert!(outcome.semantic_candidates.is_empty());
    assert!(outcome.causal_candidates.is_empty());
    assert_eq!(outcome.auto_pruned, 0);
    assert!(outcome.effective_importance > 0.0);
    assert!(!outcome.embedded);

    let status = store.status().unwrap();
    assert_eq!(status.active_insights, 1);
    assert_eq!(status.by_category.get("decision"), Some(&1));
}

#[test]
fn temporal_backbone_and_proximity() {
    let (store, _dir) = test_store();

    let _first = remember(&store, "Deployed the ingest worker on staging");
    let second = remember(&store, "Kafka consumer lag dropped after tuning");
    let outcome = store
        .remember(RememberInput {
            content: "Switched checkout sessions onto the new queue".into(),
            ..Default::default()
        })
        .unwrap();

    // backbone to the immediately preceding same-source insight plus at
    // least one proximity link, two rows each
    assert!(outcome.edges_created.temporal >= 2);

    let edges = store.edges_of(&outcome.id).unwrap();
    let backbones: Vec<_> = edges
        .iter()
        .filter(|e| {
            e.edge_type == EdgeType::Temporal
                && e.source_id == outcome.id
                && e.metadata.get("sub_type").and_then(|v| v.as_str()) == Some("backbone")
        })
        .collect();
    assert_eq!(backbones.len(), 1);
    assert_eq!(backbones[0].target_id, second);
    assert_eq!(backbones[0].weight, 1.0);
}

#[test]
fn proximity_partner_cap_holds_in_a_crowded_window() {
    let (store, _dir) = test_store();

    for i in 0..15 {
        remember(&store, &format!("Recorded measurement run-{i} for sensor {i}"));
    }
    let outcome = store
        .remember(RememberInput {
            content: "Recorded measurement run-final for sensor final".into(),
            ..Default::default()
        })
        .unwrap();

    let edges = store.edges_of(&outcome.id).unwrap();
    let proximity_partners: std::collections::HashSet<&str> = edges
        .iter()
        .filter(|e| {
            e.edge_type == EdgeType::Temporal
                && e.source_id == outcome.id
                && e.metadata.get("sub_type").and_then(|v| v.as_str()) == Some("proximity")
        })
        .map(|e| e.target_id.as_str())
        .collect();
    assert!(proximity_partners.len() <= 10);
}

#[test]
fn entity_co_occurrence_links_both_ways() {
    let (store, _dir) = test_store();

    let a = remember(&store, "We use HttpServer and DataStore");
    let outcome = store
        .remember(RememberInput {
            content: "HttpServer handles all API requests".into(),
            ..Default::default()
        })
        .unwrap();

    assert!(outcome.edges_created.entity >= 2);

    let related = store.related(&a, Some(EdgeType::Entity), 1).unwrap();
    assert!(related.iter().any(|r| r.id == outcome.id));
}

#[test]
fn causal_keyword_detection_points_at_the_cause() {
    let (store, _dir) = test_store();

    let x = remember(&store, "Alpha service handles request routing");
    let outcome = store
        .remember(RememberInput {
            content: "Request routing uses Alpha service because of low latency".into(),
            ..Default::default()
        })
        .unwrap();

    assert!(outcome.edges_created.causal >= 1);

    // the keyword bearer (the new insight) points at its cause
    let edges = store.edges_of(&outcome.id).unwrap();
    let causal: Vec<_> = edges
        .iter()
        .filter(|e| e.edge_type == EdgeType::Causal)
        .collect();
    assert!(causal
        .iter()
        .any(|e| e.source_id == outcome.id && e.target_id == x));
    let reason = causal[0].metadata.get("reason").and_then(|v| v.as_str());
    assert_eq!(reason, Some("because"));
}

#[test]
fn diff_replaces_close_content_and_hides_the_old_row() {
    let (store, _dir) = test_store();

    let a = remember(&store, "User prefers PostgreSQL");
    let outcome = store
        .remember(RememberInput {
            content: "User prefers PostgreSQL database".into(),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(outcome.action, Action::Replaced);
    assert_eq!(outcome.replaced_id.as_deref(), Some(a.as_str()));

    let old = store.get(&a).unwrap().unwrap();
    assert!(!old.is_active());

    let hits = store.search("PostgreSQL", 10, None, None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, outcome.id);
}

#[test]
fn identical_content_is_skipped_with_the_original_id() {
    let (store, _dir) = test_store();

    let first = remember(&store, "Kafka topic compaction is enabled in prod");
    let outcome = store
        .remember(RememberInput {
            content: "Kafka topic compaction is enabled in prod".into(),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(outcome.action, Action::Skipped);
    assert_eq!(outcome.id, first);
    assert_eq!(store.status().unwrap().active_insights, 1);
}

#[test]
fn no_diff_bypasses_the_duplicate_check() {
    let (store, _dir) = test_store();

    let first = remember(&store, "Nightly backups rotate every seven days");
    let outcome = store
        .remember(RememberInput {
            content: "Nightly backups rotate every seven days".into(),
            no_diff: true,
            ..Default::default()
        })
        .unwrap();

    assert_eq!(outcome.action, Action::Added);
    assert_ne!(outcome.id, first);
    assert_eq!(store.status().unwrap().active_insights, 2);
}

#[test]
fn oversized_content_is_rejected_before_any_state_change() {
    let (store, _dir) = test_store();

    let result = store.remember(RememberInput {
        content: "x".repeat(8001),
        ..Default::default()
    });
    assert!(result.is_err());
    assert_eq!(store.status().unwrap().active_insights, 0);
}

#[test]
fn quality_warnings_flag_thin_content() {
    let (store, _dir) = test_store();

    let outcome = store
        .remember(RememberInput {
            content: "it is so".into(),
            ..Default::default()
        })
        .unwrap();

    assert!(outcome
        .quality_warnings
        .contains(&"content_very_short".to_string()));
    assert!(outcome.quality_warnings.contains(&"no_entities".to_string()));
}

// ============================================================================
// EXPLICIT GRAPH OPERATIONS
// ============================================================================

#[test]
fn link_is_an_idempotent_upsert() {
    let (store, _dir) = test_store();

    let a = remember(&store, "Payment retries go through the outbox");
    let b = remember(&store, "Webhook delivery is at-least-once");

    store.link(&a, &b, EdgeType::Causal, 0.5, None).unwrap();
    store.link(&a, &b, EdgeType::Causal, 0.9, None).unwrap();

    let causal: Vec<_> = store
        .edges_of(&a)
        .unwrap()
        .into_iter()
        .filter(|e| e.edge_type == EdgeType::Causal && e.source_id == a && e.target_id == b)
        .collect();
    assert_eq!(causal.len(), 1);
    assert_eq!(causal[0].weight, 0.9);
}

#[test]
fn link_validates_endpoints_weight_and_self_loops() {
    let (store, _dir) = test_store();
    let a = remember(&store, "Sessions live in Redis now");

    assert!(store.link(&a, &a, EdgeType::Semantic, 0.5, None).is_err());
    assert!(store.link(&a, "missing", EdgeType::Semantic, 0.5, None).is_err());
    let b = remember(&store, "Cache invalidation runs on deploy");
    assert!(store.link(&a, &b, EdgeType::Semantic, 1.5, None).is_err());
}

#[test]
fn forget_cascades_every_incident_edge() {
    let (store, _dir) = test_store();

    let a = remember(&store, "Ingest runs on HttpServer boxes");
    let b = remember(&store, "HttpServer boxes rotate weekly");

    let outcome = store.forget(&b).unwrap();
    assert!(outcome.edges_removed > 0);

    // no active edge may reference the forgotten insight
    assert!(store.edges_of(&b).unwrap().is_empty());
    assert!(store.related(&a, None, 2).unwrap().iter().all(|r| r.id != b));

    // and it disappears from every retrieval surface
    let hits = store.search("HttpServer", 10, None, None).unwrap();
    assert!(hits.iter().all(|h| h.id != b));
    assert!(store.forget(&b).is_err());
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[test]
fn boost_crosses_the_immunity_threshold_and_stacks() {
    let (store, _dir) = test_store();
    let id = remember_with(&store, "Low-priority scratch note about fonts", |input| {
        input.importance = 1;
    });

    let first = store.boost(&id).unwrap();
    assert_eq!(first.access_count, 3);

    let second = store.boost(&id).unwrap();
    assert_eq!(second.access_count, 6);

    // immune rows never show up for review
    let candidates = store.gc_review(f64::MAX, 100).unwrap();
    assert!(candidates.iter().all(|c| c.id != id));
}

#[test]
fn gc_review_lists_only_non_immune_low_ei_rows() {
    let (store, _dir) = test_store();

    let weak = remember_with(&store, "Tried the beta dashboard theme", |input| {
        input.importance = 1;
    });
    let strong = remember_with(&store, "Production database is PostgreSQL sixteen", |input| {
        input.importance = 5;
    });

    let candidates = store.gc_review(f64::MAX, 100).unwrap();
    assert!(candidates.iter().any(|c| c.id == weak));
    assert!(candidates.iter().all(|c| c.id != strong));
    // ascending EI
    for pair in candidates.windows(2) {
        assert!(pair[0].effective_importance <= pair[1].effective_importance);
    }
}

#[test]
fn active_set_is_capped_after_every_write() {
    let (store, _dir) = test_store();

    for i in 0..1001 {
        remember_with(&store, &format!("entry {i:04}"), |input| {
            input.importance = 2;
            input.no_diff = true;
        });
    }

    let status = store.status().unwrap();
    assert!(status.active_insights <= 1000);
    assert!(status.deleted_insights > 0);
}

// ============================================================================
// RECALL
// ============================================================================

#[test]
fn recall_ranks_keyword_matches_and_touches_access_counters() {
    let (store, _dir) = test_store();

    let id = remember(&store, "Vector search runs on Qdrant in production");
    remember(&store, "Office plants need watering on Fridays");

    let response = store
        .recall(RecallInput {
            query: "qdrant vector search".into(),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(response.meta.intent, Intent::General);
    assert!(!response.results.is_empty());
    assert_eq!(response.results[0].id, id);
    assert!(response.results[0].signals.keyword > 0.0);

    let touched = store.get(&id).unwrap().unwrap();
    assert_eq!(touched.access_count, 1);
    assert!(touched.last_accessed_at.is_some());
}

#[test]
fn recall_respects_category_and_source_filters() {
    let (store, _dir) = test_store();

    remember_with(&store, "Qdrant chosen for vector workloads", |input| {
        input.category = Category::Decision;
    });
    remember_with(&store, "Qdrant crashed during the load test", |input| {
        input.category = Category::Fact;
        input.source = Source::Agent;
    });

    let response = store
        .recall(RecallInput {
            query: "Qdrant".into(),
            category: Some(Category::Decision),
            ..Default::default()
        })
        .unwrap();
    assert!(response
        .results
        .iter()
        .all(|r| r.category == Category::Decision));

    let response = store
        .recall(RecallInput {
            query: "Qdrant".into(),
            source: Some(Source::Agent),
            ..Default::default()
        })
        .unwrap();
    assert!(response.results.iter().all(|r| r.source == Source::Agent));
}

#[test]
fn recall_with_stopword_query_falls_back_to_recency_and_entity() {
    let (store, _dir) = test_store();
    remember(&store, "Build cache warmed on HttpServer nodes");

    // no keyword tokens survive, no embedding: recency still anchors
    let response = store
        .recall(RecallInput {
            query: "the of and".into(),
            ..Default::default()
        })
        .unwrap();
    assert!(!response.results.is_empty());
}

#[test]
fn why_recall_orders_causes_before_effects() {
    let (store, dir) = test_store();

    let cause = remember(&store, "Disk filled up on the ingest node");
    let middle = remember(&store, "Ingest node started rejecting writes");
    let effect = remember(&store, "Dashboard alerts fired for ingest lag");
    remember(&store, "Unrelated note about office plants");

    // strip the auto-synthesized same-day links so the chain below is the
    // only structure, as if the insights were weeks apart
    let fixture = rusqlite::Connection::open(dir.path().join("mnemon.db")).unwrap();
    fixture.execute("DELETE FROM edges", []).unwrap();
    drop(fixture);

    store
        .link(&cause, &middle, EdgeType::Causal, 0.9, None)
        .unwrap();
    store
        .link(&middle, &effect, EdgeType::Causal, 0.9, None)
        .unwrap();

    let response = store
        .recall(RecallInput {
            query: "why did dashboard alerts fire for the ingest node".into(),
            limit: 3,
            ..Default::default()
        })
        .unwrap();

    assert_eq!(response.meta.intent, Intent::Why);
    let ids: Vec<&str> = response.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![cause.as_str(), middle.as_str(), effect.as_str()]);
    for result in &response.results {
        assert_eq!(result.intent, Intent::Why);
        assert!(result.signals.graph > 0.0);
    }
}

#[test]
fn intent_override_is_validated_at_the_boundary() {
    let (store, _dir) = test_store();
    remember(&store, "Anything at all");

    // the override type is closed; parse rejects unknown values before the
    // engine ever sees them
    assert!(Intent::parse("nonsense").is_none());

    let response = store
        .recall(RecallInput {
            query: "anything".into(),
            intent: Some(Intent::Entity),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(response.meta.intent, Intent::Entity);
}

#[test]
fn forgotten_insights_never_resurface() {
    let (store, _dir) = test_store();

    let id = remember(&store, "Secret staging credentials rotate on Mondays");
    remember(&store, "Deploy window opens at noon");
    store.forget(&id).unwrap();

    let response = store
        .recall(RecallInput {
            query: "staging credentials rotate".into(),
            ..Default::default()
        })
        .unwrap();
    assert!(response.results.iter().all(|r| r.id != id));

    let outcome = store
        .remember(RememberInput {
            content: "Staging credentials now rotate on Tuesdays".into(),
            ..Default::default()
        })
        .unwrap();
    assert!(outcome.semantic_candidates.iter().all(|c| c.id != id));
    assert!(outcome.causal_candidates.iter().all(|c| c.id != id));
}

// ============================================================================
// OP-LOG & STATUS
// ============================================================================

#[test]
fn operations_land_in_the_oplog_newest_first() {
    let (store, _dir) = test_store();

    let id = remember(&store, "Alpha rollout reached fifty percent");
    store
        .recall(RecallInput {
            query: "alpha rollout".into(),
            ..Default::default()
        })
        .unwrap();
    store.forget(&id).unwrap();

    let entries = store.oplog(10).unwrap();
    let operations: Vec<&str> = entries.iter().map(|e| e.operation.as_str()).collect();
    assert_eq!(operations[0], "forget");
    assert!(operations.contains(&"recall"));
    assert!(operations.contains(&"remember"));
}

#[test]
fn status_reports_counts_and_embedding_state() {
    let (store, _dir) = test_store();

    remember_with(&store, "Decision one about Kafka", |input| {
        input.category = Category::Decision;
    });
    let gone = remember(&store, "Temporary note");
    store.forget(&gone).unwrap();

    let status = store.status().unwrap();
    assert_eq!(status.active_insights, 1);
    assert_eq!(status.deleted_insights, 1);
    assert!(!status.ollama_available);
    assert_eq!(status.with_embedding, 0);
    assert!(status.oplog_entries > 0);
}
