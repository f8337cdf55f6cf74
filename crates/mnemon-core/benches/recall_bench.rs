//! Recall Hot-Path Benchmarks
//!
//! Criterion micro-benchmarks for the pure functions on the recall path.
//! Run with: cargo bench -p mnemon-core

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mnemon_core::recall::intent;
use mnemon_core::{cosine_similarity, extract_entities, reciprocal_rank_fusion};

fn bench_intent_detection(c: &mut Criterion) {
    let queries = [
        "why did the deploy fail last night",
        "when was the schema migration",
        "what is the retry budget",
        "postgres connection pooling notes",
        "为什么选择这个方案",
    ];

    c.bench_function("intent_detection", |b| {
        b.iter(|| {
            for query in &queries {
                black_box(intent::detect(query));
            }
        })
    });
}

fn bench_rrf_fusion(c: &mut Criterion) {
    let lists: Vec<Vec<String>> = (0..4)
        .map(|list| (0..20).map(|i| format!("insight-{}", list * 7 + i)).collect())
        .collect();

    c.bench_function("rrf_four_signals_20_each", |b| {
        b.iter(|| {
            black_box(reciprocal_rank_fusion(&lists, 60.0));
        })
    });
}

fn bench_cosine_768d(c: &mut Criterion) {
    let a: Vec<f64> = (0..768).map(|i| (i as f64).sin()).collect();
    let b_vec: Vec<f64> = (0..768).map(|i| (i as f64).cos()).collect();

    c.bench_function("cosine_768d", |b| {
        b.iter(|| {
            black_box(cosine_similarity(&a, &b_vec));
        })
    });
}

fn bench_entity_extraction(c: &mut Criterion) {
    let content = "Moved the HttpServer fleet to Kubernetes; see \
        https://internal/runbooks and ./deploy/values.yaml, ping @oncall \
        when the PostgreSQL failover completes";

    c.bench_function("entity_extraction", |b| {
        b.iter(|| {
            black_box(extract_entities(content, &[]));
        })
    });
}

criterion_group!(
    benches,
    bench_intent_detection,
    bench_rrf_fusion,
    bench_cosine_768d,
    bench_entity_extraction
);
criterion_main!(benches);
