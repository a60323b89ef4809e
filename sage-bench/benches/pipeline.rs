//! SAGE Benchmark Suite
//!
//! Targets:
//!   intent_classify_sentence ........ < 5μs
//!   fuzzy_lookup_miss_1000_entries .. < 500μs (window 100)
//!   resolve_exact_hit ............... < 1ms (in-memory store, includes persist)

use std::collections::BTreeSet;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sage_core::config::SageConfig;
use sage_core::entities;
use sage_core::intent::{self, Intent};
use sage_core::knowledge::{KnowledgeBase, KnowledgeEntry, KnowledgeStore};
use sage_core::resolver::Resolver;
use sage_core::search::DisabledSearch;

fn make_entry(i: u32) -> KnowledgeEntry {
    KnowledgeEntry::new(
        "general",
        &format!("question number {i} about topic {}", i % 37),
        format!("Answer {i}."),
        Intent::Explanation,
        BTreeSet::new(),
        0.9,
    )
}

/// Benchmark: classify + extract a typical question.
fn bench_classify(c: &mut Criterion) {
    c.bench_function("intent_classify_sentence", |b| {
        b.iter(|| {
            let message = black_box("What is the difference between Rust and C++ for systems code?");
            black_box(intent::classify(message));
            black_box(entities::extract(message));
        });
    });
}

/// Benchmark: fuzzy lookup that misses, so the whole window is scanned.
fn bench_fuzzy(c: &mut Criterion) {
    let base = KnowledgeBase::from_entries((0..1000).map(make_entry).collect());

    c.bench_function("fuzzy_lookup_miss_1000_entries", |b| {
        b.iter(|| {
            let hit = base.lookup_fuzzy(black_box("completely unrelated words here"), 2, 100, 0.5);
            black_box(hit);
        });
    });
}

/// Benchmark: end-to-end resolve answered by exact match.
fn bench_resolve_exact(c: &mut Criterion) {
    let mut config = SageConfig::default();
    config.knowledge.seed_on_empty = false;
    let store = KnowledgeStore::open_in_memory(&config.knowledge, &config.persistence)
        .expect("in-memory store");
    for i in 0..200 {
        let entry = make_entry(i);
        store
            .insert(&entry.category, &entry.question, &entry.answer, entry.intent, entry.tags, entry.confidence)
            .expect("insert");
    }
    let resolver = Resolver::new(&config, store, DisabledSearch);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    c.bench_function("resolve_exact_hit", |b| {
        b.iter(|| {
            let resolution = runtime
                .block_on(resolver.resolve(black_box("question number 150 about topic 2")))
                .expect("resolve");
            black_box(resolution);
        });
    });
}

criterion_group!(benches, bench_classify, bench_fuzzy, bench_resolve_exact);
criterion_main!(benches);
