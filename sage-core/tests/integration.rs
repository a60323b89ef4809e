//! Integration Tests: End-to-End Resolution Flows
//!
//! Drive the resolver through every pipeline stage with in-process search
//! backends: canned hits, permanent failure and a call that never returns.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sage_core::config::SageConfig;
use sage_core::error::{Result, SageError};
use sage_core::intent::Intent;
use sage_core::knowledge::KnowledgeStore;
use sage_core::resolver::{Resolver, WEB_SEARCH_TAG};
use sage_core::search::{SearchBackend, SearchHit, SearchQuery};
use sage_core::types::{Source, Stage};

// ---------------------------------------------------------------------------
// Fake backends
// ---------------------------------------------------------------------------

/// Returns the same hits for every query and counts calls.
#[derive(Clone, Default)]
struct StaticSearch {
    hits: Vec<SearchHit>,
    calls: Arc<AtomicUsize>,
}

impl StaticSearch {
    fn with_hit(snippet: &str) -> Self {
        Self {
            hits: vec![SearchHit::new("Reference", snippet, "https://example.org/ref")],
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SearchBackend for StaticSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.iter().take(query.limit).cloned().collect())
    }
}

/// Always fails like a network outage.
struct Unavailable;

impl SearchBackend for Unavailable {
    async fn search(&self, _query: &SearchQuery) -> Result<Vec<SearchHit>> {
        Err(SageError::SearchUnavailable("connection refused".to_string()))
    }
}

/// Never completes.
struct Hanging;

impl SearchBackend for Hanging {
    async fn search(&self, _query: &SearchQuery) -> Result<Vec<SearchHit>> {
        std::future::pending().await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config() -> SageConfig {
    let mut config = SageConfig::default();
    config.knowledge.seed_on_empty = false;
    config
}

fn in_memory<S: SearchBackend>(config: &SageConfig, search: S) -> Resolver<S> {
    let store = KnowledgeStore::open_in_memory(&config.knowledge, &config.persistence)
        .expect("in-memory store");
    Resolver::new(config, store, search)
}

fn add(resolver: &Resolver<impl SearchBackend>, question: &str, answer: &str) {
    resolver
        .knowledge()
        .insert("test", question, answer, Intent::Explanation, BTreeSet::new(), 0.9)
        .expect("insert");
}

// ---------------------------------------------------------------------------
// Stage outcomes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn russian_greeting_is_generated_without_search_or_store_write() {
    let search = StaticSearch::with_hit("should never be used");
    let resolver = in_memory(&config(), search.clone());

    let resolution = resolver.resolve("привет").await.expect("resolve");

    assert_eq!(resolution.stage, Stage::Generated);
    assert_eq!(resolution.source, Source::Generated);
    assert!((resolution.confidence - 0.95).abs() < 1e-6);
    assert_eq!(resolution.intents, vec![Intent::Greeting]);
    assert_eq!(search.calls(), 0);
    assert!(resolver.knowledge().is_empty());

    // Fixed confidence: same again.
    let again = resolver.resolve("Привет!").await.expect("resolve");
    assert!((again.confidence - resolution.confidence).abs() < f32::EPSILON);
}

#[tokio::test]
async fn greeting_prefixed_question_still_searches() {
    let search = StaticSearch::with_hit("Use list.reverse() or slicing with [::-1].");
    let resolver = in_memory(&config(), search.clone());

    let resolution = resolver
        .resolve("hi, how do I reverse a list in python?")
        .await
        .expect("resolve");

    assert_eq!(resolution.intents[0], Intent::Greeting);
    assert_eq!(resolution.stage, Stage::WebSearch);
    assert_eq!(search.calls(), 1);
    assert!(resolution.response.contains("list.reverse()"));

    let learned = resolver
        .knowledge()
        .get(resolution.entry_id.expect("learned"))
        .expect("entry");
    assert_eq!(learned.intent, Intent::CodeRequest);
}

#[tokio::test]
async fn greeting_prefixed_question_falls_back_to_topic_template() {
    let resolver = in_memory(&config(), Unavailable);

    let resolution = resolver
        .resolve("hello, how do I reverse a list in python?")
        .await
        .expect("resolve");

    assert_eq!(resolution.stage, Stage::Generated);
    assert!((resolution.confidence - 0.4).abs() < 1e-6);
}

#[tokio::test]
async fn identical_question_is_exact_match_and_counts_usage() {
    let resolver = in_memory(&config(), Unavailable);
    add(&resolver, "What is a closure?", "A function with captured state.");

    let resolution = resolver
        .resolve("  what IS a   closure? ")
        .await
        .expect("resolve");

    assert_eq!(resolution.stage, Stage::ExactMatch);
    assert_eq!(resolution.source, Source::Store);
    assert!(resolution.response.starts_with("A function with captured state."));

    let entry = resolver
        .knowledge()
        .get(resolution.entry_id.expect("entry id"))
        .expect("entry");
    assert_eq!(entry.usage_count, 1);
    assert!(entry.last_used.is_some());
}

#[tokio::test]
async fn duplicate_questions_answer_with_most_recent() {
    let resolver = in_memory(&config(), Unavailable);
    add(&resolver, "what is a monad", "Old answer.");
    add(&resolver, "what is a monad", "New answer.");

    let resolution = resolver.resolve("what is a monad").await.expect("resolve");
    assert!(resolution.response.starts_with("New answer."));
    assert_eq!(resolver.knowledge().len(), 2);
}

#[tokio::test]
async fn single_shared_token_falls_through_fuzzy() {
    let search = StaticSearch::default();
    let resolver = in_memory(&config(), search.clone());
    add(&resolver, "borrow checker rules", "Shared xor mutable.");

    let resolution = resolver.resolve("checker failing badly").await.expect("resolve");

    assert_eq!(resolution.stage, Stage::Generated);
    assert_eq!(search.calls(), 1);
}

#[tokio::test]
async fn two_shared_tokens_are_a_fuzzy_match() {
    let resolver = in_memory(&config(), Unavailable);
    add(&resolver, "borrow checker rules", "Shared xor mutable.");

    let resolution = resolver.resolve("explain the borrow checker").await.expect("resolve");

    assert_eq!(resolution.stage, Stage::FuzzyMatch);
    assert_eq!(resolution.source, Source::Store);
    assert!(resolution.confidence < 0.9);
}

#[tokio::test]
async fn search_result_is_returned_and_learned() {
    let search = StaticSearch::with_hit("Use the toml crate with serde derive.");
    let resolver = in_memory(&config(), search.clone());

    let first = resolver
        .resolve("how to parse toml config in rust")
        .await
        .expect("resolve");

    assert_eq!(first.stage, Stage::WebSearch);
    assert_eq!(first.source, Source::Search);
    assert!((first.confidence - 0.7).abs() < 1e-6);
    assert!(first.response.contains("Use the toml crate with serde derive."));
    assert!(first.response.contains("[source: web search"));

    let learned = resolver
        .knowledge()
        .get(first.entry_id.expect("learned id"))
        .expect("entry");
    assert!(learned.has_tag(WEB_SEARCH_TAG));
    assert!(learned.has_tag("rust"));
    assert_eq!(learned.category, "rust");
    assert!((learned.confidence - 0.7).abs() < 1e-6);
    assert_eq!(learned.question, "how to parse toml config in rust");

    // Asking again is served from the store.
    let second = resolver
        .resolve("How to parse TOML config in Rust")
        .await
        .expect("resolve");
    assert_eq!(second.stage, Stage::ExactMatch);
    assert_eq!(search.calls(), 1);
    assert_eq!(resolver.counters().entries_learned, 1);
}

#[tokio::test]
async fn search_unavailable_falls_back_without_store_write() {
    let resolver = in_memory(&config(), Unavailable);

    let resolution = resolver
        .resolve("how to implement a b-tree")
        .await
        .expect("resolve");

    assert_eq!(resolution.stage, Stage::Generated);
    assert_eq!(resolution.source, Source::Generated);
    assert!(resolver.knowledge().is_empty());
    assert_eq!(resolver.counters().search_misses, 1);
}

#[tokio::test]
async fn empty_search_results_fall_back() {
    let search = StaticSearch {
        hits: vec![SearchHit::new("Blank", "   ", "https://example.org")],
        calls: Arc::default(),
    };
    let resolver = in_memory(&config(), search);

    let resolution = resolver.resolve("what is a skip list").await.expect("resolve");
    assert_eq!(resolution.stage, Stage::Generated);
    assert!(resolver.knowledge().is_empty());
}

#[tokio::test(start_paused = true)]
async fn hanging_search_times_out() {
    let mut config = config();
    config.resolver.search_timeout_ms = 250;
    let resolver = in_memory(&config, Hanging);

    let started = tokio::time::Instant::now();
    let resolution = resolver.resolve("what is a trie").await.expect("resolve");

    assert_eq!(resolution.stage, Stage::Generated);
    assert!(started.elapsed() >= Duration::from_millis(250));
    assert_eq!(resolver.counters().search_misses, 1);
    assert!(resolver.knowledge().is_empty());
}

#[tokio::test]
async fn every_response_carries_a_provenance_footer() {
    let resolver = in_memory(&config(), StaticSearch::with_hit("A snippet."));
    add(&resolver, "what is a tuple", "An ordered group.");

    for message in ["what is a tuple", "hello", "what is a heap"] {
        let resolution = resolver.resolve(message).await.expect("resolve");
        assert!(
            resolution.response.contains(&format!("[source: {}", resolution.stage.label())),
            "{message}: {}",
            resolution.response
        );
    }
}

#[tokio::test]
async fn invalid_requests_are_rejected_and_not_recorded() {
    let resolver = in_memory(&config(), Unavailable);

    for bad in ["", "   \n", "\u{0}\u{1}"] {
        let err = resolver.resolve(bad).await.expect_err("invalid");
        assert!(matches!(err, SageError::InvalidRequest { .. }));
    }
    let err = resolver.resolve_bytes(b"\xff\xfe").await.expect_err("invalid");
    assert!(matches!(err, SageError::InvalidRequest { .. }));

    assert_eq!(resolver.history_len(), 0);
    assert_eq!(resolver.counters().requests_rejected, 4);
}

// ---------------------------------------------------------------------------
// Session history
// ---------------------------------------------------------------------------

#[tokio::test]
async fn history_stays_within_cap() {
    let resolver = in_memory(&config(), Unavailable);

    for i in 1..=60 {
        resolver.resolve(&format!("hello {i}")).await.expect("resolve");
        assert!(resolver.history_len() <= 50);
    }

    assert_eq!(resolver.history_len(), 30);
    let history = resolver.history(100);
    assert_eq!(history[0].message, "hello 31");
    assert_eq!(history[29].message, "hello 60");
    assert!(history.iter().all(|r| r.source == Source::Generated));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_each_learn_one_entry() {
    let resolver = Arc::new(in_memory(&config(), StaticSearch::with_hit("Found it.")));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let resolver = Arc::clone(&resolver);
            tokio::spawn(async move {
                resolver
                    .resolve(&format!("what is topic number {i}"))
                    .await
                    .expect("resolve")
            })
        })
        .collect();

    for task in tasks {
        let resolution = task.await.expect("join");
        assert_eq!(resolution.stage, Stage::WebSearch);
    }

    assert_eq!(resolver.knowledge().len(), 16);
    let questions: BTreeSet<String> = resolver
        .knowledge()
        .entries()
        .into_iter()
        .map(|e| e.question)
        .collect();
    assert_eq!(questions.len(), 16);
}

// ---------------------------------------------------------------------------
// Restart behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn learned_knowledge_and_history_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config();
    config.knowledge.db_path = dir.path().join("sage.db").to_string_lossy().into_owned();

    {
        let resolver = Resolver::open(&config, StaticSearch::with_hit("Use a HashMap.")).expect("open");
        resolver.resolve("how to count words in rust").await.expect("resolve");
        resolver.resolve("hello").await.expect("resolve");
        resolver.flush().expect("flush");
    }

    let resolver = Resolver::open(&config, Unavailable).expect("reopen");
    assert_eq!(resolver.knowledge().len(), 1);
    assert_eq!(resolver.history_len(), 2);

    let resolution = resolver.resolve("how to count words in rust").await.expect("resolve");
    assert_eq!(resolution.stage, Stage::ExactMatch);
    assert!(resolution.response.contains("Use a HashMap."));
}

#[tokio::test]
async fn corrupt_database_degrades_to_empty_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("sage.db");
    std::fs::write(&db, "this is not sqlite ".repeat(400)).expect("write garbage");

    let mut config = config();
    config.knowledge.db_path = db.to_string_lossy().into_owned();

    let resolver = Resolver::open(&config, StaticSearch::with_hit("Still works.")).expect("open");
    assert!(resolver.knowledge().is_empty());

    let resolution = resolver.resolve("what is a vtable").await.expect("resolve");
    assert_eq!(resolution.stage, Stage::WebSearch);
    assert_eq!(resolver.knowledge().len(), 1);
}

#[tokio::test]
async fn export_does_not_mutate_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let resolver = in_memory(&config(), Unavailable);
    add(&resolver, "what is a slice", "A view into a sequence.");
    let before = resolver.knowledge().entries();

    let export = resolver
        .knowledge()
        .export(&dir.path().join("dump.json"))
        .expect("export");

    assert_eq!(export.entries, before);
    assert_eq!(resolver.knowledge().entries(), before);
}
