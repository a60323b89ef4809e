//! Runtime counters for the resolver.
//!
//! Lock-free `AtomicU64` counters bumped on the request path and read on
//! export. A [`CounterSnapshot`] also carries the live knowledge-store size
//! and renders as Prometheus text.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::types::Stage;

/// Atomic counters for pipeline events.
#[derive(Debug)]
pub struct ResolverCounters {
    /// Requests that entered the pipeline.
    pub requests_processed: AtomicU64,
    /// Requests rejected at the boundary.
    pub requests_rejected: AtomicU64,
    /// Requests answered by exact match.
    pub exact_hits: AtomicU64,
    /// Requests answered by fuzzy match.
    pub fuzzy_hits: AtomicU64,
    /// Search stage attempts.
    pub search_attempts: AtomicU64,
    /// Requests answered from search.
    pub search_hits: AtomicU64,
    /// Search failures, empty results and timeouts.
    pub search_misses: AtomicU64,
    /// Requests answered from templates.
    pub generated_fallbacks: AtomicU64,
    /// Entries written back from search.
    pub entries_learned: AtomicU64,
    /// Store writes that failed to persist.
    pub persist_failures: AtomicU64,
}

impl ResolverCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            requests_processed: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            exact_hits: AtomicU64::new(0),
            fuzzy_hits: AtomicU64::new(0),
            search_attempts: AtomicU64::new(0),
            search_hits: AtomicU64::new(0),
            search_misses: AtomicU64::new(0),
            generated_fallbacks: AtomicU64::new(0),
            entries_learned: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
        }
    }

    /// Increment a counter by one.
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count the terminal stage of a request.
    pub fn record_stage(&self, stage: Stage) {
        let counter = match stage {
            Stage::ExactMatch => &self.exact_hits,
            Stage::FuzzyMatch => &self.fuzzy_hits,
            Stage::WebSearch => &self.search_hits,
            Stage::Generated => &self.generated_fallbacks,
        };
        Self::bump(counter);
    }

    /// Snapshot all counters for export, with the current store size.
    #[must_use]
    pub fn snapshot(&self, knowledge_entries: usize) -> CounterSnapshot {
        CounterSnapshot {
            requests_processed: self.requests_processed.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            exact_hits: self.exact_hits.load(Ordering::Relaxed),
            fuzzy_hits: self.fuzzy_hits.load(Ordering::Relaxed),
            search_attempts: self.search_attempts.load(Ordering::Relaxed),
            search_hits: self.search_hits.load(Ordering::Relaxed),
            search_misses: self.search_misses.load(Ordering::Relaxed),
            generated_fallbacks: self.generated_fallbacks.load(Ordering::Relaxed),
            entries_learned: self.entries_learned.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            knowledge_entries,
        }
    }
}

impl Default for ResolverCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    /// Requests that entered the pipeline.
    pub requests_processed: u64,
    /// Requests rejected at the boundary.
    pub requests_rejected: u64,
    /// Exact-match answers.
    pub exact_hits: u64,
    /// Fuzzy-match answers.
    pub fuzzy_hits: u64,
    /// Search stage attempts.
    pub search_attempts: u64,
    /// Search answers.
    pub search_hits: u64,
    /// Search failures, empty results and timeouts.
    pub search_misses: u64,
    /// Template answers.
    pub generated_fallbacks: u64,
    /// Entries written back from search.
    pub entries_learned: u64,
    /// Failed store writes.
    pub persist_failures: u64,
    /// Knowledge-store size at snapshot time.
    pub knowledge_entries: usize,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP sage_requests_total Requests that entered the pipeline\n\
             # TYPE sage_requests_total counter\n\
             sage_requests_total {}\n\
             # HELP sage_requests_rejected_total Requests rejected as invalid\n\
             # TYPE sage_requests_rejected_total counter\n\
             sage_requests_rejected_total {}\n\
             # HELP sage_answers_total Answers by pipeline stage\n\
             # TYPE sage_answers_total counter\n\
             sage_answers_total{{stage=\"exact_match\"}} {}\n\
             sage_answers_total{{stage=\"fuzzy_match\"}} {}\n\
             sage_answers_total{{stage=\"web_search\"}} {}\n\
             sage_answers_total{{stage=\"generated\"}} {}\n\
             # HELP sage_search_attempts_total Search fallback attempts\n\
             # TYPE sage_search_attempts_total counter\n\
             sage_search_attempts_total {}\n\
             # HELP sage_search_misses_total Search failures, empty results and timeouts\n\
             # TYPE sage_search_misses_total counter\n\
             sage_search_misses_total {}\n\
             # HELP sage_entries_learned_total Entries written back from search\n\
             # TYPE sage_entries_learned_total counter\n\
             sage_entries_learned_total {}\n\
             # HELP sage_persist_failures_total Store writes that failed to persist\n\
             # TYPE sage_persist_failures_total counter\n\
             sage_persist_failures_total {}\n\
             # HELP sage_knowledge_entries Entries in the knowledge store\n\
             # TYPE sage_knowledge_entries gauge\n\
             sage_knowledge_entries {}\n",
            self.requests_processed,
            self.requests_rejected,
            self.exact_hits,
            self.fuzzy_hits,
            self.search_hits,
            self.generated_fallbacks,
            self.search_attempts,
            self.search_misses,
            self.entries_learned,
            self.persist_failures,
            self.knowledge_entries,
        )
    }
}
