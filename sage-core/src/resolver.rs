//! Response resolver: the answer pipeline.
//!
//! ```text
//! validate ─▶ classify/extract ─▶ exact ─▶ fuzzy ─▶ web search ─▶ generated
//! ```
//!
//! Stages run in order and the first one that produces an answer wins.
//! Store misses, search failures, timeouts and persist failures are logged,
//! counted and turned into a transition to the next stage. The only error a
//! caller ever sees is [`SageError::InvalidRequest`].

use std::collections::BTreeSet;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ResolverConfig, SageConfig};
use crate::entities::{self, primary_category};
use crate::error::Result;
use crate::generation;
use crate::intent::{self, Intent};
use crate::knowledge::{KnowledgeEntry, KnowledgeStore};
use crate::metrics::{CounterSnapshot, ResolverCounters};
use crate::search::{SearchBackend, SearchHit, SearchQuery};
use crate::session::{InteractionRecord, SessionTracker};
use crate::types::{clamp_confidence, EntryId, Source, Stage};
use crate::validation::{decode_message, validate_message};

/// Tag put on every entry learned from search.
pub const WEB_SEARCH_TAG: &str = "web_search";

/// The outcome of one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    /// Answer text, ending with the provenance footer.
    pub response: String,
    /// Which part of the system answered.
    pub source: Source,
    /// Reported confidence, in `[0, 1]`.
    pub confidence: f32,
    /// The pipeline stage that produced the answer.
    pub stage: Stage,
    /// Classified intents, most likely first.
    pub intents: Vec<Intent>,
    /// Recognised technology names.
    pub entities: Vec<String>,
    /// Store entry that answered (exact/fuzzy) or was learned (search).
    pub entry_id: Option<EntryId>,
}

/// A stage's answer before the footer is attached.
struct Answer {
    stage: Stage,
    text: String,
    confidence: f32,
    entry_id: Option<EntryId>,
}

/// Orchestrates the knowledge store, the search backend and the session
/// history for every request.
///
/// Share it behind an `Arc` to serve concurrent requests; all methods take
/// `&self`.
pub struct Resolver<S> {
    store: KnowledgeStore,
    search: S,
    session: Mutex<SessionTracker>,
    counters: ResolverCounters,
    config: ResolverConfig,
}

impl<S: SearchBackend> Resolver<S> {
    /// Build a resolver over an opened store. Session history persisted in
    /// the store is restored.
    #[must_use]
    pub fn new(config: &SageConfig, store: KnowledgeStore, search: S) -> Self {
        let history = store.load_history();
        let session = SessionTracker::restore(&config.session, history);
        info!(
            entries = store.len(),
            history = session.len(),
            "Resolver initialised"
        );
        Self {
            store,
            search,
            session: Mutex::new(session),
            counters: ResolverCounters::new(),
            config: config.resolver.clone(),
        }
    }

    /// Open the store named in `config` and build a resolver over it.
    ///
    /// # Errors
    ///
    /// Returns an error if no database can be created at
    /// `config.knowledge.db_path`, or if it is held locked by another
    /// process.
    pub fn open(config: &SageConfig, search: S) -> Result<Self> {
        let store = KnowledgeStore::open(&config.knowledge, &config.persistence)?;
        Ok(Self::new(config, store, search))
    }

    /// Answer one text message.
    ///
    /// # Errors
    ///
    /// Returns [`SageError::InvalidRequest`](crate::SageError::InvalidRequest)
    /// for empty, control-only or oversized messages. Nothing is classified,
    /// stored or recorded in that case.
    pub async fn resolve(&self, message: &str) -> Result<Resolution> {
        if let Err(e) = validate_message(message, self.config.max_message_chars) {
            ResolverCounters::bump(&self.counters.requests_rejected);
            debug!(error = %e, "Request rejected");
            return Err(e);
        }
        ResolverCounters::bump(&self.counters.requests_processed);
        let started = Instant::now();

        let intents = intent::classify(message);
        let entities = entities::extract(message);
        let topic = Intent::topical(&intents);

        let answer = match self.exact_match(message).or_else(|| self.fuzzy_match(message)) {
            Some(answer) => answer,
            None if Intent::only_conversational(&intents) => generated(topic, &entities, message),
            None => match self.web_search(message, topic, &entities).await {
                Some(answer) => answer,
                None => generated(topic, &entities, message),
            },
        };

        let response = with_footer(&answer.text, answer.stage, answer.confidence);
        let source = answer.stage.source();

        self.session
            .lock()
            .record(message, response.clone(), source, answer.confidence);
        self.counters.record_stage(answer.stage);

        debug!(
            stage = %answer.stage,
            intent = %topic,
            confidence = answer.confidence,
            elapsed_us = started.elapsed().as_micros(),
            "Request resolved"
        );

        Ok(Resolution {
            response,
            source,
            confidence: answer.confidence,
            stage: answer.stage,
            intents,
            entities: entities.iter().map(|e| (*e).to_string()).collect(),
            entry_id: answer.entry_id,
        })
    }

    /// Answer a raw payload that should hold UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`SageError::InvalidRequest`](crate::SageError::InvalidRequest)
    /// for non-UTF-8 bytes, plus everything [`Resolver::resolve`] rejects.
    pub async fn resolve_bytes(&self, bytes: &[u8]) -> Result<Resolution> {
        match decode_message(bytes) {
            Ok(message) => self.resolve(message).await,
            Err(e) => {
                ResolverCounters::bump(&self.counters.requests_rejected);
                debug!(error = %e, "Request rejected");
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Stages
    // ------------------------------------------------------------------

    fn exact_match(&self, message: &str) -> Option<Answer> {
        let entry = self.store.lookup_exact(message)?;
        if entry.confidence < self.config.min_acceptance {
            debug!(entry = %entry.id, confidence = entry.confidence, "Exact hit below acceptance");
            return None;
        }
        self.touch(&entry);
        Some(Answer {
            stage: Stage::ExactMatch,
            text: entry.answer,
            confidence: entry.confidence,
            entry_id: Some(entry.id),
        })
    }

    fn fuzzy_match(&self, message: &str) -> Option<Answer> {
        let entry = self.store.lookup_fuzzy(message, self.config.min_acceptance)?;
        self.touch(&entry);
        Some(Answer {
            stage: Stage::FuzzyMatch,
            text: entry.answer,
            confidence: clamp_confidence(entry.confidence * self.config.fuzzy_confidence_factor),
            entry_id: Some(entry.id),
        })
    }

    async fn web_search(&self, message: &str, intent: Intent, entities: &[&str]) -> Option<Answer> {
        ResolverCounters::bump(&self.counters.search_attempts);

        let timeout = self.config.search_timeout();
        let query = SearchQuery {
            text: message.trim().to_string(),
            limit: self.config.search_max_results,
            timeout,
        };

        let hits = match tokio::time::timeout(timeout, self.search.search(&query)).await {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                warn!(error = %e, "Search unavailable, falling back");
                ResolverCounters::bump(&self.counters.search_misses);
                return None;
            }
            Err(_) => {
                warn!(timeout_ms = self.config.search_timeout_ms, "Search timed out, falling back");
                ResolverCounters::bump(&self.counters.search_misses);
                return None;
            }
        };

        let Some(hit) = hits.into_iter().find(|h| !h.snippet.trim().is_empty()) else {
            debug!("Search returned no usable results");
            ResolverCounters::bump(&self.counters.search_misses);
            return None;
        };

        let text = synthesize(&hit);
        let confidence = clamp_confidence(self.config.search_confidence);
        let entry_id = if confidence >= self.config.learn_threshold {
            self.learn(message, &text, intent, entities, confidence)
        } else {
            None
        };

        Some(Answer {
            stage: Stage::WebSearch,
            text,
            confidence,
            entry_id,
        })
    }

    /// Write a search answer back into the store.
    fn learn(
        &self,
        message: &str,
        answer: &str,
        intent: Intent,
        entities: &[&str],
        confidence: f32,
    ) -> Option<EntryId> {
        let mut tags: BTreeSet<String> = entities.iter().map(|e| e.to_lowercase()).collect();
        tags.insert(WEB_SEARCH_TAG.to_string());

        match self.store.insert(
            &primary_category(entities),
            message,
            answer,
            intent,
            tags,
            confidence,
        ) {
            Ok(id) => {
                ResolverCounters::bump(&self.counters.entries_learned);
                Some(id)
            }
            Err(e) => {
                warn!(error = %e, "Failed to store search answer");
                ResolverCounters::bump(&self.counters.persist_failures);
                None
            }
        }
    }

    fn touch(&self, entry: &KnowledgeEntry) {
        if let Err(e) = self.store.record_usage(entry.id) {
            warn!(entry = %entry.id, error = %e, "Failed to record entry usage");
            ResolverCounters::bump(&self.counters.persist_failures);
        }
    }

    // ------------------------------------------------------------------
    // Reporting & lifecycle
    // ------------------------------------------------------------------

    /// The knowledge store.
    #[must_use]
    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.store
    }

    /// Counter values plus the live store size.
    #[must_use]
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot(self.store.len())
    }

    /// The newest `n` interactions, oldest first.
    #[must_use]
    pub fn history(&self, n: usize) -> Vec<InteractionRecord> {
        self.session.lock().recent(n)
    }

    /// Number of interactions currently retained.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.session.lock().len()
    }

    /// Persist the knowledge store and the session history.
    ///
    /// # Errors
    ///
    /// Returns the persistence error; the in-memory state is unaffected.
    pub fn flush(&self) -> Result<()> {
        self.store.persist()?;
        let records = self.session.lock().records().to_vec();
        self.store.save_history(&records)?;
        info!(
            entries = self.store.len(),
            history = records.len(),
            "Resolver state flushed"
        );
        Ok(())
    }
}

fn generated(intent: Intent, entities: &[&str], message: &str) -> Answer {
    let reply = generation::generate(intent, entities, message);
    Answer {
        stage: Stage::Generated,
        text: reply.text,
        confidence: reply.confidence,
        entry_id: None,
    }
}

/// Answer text built from the top search hit.
fn synthesize(hit: &SearchHit) -> String {
    let snippet = hit.snippet.trim();
    match (hit.title.trim(), hit.url.trim()) {
        ("", "") => snippet.to_string(),
        (title, "") => format!("{snippet}\n\nSee: {title}"),
        ("", url) => format!("{snippet}\n\nSee: {url}"),
        (title, url) => format!("{snippet}\n\nSee: {title} ({url})"),
    }
}

/// Append the provenance marker.
fn with_footer(text: &str, stage: Stage, confidence: f32) -> String {
    format!(
        "{}\n\n[source: {} | confidence {confidence:.2}]",
        text.trim_end(),
        stage.label()
    )
}
