//! Knowledge entries and the in-memory knowledge base.
//!
//! [`KnowledgeBase`] is a plain, append-only `Vec` of entries with the lookup
//! operations. [`KnowledgeStore`] wraps it with locking and SQLite
//! persistence; it is the only thing outside tests that mutates a base.

pub mod seed;
pub mod store;

pub use store::KnowledgeStore;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::intent::Intent;
use crate::text::{common_tokens, normalize_question, tokenize};
use crate::types::{clamp_confidence, EntryId};

/// A persisted question/answer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Unique, stable identifier.
    pub id: EntryId,
    /// Topic bucket (usually the main technology, e.g. `python`).
    pub category: String,
    /// Normalized question text (see [`normalize_question`]).
    pub question: String,
    /// Answer text; may embed fenced code blocks.
    pub answer: String,
    /// Intent of the question that produced this entry.
    pub intent: Intent,
    /// Free-form tags (`web_search`, `seed`, technology names).
    pub tags: BTreeSet<String>,
    /// Trust in the answer, in `[0, 1]`.
    pub confidence: f32,
    /// When the entry was appended.
    pub created_at: DateTime<Utc>,
    /// How many times the entry answered a request.
    pub usage_count: u64,
    /// When the entry last answered a request.
    pub last_used: Option<DateTime<Utc>>,
}

impl KnowledgeEntry {
    /// Build a fresh entry. The question is normalized and the confidence
    /// clamped.
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        question: &str,
        answer: impl Into<String>,
        intent: Intent,
        tags: BTreeSet<String>,
        confidence: f32,
    ) -> Self {
        Self {
            id: EntryId::new(),
            category: category.into(),
            question: normalize_question(question),
            answer: answer.into(),
            intent,
            tags,
            confidence: clamp_confidence(confidence),
            created_at: Utc::now(),
            usage_count: 0,
            last_used: None,
        }
    }

    /// Whether the entry carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Most recent of `created_at` and `last_used`.
    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_used.map_or(self.created_at, |used| used.max(self.created_at))
    }
}

/// Summary returned by [`KnowledgeBase::stats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeStats {
    /// Number of entries.
    pub entry_count: usize,
    /// Distinct categories, sorted.
    pub categories: Vec<String>,
    /// Latest creation or usage time across all entries.
    pub last_interaction: Option<DateTime<Utc>>,
}

/// Append-only, ordered collection of entries (oldest first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeBase {
    /// Create an empty base.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap entries loaded from storage, keeping their order.
    #[must_use]
    pub fn from_entries(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the base holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry by id.
    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&KnowledgeEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Normalized-string equality. The most recently inserted match wins.
    #[must_use]
    pub fn lookup_exact(&self, question: &str) -> Option<&KnowledgeEntry> {
        let key = normalize_question(question);
        if key.is_empty() {
            return None;
        }
        self.entries.iter().rev().find(|e| e.question == key)
    }

    /// Token-overlap lookup over the newest `window` entries, newest first.
    ///
    /// Returns the first entry sharing at least `min_common_tokens` tokens
    /// with `question` and whose confidence is at least `min_confidence`.
    #[must_use]
    pub fn lookup_fuzzy(
        &self,
        question: &str,
        min_common_tokens: usize,
        window: usize,
        min_confidence: f32,
    ) -> Option<&KnowledgeEntry> {
        let query = tokenize(&normalize_question(question));
        if query.len() < min_common_tokens.max(1) {
            return None;
        }
        self.entries
            .iter()
            .rev()
            .take(window)
            .filter(|e| e.confidence >= min_confidence)
            .find(|e| common_tokens(&query, &tokenize(&e.question)) >= min_common_tokens)
    }

    /// Append an entry and return its id.
    pub fn push(&mut self, entry: KnowledgeEntry) -> EntryId {
        let id = entry.id;
        self.entries.push(entry);
        id
    }

    /// Bump `usage_count` and stamp `last_used`. Returns the updated entry.
    pub fn touch(&mut self, id: EntryId, now: DateTime<Utc>) -> Option<&KnowledgeEntry> {
        let entry = self.entries.iter_mut().find(|e| e.id == id)?;
        entry.usage_count = entry.usage_count.saturating_add(1);
        entry.last_used = Some(now);
        Some(entry)
    }

    /// Entry count, sorted category list and last activity.
    #[must_use]
    pub fn stats(&self) -> KnowledgeStats {
        let categories: BTreeSet<&str> =
            self.entries.iter().map(|e| e.category.as_str()).collect();
        KnowledgeStats {
            entry_count: self.entries.len(),
            categories: categories.into_iter().map(str::to_string).collect(),
            last_interaction: self.entries.iter().map(KnowledgeEntry::last_activity).max(),
        }
    }
}
