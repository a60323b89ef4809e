//! Session history: bounded log of recent interactions.
//!
//! The log uses a hysteresis trim: it grows until it holds `cap` records,
//! and the next append first cuts it back to the newest `floor` records.
//! Appends between trims are O(1) and the log never exceeds `cap`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SessionConfig;
use crate::types::{clamp_confidence, Source};

/// One resolved request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// The inbound message as received.
    pub message: String,
    /// The response text returned to the caller.
    pub response: String,
    /// Which part of the system answered.
    pub source: Source,
    /// Reported confidence, in `[0, 1]`.
    pub confidence: f32,
    /// When the request was resolved.
    pub timestamp: DateTime<Utc>,
}

impl InteractionRecord {
    /// Record stamped with the current time.
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        response: impl Into<String>,
        source: Source,
        confidence: f32,
    ) -> Self {
        Self {
            message: message.into(),
            response: response.into(),
            source,
            confidence: clamp_confidence(confidence),
            timestamp: Utc::now(),
        }
    }
}

/// Owner of the interaction history.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    records: Vec<InteractionRecord>,
    cap: usize,
    floor: usize,
    total_recorded: u64,
    trims: u64,
}

impl SessionTracker {
    /// Empty tracker with the given bounds.
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        let cap = config.history_cap.max(1);
        Self {
            records: Vec::with_capacity(cap),
            cap,
            floor: config.history_floor.min(cap - 1),
            total_recorded: 0,
            trims: 0,
        }
    }

    /// Tracker seeded with previously persisted records (newest kept if
    /// there are more than `cap`).
    #[must_use]
    pub fn restore(config: &SessionConfig, mut records: Vec<InteractionRecord>) -> Self {
        let mut tracker = Self::new(config);
        if records.len() > tracker.cap {
            records.drain(..records.len() - tracker.cap);
        }
        tracker.records = records;
        tracker
    }

    /// Append a record, trimming first if the log is full.
    pub fn record(
        &mut self,
        message: impl Into<String>,
        response: impl Into<String>,
        source: Source,
        confidence: f32,
    ) {
        self.push(InteractionRecord::new(message, response, source, confidence));
    }

    /// Append an already-built record, trimming first if the log is full.
    pub fn push(&mut self, record: InteractionRecord) {
        if self.records.len() >= self.cap {
            let drop = self.records.len() - self.floor;
            self.records.drain(..drop);
            self.trims += 1;
            debug!(kept = self.floor, dropped = drop, "Trimmed session history");
        }
        self.records.push(record);
        self.total_recorded += 1;
    }

    /// All retained records, oldest first.
    #[must_use]
    pub fn records(&self) -> &[InteractionRecord] {
        &self.records
    }

    /// The newest `n` records, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<InteractionRecord> {
        let start = self.records.len().saturating_sub(n);
        self.records[start..].to_vec()
    }

    /// The newest record, if any.
    #[must_use]
    pub fn last(&self) -> Option<&InteractionRecord> {
        self.records.last()
    }

    /// Number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records appended since construction (including trimmed ones).
    #[must_use]
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }

    /// How many times the log was cut back to the floor.
    #[must_use]
    pub fn trims(&self) -> u64 {
        self.trims
    }
}
