//! Core type definitions shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique, stable identifier of a knowledge entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    /// Create a new random entry ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Which part of the system produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Answered from the knowledge store (exact or fuzzy).
    Store,
    /// Answered from an external search result.
    Search,
    /// Answered from a built-in template.
    Generated,
}

impl Source {
    /// Stable lowercase tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Search => "search",
            Self::Generated => "generated",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pipeline stage that terminated a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Normalized message equals a stored question.
    ExactMatch,
    /// Token overlap with a recent stored question.
    FuzzyMatch,
    /// External search produced a usable snippet.
    WebSearch,
    /// Template fallback.
    Generated,
}

impl Stage {
    /// The provenance tag reported for this stage.
    #[must_use]
    pub fn source(self) -> Source {
        match self {
            Self::ExactMatch | Self::FuzzyMatch => Source::Store,
            Self::WebSearch => Source::Search,
            Self::Generated => Source::Generated,
        }
    }

    /// Human-readable provenance label shown in responses.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::ExactMatch => "knowledge base",
            Self::FuzzyMatch => "knowledge base (similar question)",
            Self::WebSearch => "web search",
            Self::Generated => "generated",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ExactMatch => "exact_match",
            Self::FuzzyMatch => "fuzzy_match",
            Self::WebSearch => "web_search",
            Self::Generated => "generated",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Clamp a confidence value into `[0, 1]`. NaN becomes `0.0`.
#[must_use]
pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
