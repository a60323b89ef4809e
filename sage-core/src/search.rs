//! Boundary to the external search provider.
//!
//! The resolver only sees [`SearchBackend`]. The HTTP implementation lives
//! in the `sage-search` crate; tests inject in-process fakes.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SageError};

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result title.
    pub title: String,
    /// Short text excerpt.
    pub snippet: String,
    /// Link to the full result.
    pub url: String,
}

impl SearchHit {
    /// Build a hit from its three parts.
    #[must_use]
    pub fn new(title: impl Into<String>, snippet: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            url: url.into(),
        }
    }
}

/// A search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Query text, usually the raw user message.
    pub text: String,
    /// Maximum number of hits wanted.
    pub limit: usize,
    /// How long the caller will wait. The resolver enforces this itself;
    /// backends may use it to size their own request timeouts.
    pub timeout: Duration,
}

/// A search provider.
///
/// Returns hits best-first, possibly none. Any failure (network, rate
/// limit, bad payload) is reported as [`SageError::SearchUnavailable`].
pub trait SearchBackend: Send + Sync {
    /// Run one query.
    fn search(&self, query: &SearchQuery) -> impl Future<Output = Result<Vec<SearchHit>>> + Send;
}

/// Backend used when search is switched off; always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSearch;

impl SearchBackend for DisabledSearch {
    async fn search(&self, _query: &SearchQuery) -> Result<Vec<SearchHit>> {
        Err(SageError::SearchUnavailable("search is disabled".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_search_is_unavailable() {
        let query = SearchQuery {
            text: "anything".to_string(),
            limit: 3,
            timeout: Duration::from_secs(1),
        };
        let err = DisabledSearch.search(&query).await.expect_err("disabled");
        assert!(matches!(err, SageError::SearchUnavailable(_)));
    }
}
