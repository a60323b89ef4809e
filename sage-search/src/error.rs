//! Search error types.

use sage_core::SageError;
use thiserror::Error;

/// Errors that can occur while querying a search provider.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP request failed.
    #[error("search request failed: {0}")]
    RequestFailed(String),

    /// Provider response was not the expected JSON.
    #[error("failed to parse search response: {0}")]
    ParseError(String),

    /// Request timed out.
    #[error("search request timed out after {0}ms")]
    Timeout(u64),

    /// Provider is unreachable or switched off.
    #[error("search provider unavailable: {0}")]
    Unavailable(String),

    /// All retry attempts exhausted.
    #[error("all search attempts exhausted after {attempts} tries: {last_error}")]
    RetriesExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Error from the final attempt.
        last_error: String,
    },

    /// Configuration error.
    #[error("search configuration error: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchError::Timeout(0)
        } else if err.is_connect() {
            SearchError::Unavailable(err.to_string())
        } else if err.is_decode() {
            SearchError::ParseError(err.to_string())
        } else {
            SearchError::RequestFailed(err.to_string())
        }
    }
}

impl From<SearchError> for SageError {
    fn from(err: SearchError) -> Self {
        SageError::SearchUnavailable(err.to_string())
    }
}
