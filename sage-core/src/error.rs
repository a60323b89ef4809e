//! Error types for the SAGE core library.

use thiserror::Error;

/// Top-level error type for all SAGE operations.
///
/// Only [`SageError::InvalidRequest`] ever reaches a caller of
/// [`Resolver::resolve`](crate::Resolver::resolve); the pipeline absorbs the
/// rest at stage boundaries.
#[derive(Error, Debug)]
pub enum SageError {
    /// The inbound message was rejected before entering the pipeline.
    #[error("Invalid request: {reason}")]
    InvalidRequest {
        /// Why the message was rejected.
        reason: String,
    },

    /// The persisted knowledge store could not be read back.
    #[error("Knowledge store corrupt: {0}")]
    KnowledgeCorrupt(String),

    /// The search backend failed, timed out or is not configured.
    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SageError {
    /// Shorthand for an [`SageError::InvalidRequest`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Whether the persisted data itself is unreadable. Busy or locked
    /// databases, I/O and permission failures are not corruption.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::KnowledgeCorrupt(_) => true,
            Self::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::NotADatabase | rusqlite::ErrorCode::DatabaseCorrupt
            ),
            _ => false,
        }
    }
}


/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, SageError>;
