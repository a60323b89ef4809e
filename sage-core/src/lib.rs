//! # SAGE Core Library
//!
//! Answer-resolution pipeline for a programming Q&A responder.
//!
//! A free-text message flows through a fixed sequence of stages, and the
//! first stage that produces an answer wins:
//!
//! 1. **Classify & extract**: keyword intents ([`intent`]) and technology
//!    names ([`entities`]). Always runs, never fails.
//! 2. **Exact match**: normalized-question equality in the
//!    [`KnowledgeStore`].
//! 3. **Fuzzy match**: token-overlap lookup over the most recent entries.
//! 4. **Web search**: an injected [`SearchBackend`], bounded by a timeout.
//!    Hits are written back into the store.
//! 5. **Generated**: intent-keyed templates ([`generation`]).
//!
//! The [`Resolver`] owns the store, the search backend and the session
//! tracker. Its only caller-visible failure is
//! [`SageError::InvalidRequest`]; everything else degrades to the next stage.
//!
//! ```text
//! message ──▶ validate ──▶ classify/extract ──▶ exact ──▶ fuzzy ──▶ search ──▶ generated
//!                                                 │         │         │            │
//!                                                 └─────────┴────┬────┴────────────┘
//!                                                                ▼
//!                                                  Resolution { response, source, confidence }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod entities;
pub mod error;
pub mod generation;
pub mod intent;
pub mod knowledge;
pub mod metrics;
pub mod persistence;
pub mod resolver;
pub mod search;
pub mod session;
pub mod text;
pub mod types;
pub mod validation;

pub use config::SageConfig;
pub use error::{Result, SageError};
pub use intent::Intent;
pub use knowledge::{KnowledgeEntry, KnowledgeStore};
pub use resolver::{Resolution, Resolver};
pub use search::{SearchBackend, SearchHit, SearchQuery};
pub use session::{InteractionRecord, SessionTracker};
pub use types::*;
