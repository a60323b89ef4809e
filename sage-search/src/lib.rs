//! # sage-search: Web Search Adapter for SAGE
//!
//! Implements [`sage_core::SearchBackend`] over HTTP:
//!   - **DuckDuckGo Instant Answer API** (default, no key needed)
//!   - **SearxNG** JSON API (self-hosted metasearch)
//!   - **None**: every call fails, so the resolver goes straight to its
//!     generated fallback
//!
//! The client owns retries and per-request HTTP timeouts. The resolver
//! still wraps every call in its own deadline, so a slow provider can only
//! ever cost one timeout.

pub mod client;
pub mod error;
pub mod types;

pub use client::{SearchClient, SearchProvider};
pub use error::SearchError;
