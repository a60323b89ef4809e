//! Search client: one interface over DuckDuckGo, SearxNG, or nothing.

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use sage_core::config::SearchConfig;
use sage_core::search::{SearchBackend, SearchHit, SearchQuery};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::SearchError;
use crate::types::{DuckDuckGoResponse, SearxResponse};

/// Which provider answers queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchProvider {
    /// DuckDuckGo Instant Answer API.
    DuckDuckGo {
        /// API root, e.g. `https://api.duckduckgo.com`.
        base_url: String,
    },
    /// A SearxNG instance with the JSON format enabled.
    SearxNg {
        /// Instance root, e.g. `http://localhost:8888`.
        base_url: String,
    },
    /// No provider: every query fails and the resolver falls back.
    None,
}

impl SearchProvider {
    /// Provider named by `config.provider`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::ConfigError`] for an unknown provider name.
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        match config.provider.to_ascii_lowercase().as_str() {
            "duckduckgo" | "ddg" => Ok(Self::DuckDuckGo { base_url }),
            "searxng" | "searx" => Ok(Self::SearxNg { base_url }),
            "none" | "" => Ok(Self::None),
            other => Err(SearchError::ConfigError(format!(
                "unknown search provider '{other}' (expected duckduckgo, searxng or none)"
            ))),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::DuckDuckGo { .. } => "duckduckgo",
            Self::SearxNg { .. } => "searxng",
            Self::None => "none",
        }
    }
}

/// HTTP search client with retries.
pub struct SearchClient {
    provider: SearchProvider,
    http: Client,
    max_retries: u32,
}

impl SearchClient {
    /// Create a client for `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::ConfigError`] if the HTTP client cannot be
    /// built.
    pub fn new(
        provider: SearchProvider,
        user_agent: &str,
        max_retries: u32,
    ) -> Result<Self, SearchError> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| SearchError::ConfigError(e.to_string()))?;
        Ok(Self {
            provider,
            http,
            max_retries,
        })
    }

    /// Create a client from the `[search]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::ConfigError`] for an unknown provider.
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        Self::new(
            SearchProvider::from_config(config)?,
            &config.user_agent,
            config.max_retries,
        )
    }

    /// Create a client with no provider (all calls fail → generated fallback).
    #[must_use]
    pub fn none() -> Self {
        Self {
            provider: SearchProvider::None,
            http: Client::new(),
            max_retries: 0,
        }
    }

    /// The configured provider.
    #[must_use]
    pub fn provider(&self) -> &SearchProvider {
        &self.provider
    }

    /// Check if a provider is configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, SearchProvider::None)
    }

    /// Run a query against the provider.
    ///
    /// Returns `Err` if the provider is unavailable or all retries fail.
    pub async fn query(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, SearchError> {
        match &self.provider {
            SearchProvider::None => Err(SearchError::Unavailable(
                "no search provider configured".into(),
            )),
            SearchProvider::DuckDuckGo { base_url } => {
                let params = [
                    ("q", query.text.as_str()),
                    ("format", "json"),
                    ("no_html", "1"),
                    ("skip_disambig", "1"),
                ];
                let response: DuckDuckGoResponse =
                    self.get_json(&format!("{base_url}/"), &params, query.timeout).await?;
                Ok(response.into_hits(query.limit))
            }
            SearchProvider::SearxNg { base_url } => {
                let params = [("q", query.text.as_str()), ("format", "json")];
                let response: SearxResponse = self
                    .get_json(&format!("{base_url}/search"), &params, query.timeout)
                    .await?;
                Ok(response.into_hits(query.limit))
            }
        }
    }

    /// GET `url` with retries and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<T, SearchError> {
        let provider = self.provider.name();
        let mut last_error = String::new();
        let mut attempts = 0;

        for attempt in 0..=self.max_retries {
            attempts += 1;
            if attempt > 0 {
                debug!(provider, attempt = attempt + 1, max = self.max_retries + 1, "Retrying search call");
            }

            let start = Instant::now();
            let result = self
                .http
                .get(url)
                .query(params)
                .timeout(timeout)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let body = resp.text().await.map_err(SearchError::from)?;
                    debug!(
                        provider,
                        elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                        bytes = body.len(),
                        "Search response received"
                    );
                    return serde_json::from_str(&body)
                        .map_err(|e| SearchError::ParseError(e.to_string()));
                }
                Ok(resp) => {
                    let status = resp.status();
                    last_error = format!("HTTP {status}");
                    warn!(provider, %status, "Search provider returned error");
                    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                        break;
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() {
                        warn!(provider, timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX), "Search request timed out");
                    } else {
                        warn!(provider, error = %last_error, "Search request failed");
                    }
                }
            }
        }

        Err(SearchError::RetriesExhausted {
            attempts,
            last_error,
        })
    }
}

impl SearchBackend for SearchClient {
    async fn search(&self, query: &SearchQuery) -> sage_core::Result<Vec<SearchHit>> {
        Ok(self.query(query).await?)
    }
}
