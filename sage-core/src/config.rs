//! Configuration for the SAGE responder.
//!
//! Maps directly to `sage.toml`. Every field has a default, so an empty
//! file is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SageError};

/// Top-level SAGE configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SageConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Knowledge store location and lookup tuning.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    /// Pipeline thresholds and limits.
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// External search provider.
    #[serde(default)]
    pub search: SearchConfig,
    /// Session history bounds.
    #[serde(default)]
    pub session: SessionConfig,
    /// SQLite settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl SageConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns [`SageError::Config`] if the TOML is invalid or fails
    /// [`SageConfig::validate`].
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| SageError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check cross-field invariants.
    ///
    /// # Errors
    /// Returns [`SageError::Config`] describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f32| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(SageError::Config(format!("{name} must be within [0, 1], got {v}")))
            }
        };
        unit("resolver.min_acceptance", self.resolver.min_acceptance)?;
        unit("resolver.fuzzy_confidence_factor", self.resolver.fuzzy_confidence_factor)?;
        unit("resolver.search_confidence", self.resolver.search_confidence)?;
        unit("resolver.learn_threshold", self.resolver.learn_threshold)?;

        if self.session.history_floor >= self.session.history_cap {
            return Err(SageError::Config(format!(
                "session.history_floor ({}) must be below session.history_cap ({})",
                self.session.history_floor, self.session.history_cap
            )));
        }
        if self.knowledge.min_common_tokens == 0 {
            return Err(SageError::Config(
                "knowledge.min_common_tokens must be at least 1".to_string(),
            ));
        }
        if self.resolver.search_timeout_ms == 0 {
            return Err(SageError::Config(
                "resolver.search_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Knowledge store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// SQLite file holding entries and history.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// How many of the newest entries the fuzzy lookup scans.
    #[serde(default = "default_100")]
    pub fuzzy_window: usize,
    /// Shared tokens required for a fuzzy hit.
    #[serde(default = "default_2_usize")]
    pub min_common_tokens: usize,
    /// Insert the built-in starter entries into an empty store.
    #[serde(default = "default_true")]
    pub seed_on_empty: bool,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            fuzzy_window: 100,
            min_common_tokens: 2,
            seed_on_empty: true,
        }
    }
}

/// Pipeline thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Stored entries below this confidence never answer a request.
    #[serde(default = "default_0_5")]
    pub min_acceptance: f32,
    /// Fuzzy hits report `entry.confidence × factor`.
    #[serde(default = "default_0_8")]
    pub fuzzy_confidence_factor: f32,
    /// Confidence given to answers synthesized from search results.
    #[serde(default = "default_0_7")]
    pub search_confidence: f32,
    /// Search answers at or above this confidence are written back.
    #[serde(default = "default_0_6")]
    pub learn_threshold: f32,
    /// Upper bound on one search call.
    #[serde(default = "default_5000")]
    pub search_timeout_ms: u64,
    /// Results requested from the search backend.
    #[serde(default = "default_5_usize")]
    pub search_max_results: usize,
    /// Longer messages are rejected as invalid.
    #[serde(default = "default_4000")]
    pub max_message_chars: usize,
}

impl ResolverConfig {
    /// [`ResolverConfig::search_timeout_ms`] as a [`Duration`].
    #[must_use]
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_acceptance: 0.5,
            fuzzy_confidence_factor: 0.8,
            search_confidence: 0.7,
            learn_threshold: 0.6,
            search_timeout_ms: 5000,
            search_max_results: 5,
            max_message_chars: 4000,
        }
    }
}

/// External search provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Provider: "duckduckgo", "searxng", "none".
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Base URL of the provider API.
    #[serde(default = "default_search_url")]
    pub base_url: String,
    /// Extra attempts after the first failure.
    #[serde(default = "default_1_u32")]
    pub max_retries: u32,
    /// `User-Agent` header sent with search requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_search_url(),
            max_retries: 1,
            user_agent: default_user_agent(),
        }
    }
}

/// Session history bounds (hysteresis trim).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// History never grows past this many records.
    #[serde(default = "default_50")]
    pub history_cap: usize,
    /// Records kept when the cap is hit.
    #[serde(default = "default_20_usize")]
    pub history_floor: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_cap: 50,
            history_floor: 20,
        }
    }
}

/// Persistence / save configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Number of rotating backups to keep.
    #[serde(default = "default_3")]
    pub backup_count: u32,
    /// Detect corruption via per-row checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            backup_count: 3,
            checksum_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_db_path() -> String { "sage_knowledge.db".to_string() }
fn default_provider() -> String { "duckduckgo".to_string() }
fn default_search_url() -> String { "https://api.duckduckgo.com".to_string() }
fn default_user_agent() -> String { concat!("sage/", env!("CARGO_PKG_VERSION")).to_string() }
fn default_0_5() -> f32 { 0.5 }
fn default_0_6() -> f32 { 0.6 }
fn default_0_7() -> f32 { 0.7 }
fn default_0_8() -> f32 { 0.8 }
fn default_1_u32() -> u32 { 1 }
fn default_2_usize() -> usize { 2 }
fn default_3() -> u32 { 3 }
fn default_5_usize() -> usize { 5 }
fn default_20_usize() -> usize { 20 }
fn default_50() -> usize { 50 }
fn default_100() -> usize { 100 }
fn default_4000() -> usize { 4000 }
fn default_5000() -> u64 { 5000 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = SageConfig::from_toml("").expect("parse");
        assert_eq!(config.session.history_cap, 50);
        assert_eq!(config.session.history_floor, 20);
        assert_eq!(config.knowledge.min_common_tokens, 2);
        assert!((config.resolver.search_confidence - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.search.provider, "duckduckgo");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = SageConfig::from_toml(
            r#"
            [knowledge]
            db_path = "/tmp/kb.db"
            fuzzy_window = 10

            [search]
            provider = "none"
            "#,
        )
        .expect("parse");
        assert_eq!(config.knowledge.db_path, "/tmp/kb.db");
        assert_eq!(config.knowledge.fuzzy_window, 10);
        assert_eq!(config.knowledge.min_common_tokens, 2);
        assert_eq!(config.search.provider, "none");
        assert_eq!(config.search.max_retries, 1);
    }

    #[test]
    fn rejects_floor_above_cap() {
        let err = SageConfig::from_toml("[session]\nhistory_cap = 10\nhistory_floor = 10\n")
            .expect_err("invalid");
        assert!(matches!(err, SageError::Config(_)));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        assert!(SageConfig::from_toml("[resolver]\nmin_acceptance = 1.5\n").is_err());
    }

    #[test]
    fn rejects_zero_tokens_and_timeout() {
        assert!(SageConfig::from_toml("[knowledge]\nmin_common_tokens = 0\n").is_err());
        assert!(SageConfig::from_toml("[resolver]\nsearch_timeout_ms = 0\n").is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(SageConfig::from_toml("[general\nlog_level = ").is_err());
    }

    #[test]
    fn shipped_sample_matches_defaults() {
        let config = SageConfig::from_toml(include_str!("../../sage.toml")).expect("parse sample");
        let defaults = SageConfig::default();
        assert_eq!(config.knowledge.db_path, defaults.knowledge.db_path);
        assert_eq!(config.session.history_cap, defaults.session.history_cap);
        assert_eq!(config.resolver.search_timeout_ms, defaults.resolver.search_timeout_ms);
        assert_eq!(config.search.base_url, defaults.search.base_url);
    }

    #[test]
    fn timeout_duration() {
        let config = ResolverConfig::default();
        assert_eq!(config.search_timeout(), Duration::from_secs(5));
    }
}
