//! Configuration types for the token listing sync
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

use crate::traits::DEFAULT_RATE_LIMIT_SECS;

/// Default listings feed endpoint
pub const DEFAULT_FEED_URL: &str = "https://api.coinmarketcap.com/v2/listings/";

/// Default page the address lookup scrapes; `{slug}` is replaced
pub const DEFAULT_LOOKUP_URL_TEMPLATE: &str = "https://coinmarketcap.com/currencies/{slug}/";

/// Default record directory
pub const DEFAULT_TOKENS_DIR: &str = "tokens";

/// Main sync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Listings feed configuration
    #[serde(default)]
    pub feed: FeedConfig,

    /// Address lookup configuration
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Record store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.feed.validate()?;
        self.lookup.validate()?;
        self.store.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Listings feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// URL returning `{"data": [listing, ...]}`
    pub url: String,
}

impl FeedConfig {
    /// Validate the feed configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_http_url("Feed URL", &self.url)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
        }
    }
}

/// Address lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Page URL with a `{slug}` placeholder
    pub url_template: String,
}

impl LookupConfig {
    /// Validate the lookup configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_http_url("Lookup URL template", &self.url_template)?;
        if !self.url_template.contains("{slug}") {
            return Err(crate::Error::config(
                "Lookup URL template must contain a {slug} placeholder",
            ));
        }
        Ok(())
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_LOOKUP_URL_TEMPLATE.to_string(),
        }
    }
}

/// Record store configuration (one YAML file per address)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding `0x*.yaml` files
    #[serde(default = "default_tokens_dir")]
    pub path: String,

    /// Log writes instead of performing them
    #[serde(default)]
    pub dry_run: bool,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.path.trim().is_empty() {
            return Err(crate::Error::config("Record directory cannot be empty"));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_tokens_dir(),
            dry_run: false,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay before each listing (in seconds)
    ///
    /// The upstream API allows roughly five requests a minute; the default
    /// of 12 seconds stays under it.
    #[serde(default = "default_rate_limit_secs")]
    pub rate_limit_secs: u64,

    /// Deprecate the addresses of indexed listing IDs missing from the feed
    #[serde(default = "default_deprecate_vanished")]
    pub deprecate_vanished: bool,

    /// Capacity of the event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Rate limit as a duration
    pub fn rate_limit(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.rate_limit_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rate_limit_secs: default_rate_limit_secs(),
            deprecate_vanished: default_deprecate_vanished(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_tokens_dir() -> String {
    DEFAULT_TOKENS_DIR.to_string()
}

fn default_rate_limit_secs() -> u64 {
    DEFAULT_RATE_LIMIT_SECS
}

fn default_deprecate_vanished() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn validate_http_url(what: &str, url: &str) -> Result<(), crate::Error> {
    if url.is_empty() {
        return Err(crate::Error::config(format!("{} cannot be empty", what)));
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(crate::Error::config(format!(
            "{} must use HTTP or HTTPS scheme. Got: {}",
            what, url
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SyncConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.rate_limit_secs, 12);
        assert!(config.engine.deprecate_vanished);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: SyncConfig = serde_json::from_str(
            r#"{"store": {"dry_run": true}, "engine": {"rate_limit_secs": 0}}"#,
        )
        .unwrap();

        assert!(config.store.dry_run);
        assert_eq!(config.store.path, DEFAULT_TOKENS_DIR);
        assert_eq!(config.engine.rate_limit_secs, 0);
        assert_eq!(config.engine.event_channel_capacity, 1000);
        assert_eq!(config.feed.url, DEFAULT_FEED_URL);
    }

    #[test]
    fn test_lookup_template_needs_placeholder() {
        let mut config = SyncConfig::new();
        config.lookup.url_template = "https://example.org/currencies/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_store_path_required() {
        let mut config = SyncConfig::new();
        config.store.path = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_feed_url_scheme_checked() {
        let mut config = SyncConfig::new();
        config.feed.url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());
    }
}
