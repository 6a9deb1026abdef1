//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Status feed endpoint settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Polling cadence and publishing limits
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Bluesky account and endpoint settings
    #[serde(default)]
    pub bluesky: BlueskyConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Override selected values from environment variables.
    ///
    /// Credentials are usually supplied this way rather than written into
    /// the config file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("LINEWATCH_FEED_URL") {
            self.feed.url = url;
        }

        if let Ok(identifier) = std::env::var("LINEWATCH_IDENTIFIER") {
            self.bluesky.identifier = identifier;
        }

        if let Ok(password) = std::env::var("LINEWATCH_APP_PASSWORD") {
            self.bluesky.app_password = password;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.feed.url)
            .map_err(|e| AppError::validation(format!("feed.url is not a valid URL: {e}")))?;
        if self.feed.timeout_secs == 0 {
            return Err(AppError::validation("feed.timeout_secs must be > 0"));
        }
        if self.feed.user_agent.trim().is_empty() {
            return Err(AppError::validation("feed.user_agent is empty"));
        }
        if self.watcher.poll_interval_secs == 0 {
            return Err(AppError::validation(
                "watcher.poll_interval_secs must be > 0",
            ));
        }
        if self.watcher.error_cooldown_secs == 0 {
            return Err(AppError::validation(
                "watcher.error_cooldown_secs must be > 0",
            ));
        }
        if self.watcher.history_capacity == 0 {
            return Err(AppError::validation("watcher.history_capacity must be > 0"));
        }
        if self.watcher.max_post_chars <= 3 {
            return Err(AppError::validation(
                "watcher.max_post_chars must leave room for truncation (> 3)",
            ));
        }
        Url::parse(&self.bluesky.service)
            .map_err(|e| AppError::validation(format!("bluesky.service is not a valid URL: {e}")))?;
        if self.bluesky.timeout_secs == 0 {
            return Err(AppError::validation("bluesky.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Status feed endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed URL returning the line status JSON array
    #[serde(default = "defaults::feed_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::feed_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for feed requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: defaults::feed_url(),
            timeout_secs: defaults::feed_timeout(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Polling cadence and publishing limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Seconds between successful poll cycles
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_secs: u64,

    /// Seconds to wait after a failed cycle
    #[serde(default = "defaults::error_cooldown")]
    pub error_cooldown_secs: u64,

    /// Seconds during which an identical message is suppressed
    #[serde(default = "defaults::dedup_window")]
    pub dedup_window_secs: u64,

    /// Maximum number of post records kept in history
    #[serde(default = "defaults::history_capacity")]
    pub history_capacity: usize,

    /// Maximum characters per published post
    #[serde(default = "defaults::max_post_chars")]
    pub max_post_chars: usize,

    /// Record the first fetch without publishing anything
    #[serde(default)]
    pub prime_on_start: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: defaults::poll_interval(),
            error_cooldown_secs: defaults::error_cooldown(),
            dedup_window_secs: defaults::dedup_window(),
            history_capacity: defaults::history_capacity(),
            max_post_chars: defaults::max_post_chars(),
            prime_on_start: false,
        }
    }
}

/// Bluesky account and endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueskyConfig {
    /// Base URL of the XRPC service
    #[serde(default = "defaults::bluesky_service")]
    pub service: String,

    /// Account handle or DID
    #[serde(default)]
    pub identifier: String,

    /// App password for the account
    #[serde(default)]
    pub app_password: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::bluesky_timeout")]
    pub timeout_secs: u64,
}

impl BlueskyConfig {
    /// Credentials for login, or an error naming the missing value.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        if self.identifier.trim().is_empty() {
            return Err(AppError::config(
                "bluesky.identifier is not set (config file or LINEWATCH_IDENTIFIER)",
            ));
        }
        if self.app_password.trim().is_empty() {
            return Err(AppError::config(
                "bluesky.app_password is not set (config file or LINEWATCH_APP_PASSWORD)",
            ));
        }
        Ok((&self.identifier, &self.app_password))
    }
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            service: defaults::bluesky_service(),
            identifier: String::new(),
            app_password: String::new(),
            timeout_secs: defaults::bluesky_timeout(),
        }
    }
}

mod defaults {
    // Feed defaults
    pub fn feed_url() -> String {
        "https://api.tfl.gov.uk/Line/Mode/tube,overground,dlr,tram/Status".into()
    }
    pub fn feed_timeout() -> u64 {
        10
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; linewatch/1.0)".into()
    }

    // Watcher defaults
    pub fn poll_interval() -> u64 {
        300
    }
    pub fn error_cooldown() -> u64 {
        60
    }
    pub fn dedup_window() -> u64 {
        3600
    }
    pub fn history_capacity() -> usize {
        100
    }
    pub fn max_post_chars() -> usize {
        300
    }

    // Bluesky defaults
    pub fn bluesky_service() -> String {
        "https://bsky.social".into()
    }
    pub fn bluesky_timeout() -> u64 {
        30
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn default_cadence_matches_feed_contract() {
        let config = Config::default();
        assert_eq!(config.watcher.poll_interval_secs, 300);
        assert_eq!(config.watcher.error_cooldown_secs, 60);
        assert_eq!(config.watcher.dedup_window_secs, 3600);
        assert_eq!(config.watcher.history_capacity, 100);
        assert_eq!(config.watcher.max_post_chars, 300);
        assert_eq!(config.feed.timeout_secs, 10);
        assert!(!config.watcher.prime_on_start);
    }

    #[test]
    fn validate_rejects_bad_feed_url() {
        let mut config = Config::default();
        config.feed.url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let mut config = Config::default();
        config.watcher.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_tiny_post_limit() {
        let mut config = Config::default();
        config.watcher.max_post_chars = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn credentials_require_both_values() {
        let mut bluesky = BlueskyConfig::default();
        assert!(bluesky.credentials().is_err());

        bluesky.identifier = "handle.bsky.social".to_string();
        assert!(bluesky.credentials().is_err());

        bluesky.app_password = "secret".to_string();
        assert!(bluesky.credentials().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml = r#"
            [bluesky]
            identifier = "handle.bsky.social"

            [watcher]
            poll_interval_secs = 30
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.watcher.poll_interval_secs, 30);
        assert_eq!(config.watcher.error_cooldown_secs, 60);
        assert_eq!(config.bluesky.identifier, "handle.bsky.social");
        assert_eq!(config.bluesky.service, "https://bsky.social");
        assert!(config.feed.url.contains("api.tfl.gov.uk"));
    }
}
