//! # Relay Configuration
//!
//! Deadlines and retry settings for the cache and broadcast collaborators.
//!
//! ## Config File Format (TOML)
//! ```toml
//! [cache]
//! timeout_ms = 250
//! list_ttl_secs = 30
//!
//! [broadcast]
//! timeout_ms = 500
//!
//! [retry]
//! max_attempts = 3
//! initial_backoff_ms = 50
//! max_backoff_ms = 1000
//! ```
//!
//! ## Loading Order
//! 1. Defaults
//! 2. TOML file (if given and present)
//! 3. `GALLEY_RELAY_*` environment variables
//! 4. `validate()`

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{RelayError, RelayResult};
use crate::retry::RetryPolicy;

// =============================================================================
// Relay Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub broadcast: BroadcastSettings,

    #[serde(default)]
    pub retry: RetrySettings,
}

// =============================================================================
// Cache Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSettings {
    /// Deadline for a single cache call.
    #[serde(default = "default_cache_timeout")]
    pub timeout_ms: u64,

    /// How long a cached order list lives before it is rebuilt.
    #[serde(default = "default_list_ttl")]
    pub list_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_cache_timeout(),
            list_ttl_secs: default_list_ttl(),
        }
    }
}

fn default_cache_timeout() -> u64 {
    250
}

fn default_list_ttl() -> u64 {
    30
}

// =============================================================================
// Broadcast Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BroadcastSettings {
    /// Deadline for a single publish.
    #[serde(default = "default_broadcast_timeout")]
    pub timeout_ms: u64,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_broadcast_timeout(),
        }
    }
}

fn default_broadcast_timeout() -> u64 {
    500
}

// =============================================================================
// Retry Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySettings {
    /// Attempts per operation, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    50
}
fn default_max_backoff() -> u64 {
    1_000
}

// =============================================================================
// Loading
// =============================================================================

impl RelayConfig {
    /// Loads configuration from an optional TOML file, then applies
    /// environment overrides and validates.
    pub fn load(config_path: Option<&Path>) -> RelayResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path {
            if path.exists() {
                info!(?path, "Loading relay config from file");
                let contents = std::fs::read_to_string(path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Relay config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> RelayResult<()> {
        if self.retry.max_attempts == 0 {
            return Err(RelayError::InvalidConfig(
                "retry.max_attempts must be greater than 0".into(),
            ));
        }

        if self.cache.timeout_ms == 0 || self.broadcast.timeout_ms == 0 {
            return Err(RelayError::InvalidConfig(
                "timeouts must be greater than 0".into(),
            ));
        }

        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(RelayError::InvalidConfig(format!(
                "retry.initial_backoff_ms ({}) exceeds retry.max_backoff_ms ({})",
                self.retry.initial_backoff_ms, self.retry.max_backoff_ms
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(ms) = env_u64("GALLEY_RELAY_CACHE_TIMEOUT_MS") {
            debug!(timeout_ms = ms, "Overriding cache timeout from environment");
            self.cache.timeout_ms = ms;
        }

        if let Some(secs) = env_u64("GALLEY_RELAY_LIST_TTL_SECS") {
            self.cache.list_ttl_secs = secs;
        }

        if let Some(ms) = env_u64("GALLEY_RELAY_BROADCAST_TIMEOUT_MS") {
            debug!(timeout_ms = ms, "Overriding broadcast timeout from environment");
            self.broadcast.timeout_ms = ms;
        }

        if let Some(attempts) = env_u64("GALLEY_RELAY_MAX_ATTEMPTS") {
            self.retry.max_attempts = attempts.min(u32::MAX as u64) as u32;
        }

        if let Some(ms) = env_u64("GALLEY_RELAY_INITIAL_BACKOFF_MS") {
            self.retry.initial_backoff_ms = ms;
        }

        if let Some(ms) = env_u64("GALLEY_RELAY_MAX_BACKOFF_MS") {
            self.retry.max_backoff_ms = ms;
        }
    }

    // =========================================================================
    // Derived policies
    // =========================================================================

    pub fn cache_policy(&self) -> RetryPolicy {
        self.policy(self.cache.timeout_ms)
    }

    pub fn broadcast_policy(&self) -> RetryPolicy {
        self.policy(self.broadcast.timeout_ms)
    }

    pub fn list_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.list_ttl_secs)
    }

    fn policy(&self, timeout_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            attempt_timeout: Duration::from_millis(timeout_ms),
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.trim().parse().ok()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.cache.timeout_ms, 250);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_field_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            [retry]
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff_ms, 50);
        assert_eq!(config.broadcast.timeout_ms, 500);
    }

    #[test]
    fn test_config_validation() {
        let mut config = RelayConfig::default();

        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        config.retry.max_attempts = 1;
        config.retry.initial_backoff_ms = 5_000;
        assert!(config.validate().is_err());

        config.retry.initial_backoff_ms = 10;
        config.broadcast.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policies_follow_settings() {
        let config = RelayConfig::default();
        let cache = config.cache_policy();
        let broadcast = config.broadcast_policy();

        assert_eq!(cache.attempt_timeout, Duration::from_millis(250));
        assert_eq!(broadcast.attempt_timeout, Duration::from_millis(500));
        assert_eq!(cache.max_attempts, broadcast.max_attempts);
        assert_eq!(config.list_ttl(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = RelayConfig::load(Some(Path::new("/nonexistent/galley-relay.toml"))).unwrap();
        assert_eq!(config.retry, RetrySettings::default());
    }

    #[test]
    fn test_toml_serialization() {
        let config = RelayConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[cache]"));
        assert!(toml_str.contains("[retry]"));
    }
}
