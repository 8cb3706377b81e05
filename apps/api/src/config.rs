//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! ## Environment
//! - `GALLEY_PORT` - HTTP port (default 8080)
//! - `DATABASE_PATH` - SQLite file (default `galley.db`)
//! - `GALLEY_DB_MAX_CONNECTIONS` - pool size (default 5)
//! - `GALLEY_DB_BUSY_TIMEOUT_MS` - how long a writer waits on another writer (default 5000)
//! - `REDIS_URL` - Redis for cache and pub/sub (optional; in-process fallback)
//! - `GALLEY_STOCK_POLICY` - `allow_negative` (default) or `strict`
//! - `GALLEY_DEDUCTION_TIMEOUT_MS` - deadline of the deduction batch (default 5000)
//! - `GALLEY_RELAY_CONFIG` - optional TOML file for [`RelayConfig`]

use std::path::{Path, PathBuf};
use std::time::Duration;

use galley_core::StockPolicy;
use galley_db::{DbConfig, UpdateOptions};
use galley_relay::{RelayConfig, RelayError};

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Connection pool size
    pub db_max_connections: u32,

    /// Write-lock wait before a request fails as busy
    pub db_busy_timeout_ms: u64,

    /// Redis connection string (optional)
    pub redis_url: Option<String>,

    /// Negative-stock handling during deduction
    pub stock_policy: StockPolicy,

    /// Deadline for the deduction batch inside the order transaction
    pub deduction_timeout_ms: u64,

    /// Cache / broadcast deadlines and retries
    pub relay: RelayConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            port: 8080,
            database_path: PathBuf::from("galley.db"),
            db_max_connections: 5,
            db_busy_timeout_ms: 5_000,
            redis_url: None,
            stock_policy: StockPolicy::AllowNegative,
            deduction_timeout_ms: 5_000,
            relay: RelayConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn load_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ApiConfig::default();

        let port = match lookup("GALLEY_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GALLEY_PORT".to_string()))?,
            None => defaults.port,
        };

        let database_path = lookup("DATABASE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let db_max_connections = match lookup("GALLEY_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GALLEY_DB_MAX_CONNECTIONS".to_string()))?,
            None => defaults.db_max_connections,
        };

        let db_busy_timeout_ms = match lookup("GALLEY_DB_BUSY_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GALLEY_DB_BUSY_TIMEOUT_MS".to_string()))?,
            None => defaults.db_busy_timeout_ms,
        };

        let redis_url = lookup("REDIS_URL").filter(|url| !url.trim().is_empty());

        let stock_policy = match lookup("GALLEY_STOCK_POLICY") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GALLEY_STOCK_POLICY".to_string()))?,
            None => defaults.stock_policy,
        };

        let deduction_timeout_ms = match lookup("GALLEY_DEDUCTION_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GALLEY_DEDUCTION_TIMEOUT_MS".to_string()))?,
            None => defaults.deduction_timeout_ms,
        };

        let relay_path = lookup("GALLEY_RELAY_CONFIG").map(PathBuf::from);
        let relay = RelayConfig::load(relay_path.as_deref().map(Path::new))?;

        let config = ApiConfig {
            port,
            database_path,
            db_max_connections,
            db_busy_timeout_ms,
            redis_url,
            stock_policy,
            deduction_timeout_ms,
            relay,
        };
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.deduction_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "GALLEY_DEDUCTION_TIMEOUT_MS".to_string(),
            ));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "GALLEY_DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        if let Some(url) = &self.redis_url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(ConfigError::InvalidValue("REDIS_URL".to_string()));
            }
        }
        Ok(())
    }

    /// Pool settings for [`galley_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.db_max_connections)
            .busy_timeout(Duration::from_millis(self.db_busy_timeout_ms))
    }

    /// Options handed to every order update.
    pub fn update_options(&self) -> UpdateOptions {
        UpdateOptions {
            stock_policy: self.stock_policy,
            deduction_timeout: Duration::from_millis(self.deduction_timeout_ms),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error(transparent)]
    Relay(#[from] RelayError),
}
