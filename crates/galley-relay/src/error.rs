//! # Relay Error Types
//!
//! Failures of the post-commit collaborators.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Relay Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Backend       │  │     Payload             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Cache          │  │  Serialization          │ │
//! │  │  ConfigLoad     │  │  Broadcast      │  │                         │ │
//! │  │                 │  │  Timeout        │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Relay errors never reach an HTTP client: the order is already committed
//! when they happen, so callers log them and move on.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid relay configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load relay config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Backend Errors
    // =========================================================================
    /// The cache backend refused or failed an operation.
    #[error("Cache operation failed: {0}")]
    Cache(String),

    /// Publishing to subscribers failed.
    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    /// A single attempt ran past its deadline.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    // =========================================================================
    // Payload Errors
    // =========================================================================
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelayError {
    /// Whether another attempt could succeed.
    ///
    /// Configuration and payload errors fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RelayError::Cache(_) | RelayError::Broadcast(_) | RelayError::Timeout { .. }
        )
    }
}

impl From<redis::RedisError> for RelayError {
    fn from(err: redis::RedisError) -> Self {
        RelayError::Cache(err.to_string())
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for RelayError {
    fn from(err: toml::de::Error) -> Self {
        RelayError::ConfigLoadFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_categories() {
        assert!(RelayError::Cache("down".into()).is_retryable());
        assert!(RelayError::Broadcast("closed".into()).is_retryable());
        assert!(RelayError::Timeout {
            operation: "publish".into(),
            timeout: Duration::from_millis(50),
        }
        .is_retryable());
        assert!(!RelayError::InvalidConfig("max_retries".into()).is_retryable());
    }

    #[test]
    fn test_timeout_message() {
        let err = RelayError::Timeout {
            operation: "cache delete".into(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "cache delete timed out after 250ms");
    }
}
