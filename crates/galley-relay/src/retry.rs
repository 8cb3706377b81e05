//! # Bounded Retry
//!
//! Runs a collaborator call with a per-attempt deadline and exponential
//! backoff between attempts.
//!
//! ```text
//! attempt 1 ──(timeout | error)──► sleep 50ms
//! attempt 2 ──(timeout | error)──► sleep ~100ms
//! attempt 3 ──(timeout | error)──► give up, return last error
//!
//! non-retryable error at any attempt ──► return immediately
//! ```
//!
//! Only post-commit side effects go through here. The order transaction
//! itself is never retried.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{RelayError, RelayResult};

/// Attempts, deadline and backoff bounds for one kind of call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            attempt_timeout: Duration::from_millis(500),
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A single attempt with the given deadline.
    pub fn once(attempt_timeout: Duration) -> Self {
        RetryPolicy {
            max_attempts: 1,
            attempt_timeout,
            ..Default::default()
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// attempts run out.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> RelayResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RelayResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = policy.create_backoff();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let err = match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(Ok(value)) => {
                if attempt > 1 {
                    debug!(operation, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Ok(Err(e)) => e,
            Err(_) => RelayError::Timeout {
                operation: operation.to_string(),
                timeout: policy.attempt_timeout,
            },
        };

        if !err.is_retryable() || attempt >= max_attempts {
            return Err(err);
        }

        let delay = backoff.next_backoff().unwrap_or(policy.max_backoff);
        warn!(
            operation,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Attempt failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            attempt_timeout: Duration::from_millis(100),
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(40),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast(), "publish", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(RelayError::Broadcast("connection reset".into()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: RelayResult<()> = with_retry(&fast(), "cache delete", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(RelayError::Cache("refused".into()))
        })
        .await;

        assert!(matches!(result, Err(RelayError::Cache(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempt_times_out() {
        let calls = AtomicU32::new(0);
        let result: RelayResult<()> = with_retry(&fast(), "publish", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(RelayError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: RelayResult<()> = with_retry(&fast(), "publish", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(RelayError::InvalidConfig("bad".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_starts_at_initial_interval() {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(100),
            ..fast()
        };
        let mut backoff = policy.create_backoff();
        // randomization spreads the interval to ±50%
        let first = backoff.next_backoff().unwrap();
        assert!(first >= Duration::from_millis(50) && first <= Duration::from_millis(150));
    }
}
