//! Branch/day order numbering through the injected counter.

use chrono::NaiveDate;
use std::time::Duration;

use galley_core::cache_keys::{format_order_number, order_sequence_key};
use galley_relay::{with_retry, CacheStore, RelayResult, RetryPolicy};

/// Expiry of a day's counter. The key already carries the date.
pub const SEQUENCE_TTL: Duration = Duration::from_secs(48 * 60 * 60);

/// Next `YYYYMMDD-NNNN` number for `branch_id` on `day`.
///
/// A retried increment may leave a gap in the sequence; it never hands
/// out the same number twice.
pub async fn next_order_number(
    cache: &dyn CacheStore,
    policy: &RetryPolicy,
    branch_id: &str,
    day: NaiveDate,
) -> RelayResult<String> {
    let key = order_sequence_key(branch_id, day);
    let sequence = with_retry(policy, "order sequence", || {
        cache.increment(&key, Some(SEQUENCE_TTL))
    })
    .await?;
    Ok(format_order_number(day, sequence))
}
