//! # Cache Keys & Topics
//!
//! Derives the cache keys made stale by an order mutation, the pub/sub
//! topic an order is broadcast on, and the order-number sequence key.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request scope                     stale keys                           │
//! │  ─────────────────────────────     ──────────────────────────────       │
//! │  branchId  = "b1"            ──►   orders:branch:b1                     │
//! │  companyId = "c1"            ──►   orders:company:c1                    │
//! │  waiterId  = (absent)        ──►   (nothing)                            │
//! │                                                                         │
//! │  broadcast topic: orders:branch:{order.branch_id}                       │
//! │  sequence key:    order-seq:{branch_id}:{YYYYMMDD}                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::validation::{validate_optional_id, ValidationResult};

/// Prefix shared by every order list cache key.
pub const ORDERS_PREFIX: &str = "orders";

/// Which listings a mutation touches. Only non-empty fields produce keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CacheScope {
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub waiter_id: Option<String>,
}

impl CacheScope {
    pub fn new(
        branch_id: Option<String>,
        company_id: Option<String>,
        waiter_id: Option<String>,
    ) -> Self {
        CacheScope {
            branch_id,
            company_id,
            waiter_id,
        }
    }

    /// Blank strings count as absent; anything else must be a valid id.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_optional_id("branchId", non_blank(&self.branch_id))?;
        validate_optional_id("companyId", non_blank(&self.company_id))?;
        validate_optional_id("waiterId", non_blank(&self.waiter_id))?;
        Ok(())
    }

    /// Stale keys for this scope, in branch / company / waiter order.
    ///
    /// ## Example
    /// ```rust
    /// use galley_core::cache_keys::CacheScope;
    ///
    /// let scope = CacheScope::new(Some("b1".into()), Some("c1".into()), None);
    /// assert_eq!(scope.stale_keys(), vec!["orders:branch:b1", "orders:company:c1"]);
    /// ```
    pub fn stale_keys(&self) -> Vec<String> {
        [
            ("branch", &self.branch_id),
            ("company", &self.company_id),
            ("waiter", &self.waiter_id),
        ]
        .into_iter()
        .filter_map(|(kind, id)| non_blank(id).map(|id| format!("{ORDERS_PREFIX}:{kind}:{id}")))
        .collect()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Topic carrying post-mutation snapshots of a branch's orders.
pub fn branch_topic(branch_id: &str) -> String {
    format!("{ORDERS_PREFIX}:branch:{branch_id}")
}

/// Cache key of a branch's order list; evicted through [`CacheScope::stale_keys`].
pub fn branch_orders_key(branch_id: &str) -> String {
    format!("{ORDERS_PREFIX}:branch:{branch_id}")
}

/// Counter key for a branch's order numbers on a given day.
pub fn order_sequence_key(branch_id: &str, day: NaiveDate) -> String {
    format!("order-seq:{}:{}", branch_id, day.format("%Y%m%d"))
}

/// Formats `YYYYMMDD-NNNN`. Sequences past 9999 widen instead of wrapping.
pub fn format_order_number(day: NaiveDate, sequence: i64) -> String {
    format!("{}-{:04}", day.format("%Y%m%d"), sequence)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_and_company_give_two_keys() {
        let scope = CacheScope::new(Some("b1".into()), Some("c1".into()), None);
        assert_eq!(scope.stale_keys(), vec!["orders:branch:b1", "orders:company:c1"]);
    }

    #[test]
    fn test_branch_only_gives_one_key() {
        let scope = CacheScope::new(Some("b1".into()), None, None);
        assert_eq!(scope.stale_keys(), vec!["orders:branch:b1"]);
    }

    #[test]
    fn test_waiter_key_and_blank_fields() {
        let scope = CacheScope::new(Some("  ".into()), None, Some("w7".into()));
        assert_eq!(scope.stale_keys(), vec!["orders:waiter:w7"]);
        assert!(scope.validate().is_ok());
        assert!(CacheScope::default().stale_keys().is_empty());
    }

    #[test]
    fn test_invalid_scope_id_rejected() {
        let scope = CacheScope::new(Some("b 1".into()), None, None);
        assert!(scope.validate().is_err());
    }

    #[test]
    fn test_topic_and_sequence() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(branch_topic("b1"), "orders:branch:b1");
        let evicted = CacheScope::new(Some("b1".into()), None, None).stale_keys();
        assert_eq!(evicted, vec![branch_orders_key("b1")]);
        assert_eq!(order_sequence_key("b1", day), "order-seq:b1:20260307");
        assert_eq!(format_order_number(day, 42), "20260307-0042");
        assert_eq!(format_order_number(day, 12_345), "20260307-12345");
    }
}
