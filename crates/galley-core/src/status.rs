//! # Order State Machine
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Status Lifecycle                            │
//! │                                                                         │
//! │   PENDING ──────► PROCESSING ──────► COMPLETED                         │
//! │      │                 │                  │                             │
//! │      │                 │                  │                             │
//! │      └─────────────────┴──────────────────┴──────► PAID (terminal)     │
//! │                                                      │                  │
//! │                                                      ▼                  │
//! │                                        Inventory Deduction fires        │
//! │                                        exactly once, on entry           │
//! │                                                                         │
//! │   • Forward skips are allowed (PENDING → COMPLETED)                    │
//! │   • Backward moves are rejected                                        │
//! │   • PAID → PAID is a no-op (no second deduction)                       │
//! │   • PAID → anything else is rejected                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};

/// The status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order placed, kitchen has not started.
    Pending,
    /// Kitchen is preparing the order.
    Processing,
    /// Food served; bill not settled.
    Completed,
    /// Bill settled. Terminal.
    Paid,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

/// Outcome of a validated status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Requested status equals the current one.
    Unchanged,
    /// Forward move among PENDING / PROCESSING / COMPLETED.
    Advance,
    /// First entry into PAID; inventory deduction must run.
    EnterPaid,
}

impl Transition {
    /// Whether this transition triggers the inventory deduction protocol.
    #[inline]
    pub fn deducts_inventory(&self) -> bool {
        matches!(self, Transition::EnterPaid)
    }
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Completed,
        OrderStatus::Paid,
    ];

    fn rank(self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Processing => 1,
            OrderStatus::Completed => 2,
            OrderStatus::Paid => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Paid => "paid",
        }
    }

    #[inline]
    pub fn is_paid(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    /// Validates a move from `self` to `next` for a given order.
    ///
    /// ## Examples
    /// ```rust
    /// use galley_core::status::{OrderStatus, Transition};
    ///
    /// assert_eq!(
    ///     OrderStatus::Pending.check_transition("o1", OrderStatus::Completed).unwrap(),
    ///     Transition::Advance
    /// );
    /// assert_eq!(
    ///     OrderStatus::Paid.check_transition("o1", OrderStatus::Paid).unwrap(),
    ///     Transition::Unchanged
    /// );
    /// assert!(OrderStatus::Completed.check_transition("o1", OrderStatus::Processing).is_err());
    /// ```
    pub fn check_transition(self, order_id: &str, next: OrderStatus) -> Result<Transition, CoreError> {
        if self == next {
            return Ok(Transition::Unchanged);
        }

        let reject = || CoreError::InvalidTransition {
            order_id: order_id.to_string(),
            from: self,
            to: next,
        };

        if self.is_paid() {
            return Err(reject());
        }
        if next.is_paid() {
            return Ok(Transition::EnterPaid);
        }
        if next.rank() > self.rank() {
            Ok(Transition::Advance)
        } else {
            Err(reject())
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses client-supplied status text.
///
/// Case-insensitive. Anything outside the four states is a
/// [`ValidationError::NotAllowed`], never silently stored.
impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "paid" => Ok(OrderStatus::Paid),
            _ => Err(ValidationError::NotAllowed {
                field: "orderStatus".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
