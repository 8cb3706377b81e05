//! # Error Types
//!
//! Domain-specific error types for galley-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  galley-core errors (this file)                                        │
//! │  ├── CoreError        - Order / inventory rule violations              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  galley-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  galley-api errors (in app)                                            │
//! │  └── ApiError         - What HTTP clients see (code + message)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::quantity::Quantity;
use crate::status::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Order cannot be found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// A submitted line id does not belong to the order.
    ///
    /// ## When This Occurs
    /// - Client holds a stale line id after the order was rebuilt
    /// - Client submits a line id from a different order
    ///
    /// The whole reconciliation is aborted; no partial edit is kept.
    #[error("Order line {line_id} not found on order {order_id}")]
    OrderLineNotFound { order_id: String, line_id: String },

    /// Requested status change runs backward or leaves PAID.
    ///
    /// ## State Diagram
    /// ```text
    /// PENDING ──► PROCESSING ──► COMPLETED
    ///    │             │             │
    ///    └─────────────┴─────────────┴──► PAID (terminal)
    /// ```
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Lines of a paid order cannot be edited.
    #[error("Order {0} is paid; its lines can no longer be edited")]
    OrderLocked(String),

    /// Strict stock policy rejected a decrement.
    ///
    /// ## When This Occurs
    /// - `StockPolicy::Strict` is configured
    /// - The batch would leave `(ingredient, branch)` below zero
    #[error(
        "Insufficient stock of ingredient {ingredient_id} at branch {branch_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        ingredient_id: String,
        branch_id: String,
        available: Quantity,
        requested: Quantity,
    },

    /// A deduction or stock balance does not fit in a `Quantity`.
    #[error("Quantity overflow for ingredient {ingredient_id} at branch {branch_id}")]
    QuantityOverflow {
        ingredient_id: String,
        branch_id: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any write happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., same line id submitted twice).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }

    pub fn out_of_range(field: impl Into<String>, min: i64, max: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
