//! # galley-core: Pure Business Logic for Galley POS
//!
//! This crate holds the order lifecycle and inventory deduction rules as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Galley POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 galley-api (axum HTTP service)                  │   │
//! │  │     PUT /api/orders/{id} ──► OrderUpdateSaga                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ galley-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌────────────────┐  │   │
//! │  │   │  status  │ │  patch   │ │ deduction │ │  cache_keys    │  │   │
//! │  │   │ PENDING→ │ │ existing │ │ recipes → │ │ branch/company │  │   │
//! │  │   │   PAID   │ │ vs new   │ │ net deltas│ │ /waiter keys   │  │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘ └────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌────────────────────────────┐│┌──────────────────────────────────┐   │
//! │  │ galley-db (SQLite, sqlx)   │││ galley-relay (cache, pub/sub)    │   │
//! │  └────────────────────────────┘ └──────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, OrderLine, RecipeEntry, StockRecord, ...)
//! - [`money`] - Money type with integer cents
//! - [`quantity`] - Fixed-point ingredient quantities (thousandths)
//! - [`status`] - Order state machine
//! - [`patch`] - Typed partial updates and line partitioning
//! - [`deduction`] - Recipe resolution and per-ingredient netting
//! - [`cache_keys`] - Stale cache key and topic derivation
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use galley_core::status::{OrderStatus, Transition};
//!
//! let next = OrderStatus::Processing.check_transition("o1", OrderStatus::Paid).unwrap();
//! assert_eq!(next, Transition::EnterPaid);
//! assert!(OrderStatus::Paid.check_transition("o1", OrderStatus::Pending).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache_keys;
pub mod deduction;
pub mod error;
pub mod money;
pub mod patch;
pub mod quantity;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use quantity::Quantity;
pub use status::{OrderStatus, Transition};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single order.
///
/// ## Business Reason
/// A kitchen ticket with more lines than this is almost certainly a
/// client bug (duplicated submission loop).
pub const MAX_ORDER_LINES: usize = 200;

/// Maximum quantity of a single menu item on one line.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum unit price, line total or order amount in cents (1,000,000.00).
///
/// Keeps `price × quantity` and order sums far inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Maximum recipe amount or single stock addition, in thousandths
/// (1,000,000 units).
pub const MAX_QUANTITY_MILLI: i64 = 1_000_000_000;
