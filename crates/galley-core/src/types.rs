//! # Domain Types
//!
//! Core domain types used throughout Galley POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Company ──owns──► Branch ──owns──► Order ──owns──► OrderLine          │
//! │     │                 │               │                │                │
//! │     │                 │               └──► Payment     │ menu_item_id   │
//! │     │                 │                                ▼                │
//! │     └──► Ingredient ◄─┼──────────────────────── RecipeEntry            │
//! │              │        │                       (amount per unit sold)   │
//! │              ▼        ▼                                                 │
//! │          StockRecord (ingredient_id, branch_id) → quantity             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Types serialize in camelCase. Money fields are integer cents;
//! ingredient quantities are integer thousandths (`*Milli`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::status::OrderStatus;

// =============================================================================
// Order
// =============================================================================

/// An order placed at a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Human-facing number, `YYYYMMDD-NNNN`, unique per branch and day.
    pub order_number: String,
    pub company_id: String,
    pub branch_id: String,
    /// Assigned waiter, if any.
    pub waiter_id: Option<String>,
    pub status: OrderStatus,
    /// Sum of line totals before discount (`totalPrice` on the wire).
    #[serde(rename = "totalPrice")]
    pub subtotal_cents: i64,
    #[serde(rename = "discount")]
    pub discount_cents: i64,
    #[serde(rename = "rounding")]
    pub rounding_cents: i64,
    /// Amount payable (`finalPrice` on the wire).
    #[serde(rename = "finalPrice")]
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Set once, on the first transition into PAID.
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Order Line
// =============================================================================

/// One menu item entry within an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub menu_item_id: String,
    /// Number of menu items; always positive.
    pub quantity: i64,
    #[serde(rename = "price")]
    pub unit_price_cents: i64,
    #[serde(rename = "totalPrice")]
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl OrderLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "transfer" => Ok(PaymentMethod::Transfer),
            _ => Err(ValidationError::NotAllowed {
                field: "method".to_string(),
                allowed: vec!["cash".into(), "card".into(), "transfer".into()],
            }),
        }
    }
}

/// A payment attached to an order (at most one per order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub method: PaymentMethod,
    #[serde(rename = "amount")]
    pub amount_cents: i64,
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Detail
// =============================================================================

/// An order reloaded with its lines and payment.
///
/// This is the response body of every order mutation and the payload
/// handed verbatim to the update broadcaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub payment: Option<Payment>,
}

impl OrderDetail {
    /// Sum of line totals as currently persisted.
    pub fn lines_total(&self) -> Money {
        self.lines
            .iter()
            .fold(Money::zero(), |acc, line| acc + line.line_total())
    }
}

// =============================================================================
// Ingredient & Recipe
// =============================================================================

/// Reference data: an ingredient a company stocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Ingredient {
    pub id: String,
    pub company_id: String,
    pub name: String,
    /// Unit of measure, e.g. `kg`, `l`, `pcs`.
    pub unit: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// How much of one ingredient a single unit of a menu item consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RecipeEntry {
    pub id: String,
    pub menu_item_id: String,
    pub ingredient_id: String,
    /// Amount per unit sold. Must be positive.
    #[serde(rename = "amountMilli")]
    pub amount: Quantity,
}

// =============================================================================
// Stock
// =============================================================================

/// Composite identity of a stock record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockKey {
    pub ingredient_id: String,
    pub branch_id: String,
}

impl StockKey {
    pub fn new(ingredient_id: impl Into<String>, branch_id: impl Into<String>) -> Self {
        StockKey {
            ingredient_id: ingredient_id.into(),
            branch_id: branch_id.into(),
        }
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.ingredient_id, self.branch_id)
    }
}

/// Current quantity of one ingredient at one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockRecord {
    pub ingredient_id: String,
    pub branch_id: String,
    /// Signed; negative means oversold.
    #[serde(rename = "quantityMilli")]
    pub quantity: Quantity,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    pub fn key(&self) -> StockKey {
        StockKey::new(&self.ingredient_id, &self.branch_id)
    }

    #[inline]
    pub fn is_short(&self) -> bool {
        self.quantity.is_negative()
    }
}

/// What to do when a deduction would push stock below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StockPolicy {
    /// Let stock go negative and report a shortage.
    #[default]
    AllowNegative,
    /// Reject the whole batch.
    Strict,
}

impl fmt::Display for StockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockPolicy::AllowNegative => write!(f, "allow_negative"),
            StockPolicy::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for StockPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allow_negative" | "allow-negative" | "lenient" => Ok(StockPolicy::AllowNegative),
            "strict" => Ok(StockPolicy::Strict),
            _ => Err(ValidationError::NotAllowed {
                field: "stock policy".to_string(),
                allowed: vec!["allow_negative".into(), "strict".into()],
            }),
        }
    }
}

/// One applied decrement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockChange {
    pub key: StockKey,
    /// Amount removed (positive).
    #[serde(rename = "deductedMilli")]
    pub deducted: Quantity,
    /// Quantity after the decrement.
    #[serde(rename = "remainingMilli")]
    pub remaining: Quantity,
}

/// Result of applying a deduction batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DeductionReport {
    /// Decrements written to existing stock records.
    pub applied: Vec<StockChange>,
    /// Pairs with no stock record; left untouched.
    pub skipped: Vec<StockKey>,
    /// Applied decrements that left stock negative.
    pub shortages: Vec<StockChange>,
}

impl DeductionReport {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.skipped.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
