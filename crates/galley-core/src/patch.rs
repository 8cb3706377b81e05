//! # Order Patches
//!
//! Typed partial updates for orders and the line reconciliation plan.
//!
//! ## Line Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Submitted orderLines                                                   │
//! │                                                                         │
//! │   [{id:"l1", qty:3}, {menuItemId:"fries", qty:1}, {id:"l2", qty:1}]     │
//! │        │                      │                        │                │
//! │        ▼                      ▼                        ▼                │
//! │   partition_lines() ─── has id? ──► updates ◄──────────┘                │
//! │                          no id  ──► inserts (fresh UUID at write time)  │
//! │                                                                         │
//! │   check_against(persisted ids)                                          │
//! │     every update id must belong to the order, else the whole           │
//! │     reconciliation aborts with OrderLineNotFound                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persisted lines that are not mentioned are left untouched; removing a
//! line is not part of an update.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::cache_keys::CacheScope;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::status::OrderStatus;
use crate::validation::{
    validate_id, validate_line_count, validate_line_quantity, validate_optional_id,
    validate_price_cents, validate_rounding_cents, ValidationResult,
};

// =============================================================================
// Line Patch
// =============================================================================

/// One submitted order line. `id` present means "edit this persisted line".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LinePatch {
    #[serde(default)]
    pub id: Option<String>,
    pub menu_item_id: String,
    pub quantity: i64,
    #[serde(rename = "price")]
    pub unit_price_cents: i64,
    /// Computed as `price × quantity` when absent.
    #[serde(rename = "totalPrice", default)]
    pub line_total_cents: Option<i64>,
}

impl LinePatch {
    pub fn new(menu_item_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        LinePatch {
            id: None,
            menu_item_id: menu_item_id.into(),
            quantity,
            unit_price_cents,
            line_total_cents: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The supplied `totalPrice`, or `price × quantity`.
    ///
    /// Fails with `OutOfRange` when the product overflows or exceeds
    /// [`MAX_PRICE_CENTS`](crate::MAX_PRICE_CENTS).
    pub fn line_total(&self) -> ValidationResult<Money> {
        let total = match self.line_total_cents {
            Some(cents) => Money::from_cents(cents),
            None => Money::from_cents(self.unit_price_cents)
                .checked_multiply_quantity(self.quantity)
                .ok_or_else(|| ValidationError::out_of_range("totalPrice", 0, crate::MAX_PRICE_CENTS))?,
        };
        validate_price_cents("totalPrice", total.cents())?;
        Ok(total)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(id) = &self.id {
            validate_id("orderLines.id", id)?;
        }
        validate_id("menuItemId", &self.menu_item_id)?;
        validate_line_quantity(self.quantity)?;
        validate_price_cents("price", self.unit_price_cents)?;
        self.line_total()?;
        Ok(())
    }
}

/// An in-place edit of a persisted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineUpdate {
    pub id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

/// A line to insert with a freshly generated id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLine {
    pub menu_item_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl TryFrom<&LinePatch> for NewLine {
    type Error = ValidationError;

    fn try_from(line: &LinePatch) -> ValidationResult<Self> {
        Ok(NewLine {
            menu_item_id: line.menu_item_id.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price_cents,
            line_total_cents: line.line_total()?.cents(),
        })
    }
}

/// Sum of line totals. Fails with `OutOfRange` on overflow.
pub fn sum_line_totals(lines: &[NewLine]) -> ValidationResult<Money> {
    lines.iter().try_fold(Money::zero(), |acc, line| {
        acc.checked_add(Money::from_cents(line.line_total_cents))
            .ok_or_else(|| ValidationError::out_of_range("totalPrice", 0, i64::MAX))
    })
}

/// Submitted lines split into edits and inserts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinePlan {
    pub updates: Vec<LineUpdate>,
    pub inserts: Vec<NewLine>,
}

impl LinePlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty()
    }

    /// Fails on the first update whose id is not among `persisted_ids`.
    ///
    /// Run before any write so a stale id leaves the order untouched.
    pub fn check_against<'a, I>(&self, order_id: &str, persisted_ids: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let known: HashSet<&str> = persisted_ids.into_iter().collect();
        match self.updates.iter().find(|u| !known.contains(u.id.as_str())) {
            Some(missing) => Err(CoreError::OrderLineNotFound {
                order_id: order_id.to_string(),
                line_id: missing.id.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Validates submitted lines and partitions them by presence of `id`.
///
/// ## Errors
/// - Any line failing [`LinePatch::validate`]
/// - The same id submitted twice (`ValidationError::Duplicate`)
pub fn partition_lines(lines: &[LinePatch]) -> ValidationResult<LinePlan> {
    validate_line_count(lines.len())?;

    let mut plan = LinePlan::default();
    let mut seen = HashSet::new();

    for line in lines {
        line.validate()?;
        match &line.id {
            Some(id) => {
                if !seen.insert(id.as_str()) {
                    return Err(ValidationError::Duplicate {
                        field: "orderLines.id".to_string(),
                        value: id.clone(),
                    });
                }
                plan.updates.push(LineUpdate {
                    id: id.clone(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price_cents,
                    line_total_cents: line.line_total()?.cents(),
                });
            }
            None => plan.inserts.push(NewLine::try_from(line)?),
        }
    }

    Ok(plan)
}

// =============================================================================
// Order Patch
// =============================================================================

/// A partial order update. Absent fields are left as stored.
///
/// `branchId` / `companyId` / `waiterId` (the [`CacheScope`]) only select
/// which cache keys go stale; they never move the order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderPatch {
    #[serde(rename = "totalPrice", default)]
    pub subtotal_cents: Option<i64>,
    #[serde(rename = "discount", default)]
    pub discount_cents: Option<i64>,
    #[serde(rename = "rounding", default)]
    pub rounding_cents: Option<i64>,
    #[serde(rename = "finalPrice", default)]
    pub total_cents: Option<i64>,
    #[serde(rename = "orderStatus", default, deserialize_with = "deserialize_status")]
    pub status: Option<OrderStatus>,
    #[serde(rename = "orderLines", default)]
    pub lines: Option<Vec<LinePatch>>,
    #[serde(flatten)]
    pub scope: CacheScope,
}

/// Accepts status text in any case; unknown values fail deserialization.
fn deserialize_status<'de, D>(deserializer: D) -> Result<Option<OrderStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| s.parse::<OrderStatus>().map_err(serde::de::Error::custom))
        .transpose()
}

impl OrderPatch {
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_lines(mut self, lines: Vec<LinePatch>) -> Self {
        self.lines = Some(lines);
        self
    }

    /// True when the patch writes no order field and no line.
    pub fn is_noop(&self) -> bool {
        self.subtotal_cents.is_none()
            && self.discount_cents.is_none()
            && self.rounding_cents.is_none()
            && self.total_cents.is_none()
            && self.status.is_none()
            && self.lines.as_ref().map_or(true, |l| l.is_empty())
    }

    /// Validates money fields and scope, then partitions the lines.
    ///
    /// Rounding may be negative; every other amount must not be.
    pub fn validate(&self) -> ValidationResult<LinePlan> {
        if let Some(cents) = self.subtotal_cents {
            validate_price_cents("totalPrice", cents)?;
        }
        if let Some(cents) = self.discount_cents {
            validate_price_cents("discount", cents)?;
        }
        if let Some(cents) = self.rounding_cents {
            validate_rounding_cents(cents)?;
        }
        if let Some(cents) = self.total_cents {
            validate_price_cents("finalPrice", cents)?;
        }
        self.scope.validate()?;

        match &self.lines {
            Some(lines) => partition_lines(lines),
            None => Ok(LinePlan::default()),
        }
    }
}

// =============================================================================
// New Order
// =============================================================================

/// Input for creating an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewOrder {
    pub company_id: String,
    pub branch_id: String,
    #[serde(default)]
    pub waiter_id: Option<String>,
    #[serde(rename = "discount", default)]
    pub discount_cents: i64,
    #[serde(rename = "rounding", default)]
    pub rounding_cents: i64,
    #[serde(rename = "orderLines", default)]
    pub lines: Vec<LinePatch>,
}

impl NewOrder {
    /// Validates the order and returns its lines ready for insertion.
    ///
    /// Lines on a new order cannot reference persisted ids.
    pub fn validate(&self) -> ValidationResult<Vec<NewLine>> {
        validate_id("companyId", &self.company_id)?;
        validate_id("branchId", &self.branch_id)?;
        validate_optional_id("waiterId", self.waiter_id.as_deref())?;
        validate_price_cents("discount", self.discount_cents)?;
        validate_rounding_cents(self.rounding_cents)?;

        let plan = partition_lines(&self.lines)?;
        if let Some(update) = plan.updates.first() {
            return Err(ValidationError::InvalidFormat {
                field: "orderLines.id".to_string(),
                reason: format!("new orders cannot reference line {}", update.id),
            });
        }
        Ok(plan.inserts)
    }

    /// Subtotal and payable total of `lines` (as returned by
    /// [`NewOrder::validate`]) under this order's discount and rounding.
    pub fn totals(&self, lines: &[NewLine]) -> ValidationResult<(Money, Money)> {
        let subtotal = sum_line_totals(lines)?;
        let total = Money::checked_payable(
            subtotal,
            Money::from_cents(self.discount_cents),
            Money::from_cents(self.rounding_cents),
        )
        .ok_or_else(|| ValidationError::out_of_range("finalPrice", i64::MIN, i64::MAX))?;
        Ok((subtotal, total))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
