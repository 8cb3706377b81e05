//! # Validation Module
//!
//! Input validation utilities for Galley POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (axum + serde)                                │
//! │  ├── Shape checks (field types, unknown status strings)                │
//! │  └── Rejected with 400 before any handler runs                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Business rules (positive quantities, non-negative prices)         │
//! │  └── Runs before the database transaction opens                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE (ingredient_id, branch_id)                                 │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use galley_core::validation::{validate_id, validate_line_quantity};
//!
//! validate_id("branchId", "b-001").unwrap();
//! validate_line_quantity(2).unwrap();
//! assert!(validate_line_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::quantity::Quantity;
use crate::{MAX_LINE_QUANTITY, MAX_ORDER_LINES, MAX_PRICE_CENTS, MAX_QUANTITY_MILLI};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_ID_LEN: usize = 64;
const MAX_NAME_LEN: usize = 200;
const MAX_UNIT_LEN: usize = 16;
const MAX_REFERENCE_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an entity identifier supplied by a client.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - Letters, digits, hyphens and underscores only
///
/// Identifiers are opaque here: generated ids are UUIDs, but company,
/// branch and menu item ids come from upstream systems.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::required(field));
    }

    if id.len() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LEN,
        });
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates an optional identifier; `None` is accepted.
pub fn validate_optional_id(field: &str, id: Option<&str>) -> ValidationResult<()> {
    match id {
        Some(id) => validate_id(field, id),
        None => Ok(()),
    }
}

/// Validates an ingredient name.
///
/// ## Example
/// ```rust
/// use galley_core::validation::validate_ingredient_name;
///
/// assert!(validate_ingredient_name("Ground beef").is_ok());
/// assert!(validate_ingredient_name("  ").is_err());
/// ```
pub fn validate_ingredient_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a unit of measure (`kg`, `l`, `pcs`, ...).
pub fn validate_unit(unit: &str) -> ValidationResult<()> {
    let unit = unit.trim();

    if unit.is_empty() {
        return Err(ValidationError::required("unit"));
    }

    if unit.len() > MAX_UNIT_LEN {
        return Err(ValidationError::TooLong {
            field: "unit".to_string(),
            max: MAX_UNIT_LEN,
        });
    }

    Ok(())
}

pub fn validate_payment_reference(reference: Option<&str>) -> ValidationResult<()> {
    if let Some(reference) = reference {
        if reference.len() > MAX_REFERENCE_LEN {
            return Err(ValidationError::TooLong {
                field: "reference".to_string(),
                max: MAX_REFERENCE_LEN,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the number of menu items on one order line.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_line_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or line total in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (complimentary items)
/// - Must not exceed MAX_PRICE_CENTS
///
/// ## Example
/// ```rust
/// use galley_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("price", 1099).is_ok());
/// assert!(validate_price_cents("price", 0).is_ok());
/// assert!(validate_price_cents("price", -100).is_err());
/// assert!(validate_price_cents("price", i64::MAX).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::out_of_range(field, 0, MAX_PRICE_CENTS));
    }

    Ok(())
}

/// Validates a rounding adjustment, which may be negative.
pub fn validate_rounding_cents(cents: i64) -> ValidationResult<()> {
    if !(-MAX_PRICE_CENTS..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::out_of_range("rounding", -MAX_PRICE_CENTS, MAX_PRICE_CENTS));
    }

    Ok(())
}

/// Validates a payment amount in cents.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_PRICE_CENTS
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::must_be_positive("amount"));
    }
    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::out_of_range("amount", 1, MAX_PRICE_CENTS));
    }

    Ok(())
}

/// Validates a per-unit recipe amount. Zero or negative amounts would
/// silently add stock on every sale, so they are refused at creation.
pub fn validate_recipe_amount(amount: Quantity) -> ValidationResult<()> {
    validate_positive_quantity("amount", amount)
}

/// Validates a stock addition.
pub fn validate_stock_addition(quantity: Quantity) -> ValidationResult<()> {
    validate_positive_quantity("quantity", quantity)
}

fn validate_positive_quantity(field: &str, quantity: Quantity) -> ValidationResult<()> {
    if !quantity.is_positive() {
        return Err(ValidationError::must_be_positive(field));
    }
    if quantity.milli() > MAX_QUANTITY_MILLI {
        return Err(ValidationError::out_of_range(field, 1, MAX_QUANTITY_MILLI));
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines submitted for one order.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "orderLines".to_string(),
            min: 0,
            max: MAX_ORDER_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("branchId", "b1").is_ok());
        assert!(validate_id("orderId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_id("menuItem_id", "burger_classic").is_ok());

        assert!(validate_id("branchId", "").is_err());
        assert!(validate_id("branchId", "   ").is_err());
        assert!(validate_id("branchId", "has space").is_err());
        assert!(validate_id("branchId", &"a".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_optional_id() {
        assert!(validate_optional_id("waiterId", None).is_ok());
        assert!(validate_optional_id("waiterId", Some("w1")).is_ok());
        assert!(validate_optional_id("waiterId", Some("")).is_err());
    }

    #[test]
    fn test_validate_line_quantity() {
        assert!(validate_line_quantity(1).is_ok());
        assert!(validate_line_quantity(999).is_ok());

        assert!(validate_line_quantity(0).is_err());
        assert!(validate_line_quantity(-1).is_err());
        assert!(validate_line_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents("price", 0).is_ok());
        assert!(validate_price_cents("price", 1099).is_ok());
        assert!(validate_price_cents("price", -1).is_err());
        assert!(validate_price_cents("price", MAX_PRICE_CENTS).is_ok());
        assert!(validate_price_cents("price", MAX_PRICE_CENTS + 1).is_err());
        assert!(validate_price_cents("price", i64::MAX).is_err());
    }

    #[test]
    fn test_validate_rounding_and_payment() {
        assert!(validate_rounding_cents(-3).is_ok());
        assert!(validate_rounding_cents(i64::MIN).is_err());
        assert!(validate_payment_amount(2_897).is_ok());
        assert!(validate_payment_amount(0).is_err());
        assert!(validate_payment_amount(i64::MAX).is_err());
    }

    #[test]
    fn test_validate_recipe_amount() {
        assert!(validate_recipe_amount(Quantity::from_milli(200)).is_ok());
        assert!(validate_recipe_amount(Quantity::zero()).is_err());
        assert!(validate_recipe_amount(Quantity::from_milli(-5)).is_err());
        assert!(validate_recipe_amount(Quantity::from_milli(MAX_QUANTITY_MILLI)).is_ok());
        assert!(validate_recipe_amount(Quantity::from_milli(i64::MAX / 2 + 1)).is_err());
    }

    #[test]
    fn test_validate_stock_addition() {
        assert!(validate_stock_addition(Quantity::from_milli(2_500)).is_ok());
        assert!(validate_stock_addition(Quantity::zero()).is_err());
        assert!(validate_stock_addition(Quantity::from_milli(MAX_QUANTITY_MILLI + 1)).is_err());
    }

    #[test]
    fn test_validate_names() {
        assert!(validate_ingredient_name("Potato").is_ok());
        assert!(validate_ingredient_name(&"x".repeat(201)).is_err());
        assert!(validate_unit("kg").is_ok());
        assert!(validate_unit("").is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(0).is_ok());
        assert!(validate_line_count(MAX_ORDER_LINES).is_ok());
        assert!(validate_line_count(MAX_ORDER_LINES + 1).is_err());
    }
}
