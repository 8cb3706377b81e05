//! # Quantity Module
//!
//! Fixed-point ingredient quantities.
//!
//! ## Why Thousandths?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Recipes consume fractions: 0.2 kg beef per burger, 0.15 kg potato     │
//! │  per fries. Floats drift when thousands of orders are netted:          │
//! │                                                                         │
//! │    0.15 × 3 = 0.44999999999999996  ❌                                  │
//! │                                                                         │
//! │  Quantity stores integer thousandths of the ingredient's unit:         │
//! │                                                                         │
//! │    150 × 3 = 450  → "0.450"  ✅                                        │
//! │                                                                         │
//! │  Same trick as Money (cents), one more digit of precision.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use galley_core::quantity::Quantity;
//!
//! let beef_per_burger: Quantity = "0.2".parse().unwrap();
//! let two = beef_per_burger.checked_times(2).unwrap();
//! assert_eq!(two.milli(), 400);
//! assert_eq!(two.to_string(), "0.400");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// Scale factor: one whole unit is 1000 milli-units.
pub const MILLI_PER_UNIT: i64 = 1000;

/// A signed ingredient quantity in thousandths of its unit.
///
/// Signed because stock may run negative under the allow-negative policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Whole units (e.g. 2 buns).
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * MILLI_PER_UNIT)
    }

    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Scales a per-unit amount by the number of menu items sold.
    /// `None` on overflow.
    #[inline]
    pub const fn checked_times(&self, count: i64) -> Option<Self> {
        match self.0.checked_mul(count) {
            Some(milli) => Some(Quantity(milli)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(&self, other: Quantity) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(milli) => Some(Quantity(milli)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_sub(&self, other: Quantity) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(milli) => Some(Quantity(milli)),
            None => None,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(
            f,
            "{}{}.{:03}",
            sign,
            abs / MILLI_PER_UNIT as u64,
            abs % MILLI_PER_UNIT as u64
        )
    }
}

/// Parses decimal text with at most three fractional digits.
///
/// ## Accepted
/// `"2"`, `"0.2"`, `"0.15"`, `"-1.5"`, `"12.345"`
///
/// ## Rejected
/// `""`, `"1.2345"` (too precise), `"abc"`, `"1.2.3"`
impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::required("quantity"));
        }

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("no digits"));
        }
        if fraction.len() > 3 {
            return Err(invalid("at most 3 decimal places"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("not a decimal number"));
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("number too large"))?
        };
        let fraction_value: i64 = if fraction.is_empty() {
            0
        } else {
            // "15" → 150, "2" → 200
            format!("{:0<3}", fraction)
                .parse()
                .map_err(|_| invalid("not a decimal number"))?
        };

        let milli = whole_value
            .checked_mul(MILLI_PER_UNIT)
            .and_then(|w| w.checked_add(fraction_value))
            .ok_or_else(|| invalid("number too large"))?;

        Ok(Quantity(if negative { -milli } else { milli }))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::zero()
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_text() {
        assert_eq!("2".parse::<Quantity>().unwrap().milli(), 2000);
        assert_eq!("0.2".parse::<Quantity>().unwrap().milli(), 200);
        assert_eq!("0.15".parse::<Quantity>().unwrap().milli(), 150);
        assert_eq!(".5".parse::<Quantity>().unwrap().milli(), 500);
        assert_eq!("-1.5".parse::<Quantity>().unwrap().milli(), -1500);
        assert_eq!("12.345".parse::<Quantity>().unwrap().milli(), 12_345);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Quantity>().is_err());
        assert!("1.2345".parse::<Quantity>().is_err());
        assert!("abc".parse::<Quantity>().is_err());
        assert!("1.2.3".parse::<Quantity>().is_err());
        assert!(".".parse::<Quantity>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Quantity::from_milli(450).to_string(), "0.450");
        assert_eq!(Quantity::from_units(2).to_string(), "2.000");
        assert_eq!(Quantity::from_milli(-250).to_string(), "-0.250");
    }

    /// 0.15 × 3 must be exactly 0.45, the case floats get wrong.
    #[test]
    fn test_scaling_is_exact() {
        let potato = Quantity::from_milli(150);
        assert_eq!(potato.checked_times(3), Some(Quantity::from_milli(450)));
    }

    #[test]
    fn test_checked_arithmetic_overflow() {
        let huge = Quantity::from_milli(i64::MAX / 2 + 1);
        assert_eq!(huge.checked_times(2), None);
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!(Quantity::from_milli(i64::MIN).checked_sub(Quantity::from_milli(1)), None);
        assert_eq!(
            Quantity::from_milli(300).checked_sub(Quantity::from_milli(450)),
            Some(Quantity::from_milli(-150))
        );
    }

    #[test]
    fn test_arithmetic() {
        let mut total = Quantity::zero();
        total += Quantity::from_milli(400);
        total += Quantity::from_milli(200);
        assert_eq!(total.milli(), 600);
        assert_eq!((total - Quantity::from_units(1)).milli(), -400);
        assert_eq!((-total).milli(), -600);
    }
}
