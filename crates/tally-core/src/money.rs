//! # Money Module
//!
//! The `Money` type used for every price, line total and header total.
//!
//! ## Minor Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Stored:   price_cents = 1299                                           │
//! │  Meaning:  12.99 in the store's single currency                         │
//! │                                                                         │
//! │  Line:     rate 1299 × quantity 3 = 3897                                │
//! │  Header:   subtotal 3897 − discount 97 + tax 0 = 3800                   │
//! │                                                                         │
//! │  No floating point anywhere between the payload and the database.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let rate = Money::from_cents(1299);
//! let line = rate.multiply_quantity(3);
//! assert_eq!(line.cents(), 3897);
//! assert_eq!(line.to_string(), "38.97");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

/// A monetary amount in minor units (cents).
///
/// Signed so that discounts and over-payments can be expressed directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit amount by a quantity, saturating at the `i64` bounds.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(250).multiply_quantity(4).cents(), 1000);
    /// assert_eq!(Money::from_cents(i64::MAX / 2).multiply_quantity(3).cents(), i64::MAX);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// `self × qty`, or `None` when the product does not fit in minor units.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_sub(&self, other: Money) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Clamps negative amounts to zero (e.g. balance due after over-payment).
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Returns true when `self` and `other` differ by at most `tolerance_cents`.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let supplied = Money::from_cents(1001);
    /// assert!(supplied.within(Money::from_cents(1000), 1));
    /// assert!(!supplied.within(Money::from_cents(1000), 0));
    /// ```
    pub fn within(&self, other: Money, tolerance_cents: i64) -> bool {
        self.0.abs_diff(other.0) <= tolerance_cents.unsigned_abs()
    }
}

// =============================================================================
// Operators
// =============================================================================
//
// The operators saturate. Totals verification uses the `checked_*` forms so
// an out-of-range payload is reported instead of clamped.

/// Plain decimal rendering (`"12.99"`, `"-5.50"`); currency symbols are the
/// UI's job.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts() {
        let money = Money::from_cents(1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);

        let negative = Money::from_cents(-550);
        assert_eq!(negative.major(), -5);
        assert_eq!(negative.minor(), 50);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);

        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);
        assert_eq!((b * 3).cents(), 750);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 1500);
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let big = Money::from_cents(i64::MAX / 2);

        assert_eq!(big.checked_multiply_quantity(2), Some(Money::from_cents(i64::MAX - 1)));
        assert_eq!(big.checked_multiply_quantity(3), None);
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(5).checked_sub(Money::from_cents(7)),
            Some(Money::from_cents(-2))
        );
    }

    #[test]
    fn test_operators_saturate() {
        let max = Money::from_cents(i64::MAX);

        assert_eq!(max + Money::from_cents(1), max);
        let min = Money::from_cents(i64::MIN);
        assert_eq!(min - Money::from_cents(1), min);
        assert_eq!(max * 2, max);

        let total: Money = vec![max, max].into_iter().sum();
        assert_eq!(total, max);
    }

    #[test]
    fn test_within_at_extremes() {
        let max = Money::from_cents(i64::MAX);
        let min = Money::from_cents(i64::MIN);

        assert!(!max.within(min, 1));
        assert!(max.within(max, 0));
        assert!(Money::from_cents(10).within(Money::from_cents(11), i64::MIN));
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(Money::from_cents(-10).non_negative(), Money::zero());
        assert_eq!(Money::from_cents(10).non_negative().cents(), 10);
    }

    #[test]
    fn test_serializes_as_plain_integer() {
        let json = serde_json::to_string(&Money::from_cents(1299)).unwrap();
        assert_eq!(json, "1299");
    }
}
