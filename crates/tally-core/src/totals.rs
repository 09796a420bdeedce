//! # Totals Verification
//!
//! Recomputes line and header totals from their parts and compares them to
//! what the caller supplied.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Line totals                                                            │
//! │    sale             amount      = quantity × rate − item_discount       │
//! │    purchase         total       = quantity × rate                       │
//! │    return           line_total  = return_qty × unit_price               │
//! │                                                                         │
//! │  Header                                                                 │
//! │    subtotal    = Σ supplied line totals                                 │
//! │    grand_total = subtotal − discount + tax                              │
//! │                                                                         │
//! │  |supplied − recomputed| ≤ tolerance   else TotalsMismatch              │
//! │  any step leaves the i64 range         → Overflow                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{line_field, ValidationResult};

/// Compares one supplied figure with its recomputed value.
pub fn check(
    field: impl Into<String>,
    supplied: Money,
    expected: Money,
    tolerance_cents: i64,
) -> ValidationResult<()> {
    if supplied.within(expected, tolerance_cents) {
        Ok(())
    } else {
        Err(ValidationError::TotalsMismatch {
            field: field.into(),
            supplied: supplied.cents(),
            expected: expected.cents(),
        })
    }
}

/// A line's supplied total next to the value derived from its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTotal {
    pub supplied: Money,
    pub computed: Money,
}

/// The four money figures every header carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub grand_total: Money,
}

impl HeaderTotals {
    pub fn new(subtotal: i64, discount: i64, tax: i64, grand_total: i64) -> Self {
        HeaderTotals {
            subtotal: Money::from_cents(subtotal),
            discount: Money::from_cents(discount),
            tax: Money::from_cents(tax),
            grand_total: Money::from_cents(grand_total),
        }
    }

    /// `subtotal − discount + tax`, or `None` if it leaves the `i64` range.
    pub fn expected_grand_total(&self) -> Option<Money> {
        self.subtotal
            .checked_sub(self.discount)?
            .checked_add(self.tax)
    }

    /// Verifies every line, then the subtotal, then the grand total.
    ///
    /// `line_name` is the payload field holding each line's total
    /// (`amount`, `total` or `line_total`).
    pub fn verify(
        &self,
        line_name: &str,
        lines: &[LineTotal],
        tolerance_cents: i64,
    ) -> ValidationResult<()> {
        for (index, line) in lines.iter().enumerate() {
            check(
                line_field(index, line_name),
                line.supplied,
                line.computed,
                tolerance_cents,
            )?;
        }

        let subtotal = lines
            .iter()
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line.supplied))
            .ok_or_else(|| ValidationError::overflow("subtotal"))?;
        check("subtotal", self.subtotal, subtotal, tolerance_cents)?;

        let grand_total = self
            .expected_grand_total()
            .ok_or_else(|| ValidationError::overflow("grand_total"))?;
        check("grand_total", self.grand_total, grand_total, tolerance_cents)
    }
}
