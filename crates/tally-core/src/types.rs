//! # Domain Types
//!
//! Catalog types and the enums shared by every transaction type.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │ TransactionKind │   │  PaymentStatus  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (integer)   │   │  Sale      -    │   │  Pending        │       │
//! │  │  sku (unique)   │   │  Purchase  +    │   │  Partial        │       │
//! │  │  stock (signed) │   │  SaleReturn +   │   │  Paid           │       │
//! │  │  price_cents    │   │  PurchaseReturn-│   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ ProductStatus   │   │  ReturnStatus   │   │ Category /      │       │
//! │  │  Active         │   │  Pending        │   │ SubCategory     │       │
//! │  │  Inactive       │   │  Completed      │   │ (lookup labels) │       │
//! │  └─────────────────┘   │  Rejected       │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Transactions have a surrogate integer `id` and a business identifier
//! (`SALE-1718000000000`). Line items and every public operation use the
//! business identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// Whether a product is offered for sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

/// A catalog product.
///
/// Category, sub-category, brand, unit and supplier are denormalized labels,
/// not foreign keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    /// Alternate display name (e.g. local-language label).
    pub secondary_name: Option<String>,
    pub category: String,
    pub sub_category: String,
    pub brand: String,
    pub unit: String,
    pub supplier: String,
    pub status: ProductStatus,
    /// Current stock. Negative values mean oversold / backordered.
    pub stock: i64,
    /// Catalog price in minor units. Overwritten by every purchase line.
    pub price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Zero or negative stock is shown as "out of stock"; it is never rejected.
    #[inline]
    pub fn is_out_of_stock(&self) -> bool {
        self.stock <= 0
    }
}

/// Payload for creating a product.
///
/// A missing SKU is generated as `PRD` + zero-padded sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct NewProduct {
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub name: String,
    pub secondary_name: Option<String>,
    pub category: String,
    pub sub_category: String,
    pub brand: String,
    pub unit: String,
    pub supplier: String,
    pub status: ProductStatus,
    /// Opening stock.
    pub stock: i64,
    pub price_cents: i64,
}

/// Editable product details. Stock is deliberately absent: it only moves
/// through posted transactions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct ProductUpdate {
    pub barcode: Option<String>,
    pub name: String,
    pub secondary_name: Option<String>,
    pub category: String,
    pub sub_category: String,
    pub brand: String,
    pub unit: String,
    pub supplier: String,
    pub status: ProductStatus,
    pub price_cents: i64,
}

// =============================================================================
// Category Lookups
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SubCategory {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
}

// =============================================================================
// Transaction Kind
// =============================================================================

/// The four transaction types that move stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TransactionKind {
    Sale,
    Purchase,
    SaleReturn,
    PurchaseReturn,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 4] = [
        TransactionKind::Sale,
        TransactionKind::Purchase,
        TransactionKind::SaleReturn,
        TransactionKind::PurchaseReturn,
    ];

    /// Prefix of generated business identifiers.
    pub const fn prefix(&self) -> &'static str {
        match self {
            TransactionKind::Sale => "SALE",
            TransactionKind::Purchase => "PUR",
            TransactionKind::SaleReturn => "SR",
            TransactionKind::PurchaseReturn => "PR",
        }
    }

    /// Sign applied to a line's quantity when the transaction is posted.
    ///
    /// ```text
    /// Sale            -1   goods leave the shelf
    /// Purchase        +1   goods arrive
    /// SaleReturn      +1   sold goods come back
    /// PurchaseReturn  -1   goods go back to the supplier
    /// ```
    ///
    /// Reversal always uses the opposite sign.
    pub const fn posting_sign(&self) -> i64 {
        match self {
            TransactionKind::Sale | TransactionKind::PurchaseReturn => -1,
            TransactionKind::Purchase | TransactionKind::SaleReturn => 1,
        }
    }

    /// Builds `<PREFIX>-<epochMillis>`.
    ///
    /// Two postings of the same kind within one millisecond collide; the
    /// second fails with a unique violation and the caller must resubmit.
    pub fn business_id_at(&self, at: DateTime<Utc>) -> String {
        format!("{}-{}", self.prefix(), at.timestamp_millis())
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionKind::Sale => "Sale",
            TransactionKind::Purchase => "Purchase",
            TransactionKind::SaleReturn => "Sale return",
            TransactionKind::PurchaseReturn => "Purchase return",
        };
        f.write_str(label)
    }
}

// =============================================================================
// Statuses
// =============================================================================

/// Purchase payment state. Informational only, never affects stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// `Paid` if paid ≥ total, `Partial` if 0 < paid < total, else `Pending`.
    pub fn from_amounts(amount_paid: Money, grand_total: Money) -> Self {
        if amount_paid >= grand_total {
            PaymentStatus::Paid
        } else if amount_paid.cents() > 0 {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        }
    }
}

/// Processing state of a sale or purchase return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum ReturnStatus {
    #[default]
    Pending,
    Completed,
    Rejected,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_posting_signs() {
        assert_eq!(TransactionKind::Sale.posting_sign(), -1);
        assert_eq!(TransactionKind::Purchase.posting_sign(), 1);
        assert_eq!(TransactionKind::SaleReturn.posting_sign(), 1);
        assert_eq!(TransactionKind::PurchaseReturn.posting_sign(), -1);
    }

    #[test]
    fn test_business_id_format() {
        let at = Utc.timestamp_millis_opt(1_718_000_000_123).unwrap();
        assert_eq!(
            TransactionKind::Sale.business_id_at(at),
            "SALE-1718000000123"
        );
        assert_eq!(
            TransactionKind::PurchaseReturn.business_id_at(at),
            "PR-1718000000123"
        );
    }

    #[test]
    fn test_payment_status_from_amounts() {
        let total = Money::from_cents(1000);
        assert_eq!(
            PaymentStatus::from_amounts(Money::from_cents(1000), total),
            PaymentStatus::Paid
        );
        assert_eq!(
            PaymentStatus::from_amounts(Money::from_cents(1500), total),
            PaymentStatus::Paid
        );
        assert_eq!(
            PaymentStatus::from_amounts(Money::from_cents(1), total),
            PaymentStatus::Partial
        );
        assert_eq!(
            PaymentStatus::from_amounts(Money::zero(), total),
            PaymentStatus::Pending
        );
        // A zero-total purchase is settled by definition.
        assert_eq!(
            PaymentStatus::from_amounts(Money::zero(), Money::zero()),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ProductStatus::default(), ProductStatus::Active);
        assert_eq!(ReturnStatus::default(), ReturnStatus::Pending);
    }
}
