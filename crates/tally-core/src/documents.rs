//! # Transaction Documents
//!
//! Stored header and line-item rows for the four transaction types.
//!
//! ## Header / Line Layout
//! ```text
//! ┌──────────────────────────┐        ┌──────────────────────────────┐
//! │ sales                    │ 1    N │ sale_items                   │
//! │ ──────────────────────── │───────►│ ──────────────────────────── │
//! │ id        (surrogate)    │        │ sale_id  (FK, ON DELETE      │
//! │ sale_id   (business key) │        │           CASCADE)           │
//! │ totals, counterparty     │        │ item_id  (nullable product)  │
//! └──────────────────────────┘        └──────────────────────────────┘
//!
//! Same shape for purchases, sale_returns and purchase_returns.
//! ```
//!
//! Every row is re-read from the store after posting, so callers see
//! server-assigned values (`id`, `created_at`, generated business id).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ledger::StockLine;
use crate::money::Money;
use crate::types::{PaymentStatus, ReturnStatus};

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    pub sale_id: String,
    #[ts(as = "String")]
    pub sale_date: NaiveDate,
    #[ts(as = "String")]
    pub sale_time: NaiveTime,
    pub customer_name: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub grand_total_cents: i64,
    pub payment_method: String,
    pub amount_received_cents: i64,
    pub change_due_cents: i64,
    pub sold_by: String,
    pub notes: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: String,
    /// Catalog product, or `None` for a free-text line.
    pub item_id: Option<i64>,
    pub product_name: String,
    pub barcode: String,
    /// Retail / wholesale / loose etc. Free text.
    pub sale_type: String,
    pub quantity: i64,
    pub unit: String,
    pub rate_per_unit_cents: i64,
    pub amount_cents: i64,
    pub item_discount_cents: i64,
}

impl StockLine for SaleItem {
    fn product_id(&self) -> Option<i64> {
        self.item_id
    }

    fn stock_quantity(&self) -> i64 {
        self.quantity
    }
}

// =============================================================================
// Purchase
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: i64,
    pub purchase_id: String,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    pub supplier_name: String,
    pub invoice_number: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub grand_total_cents: i64,
    pub amount_paid_cents: i64,
    pub balance_due_cents: i64,
    pub payment_status: PaymentStatus,
    pub notes: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseItem {
    pub id: i64,
    pub purchase_id: String,
    pub item_id: Option<i64>,
    pub product_name: String,
    /// Ordered quantity.
    pub quantity: i64,
    /// Quantity actually received; this is what moves stock.
    pub received_qty: Option<i64>,
    pub unit: String,
    pub rate_cents: i64,
    pub purchase_price_cents: i64,
    pub sale_price_cents: Option<i64>,
    pub total_cents: i64,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
}

impl StockLine for PurchaseItem {
    fn product_id(&self) -> Option<i64> {
        self.item_id
    }

    /// Rows written before `received_qty` was recorded fall back to the
    /// ordered quantity.
    fn stock_quantity(&self) -> i64 {
        self.received_qty.unwrap_or(self.quantity)
    }
}

// =============================================================================
// Returns
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleReturn {
    pub id: i64,
    pub return_id: String,
    /// Business id of the original sale, if known.
    pub sale_id: String,
    #[ts(as = "String")]
    pub return_date: NaiveDate,
    pub customer_name: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub grand_total_cents: i64,
    pub reason: String,
    pub status: ReturnStatus,
    pub notes: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseReturn {
    pub id: i64,
    pub return_id: String,
    /// Business id of the original purchase, if known.
    pub purchase_id: String,
    #[ts(as = "String")]
    pub return_date: NaiveDate,
    pub supplier_name: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub grand_total_cents: i64,
    pub reason: String,
    pub status: ReturnStatus,
    pub notes: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Line of a sale return or purchase return (both tables share the layout).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReturnItem {
    pub id: i64,
    pub return_id: String,
    pub item_id: Option<i64>,
    pub product_name: String,
    pub return_qty: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    /// e.g. "Good", "Damaged", "Expired".
    pub item_condition: String,
}

impl StockLine for ReturnItem {
    fn product_id(&self) -> Option<i64> {
        self.item_id
    }

    fn stock_quantity(&self) -> i64 {
        self.return_qty
    }
}

// =============================================================================
// Read / Reversal Results
// =============================================================================

/// A header merged with its line items.
///
/// Serializes flat: `{ "sale_id": "...", ..., "items": [ ... ] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionWithItems<H, L> {
    #[serde(flatten)]
    pub header: H,
    pub items: Vec<L>,
}

impl<H, L> TransactionWithItems<H, L> {
    pub fn new(header: H, items: Vec<L>) -> Self {
        TransactionWithItems { header, items }
    }
}

pub type SaleWithItems = TransactionWithItems<Sale, SaleItem>;
pub type PurchaseWithItems = TransactionWithItems<Purchase, PurchaseItem>;
pub type SaleReturnWithItems = TransactionWithItems<SaleReturn, ReturnItem>;
pub type PurchaseReturnWithItems = TransactionWithItems<PurchaseReturn, ReturnItem>;

/// Outcome of deleting a posted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReversalSummary {
    pub business_id: String,
    /// Line items removed by the cascade.
    pub lines_removed: usize,
    /// Lines whose product stock was restored (free-text lines excluded).
    pub stock_movements: usize,
}
