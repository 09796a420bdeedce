//! # Posting Payloads
//!
//! Typed input for the four posters. Every field except the line list has a
//! default, so a minimal JSON payload deserializes:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Payload field            Missing value becomes                         │
//! │  ───────────────────────  ─────────────────────────────────────────     │
//! │  business id              <PREFIX>-<epochMillis> at posting time        │
//! │  dates / sale_time        today / now (UTC)                             │
//! │  money (`*_cents`)        0                                             │
//! │  text                     ""                                            │
//! │  return status            Pending                                       │
//! │  purchase payment_status  derived from amount_paid vs grand_total       │
//! │  purchase quantity        received_qty, then 0                          │
//! │  purchase received_qty    quantity, then 0                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::input::{NewSale, Posting};
//! use tally_core::ledger::LedgerSettings;
//!
//! let sale: NewSale = serde_json::from_str(
//!     r#"{ "items": [ { "item_id": 7, "quantity": 3 } ] }"#,
//! ).unwrap();
//!
//! assert!(sale.validate(&LedgerSettings::default()).is_ok());
//! assert_eq!(sale.lines()[0].quantity, 3);
//! ```

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::ledger::{LedgerSettings, StockLine};
use crate::money::Money;
use crate::totals::{HeaderTotals, LineTotal};
use crate::types::{PaymentStatus, ReturnStatus, TransactionKind};
use crate::validation::{
    line_field, validate_amount, validate_business_id, validate_counterparty,
    validate_line_name, validate_max_len, validate_non_negative, validate_positive_quantity,
    ValidationResult, MAX_NAME_LEN,
};

// =============================================================================
// Posting Trait
// =============================================================================

/// What the posters need from every payload.
pub trait Posting {
    /// Line item payload type.
    type Line: StockLine;

    const KIND: TransactionKind;

    /// Caller-supplied business identifier, if any.
    fn business_id(&self) -> Option<&str>;

    fn lines(&self) -> &[Self::Line];

    /// Checks everything that can be checked without the database.
    fn validate(&self, settings: &LedgerSettings) -> ValidationResult<()>;

    /// The supplied identifier, or `<PREFIX>-<epochMillis>` for `now`.
    fn resolve_business_id(&self, now: DateTime<Utc>) -> String {
        match self.business_id() {
            Some(id) => id.to_string(),
            None => Self::KIND.business_id_at(now),
        }
    }
}

fn validate_supplied_id(field: &str, id: Option<&str>) -> ValidationResult<()> {
    match id {
        Some(id) => validate_business_id(field, id),
        None => Ok(()),
    }
}

fn validate_header_amounts(totals: &HeaderTotals) -> ValidationResult<()> {
    validate_amount("discount_cents", totals.discount.cents())?;
    validate_amount("tax_cents", totals.tax.cents())
}

/// Pairs each line's supplied total with its recomputed one.
///
/// `parts` returns `(supplied_cents, computed)`; a `None` computed value is
/// reported as an overflow on `items[i].<line_name>`.
fn line_totals<T>(
    line_name: &str,
    items: &[T],
    parts: impl Fn(&T) -> (i64, Option<Money>),
) -> ValidationResult<Vec<LineTotal>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let (supplied, computed) = parts(item);
            let computed =
                computed.ok_or_else(|| ValidationError::overflow(line_field(i, line_name)))?;
            Ok(LineTotal {
                supplied: Money::from_cents(supplied),
                computed,
            })
        })
        .collect()
}

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct NewSale {
    pub sale_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub sale_date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub sale_time: Option<NaiveTime>,
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
    pub items: Vec<NewSaleItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct NewSaleItem {
    pub item_id: Option<i64>,
    pub product_name: String,
    pub barcode: String,
    pub sale_type: String,
    pub quantity: i64,
    pub unit: String,
    pub rate_per_unit_cents: i64,
    pub amount_cents: i64,
    pub item_discount_cents: i64,
}

impl NewSaleItem {
    /// `quantity × rate − item_discount`, `None` on overflow.
    pub fn computed_amount(&self) -> Option<Money> {
        Money::from_cents(self.rate_per_unit_cents)
            .checked_multiply_quantity(self.quantity)?
            .checked_sub(Money::from_cents(self.item_discount_cents))
    }
}

impl StockLine for NewSaleItem {
    fn product_id(&self) -> Option<i64> {
        self.item_id
    }

    fn stock_quantity(&self) -> i64 {
        self.quantity
    }
}

impl NewSale {
    pub fn totals(&self) -> HeaderTotals {
        HeaderTotals::new(
            self.subtotal_cents,
            self.discount_cents,
            self.tax_cents,
            self.grand_total_cents,
        )
    }
}

impl Posting for NewSale {
    type Line = NewSaleItem;

    const KIND: TransactionKind = TransactionKind::Sale;

    fn business_id(&self) -> Option<&str> {
        self.sale_id.as_deref()
    }

    fn lines(&self) -> &[NewSaleItem] {
        &self.items
    }

    fn validate(&self, settings: &LedgerSettings) -> ValidationResult<()> {
        validate_supplied_id("sale_id", self.business_id())?;
        validate_max_len("customer_name", &self.customer_name, MAX_NAME_LEN)?;
        validate_header_amounts(&self.totals())?;
        validate_amount("amount_received_cents", self.amount_received_cents)?;

        for (i, item) in self.items.iter().enumerate() {
            validate_line_name(&line_field(i, "product_name"), item.item_id, &item.product_name)?;
            validate_positive_quantity(&line_field(i, "quantity"), item.quantity)?;
            validate_amount(&line_field(i, "rate_per_unit_cents"), item.rate_per_unit_cents)?;
            validate_amount(&line_field(i, "item_discount_cents"), item.item_discount_cents)?;
        }

        if settings.verify_totals {
            let lines = line_totals("amount_cents", &self.items, |item| {
                (item.amount_cents, item.computed_amount())
            })?;
            self.totals()
                .verify("amount_cents", &lines, settings.totals_tolerance_cents)?;
        }

        Ok(())
    }
}

// =============================================================================
// Purchase
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct NewPurchase {
    pub purchase_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub purchase_date: Option<NaiveDate>,
    pub supplier_name: String,
    pub invoice_number: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub grand_total_cents: i64,
    pub amount_paid_cents: i64,
    pub notes: String,
    pub items: Vec<NewPurchaseItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct NewPurchaseItem {
    pub item_id: Option<i64>,
    pub product_name: String,
    /// Ordered quantity.
    pub quantity: Option<i64>,
    /// Quantity received into stock.
    pub received_qty: Option<i64>,
    pub unit: String,
    pub rate_cents: i64,
    pub purchase_price_cents: i64,
    pub sale_price_cents: Option<i64>,
    pub total_cents: i64,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
}

impl NewPurchaseItem {
    pub fn resolved_quantity(&self) -> i64 {
        self.quantity.or(self.received_qty).unwrap_or(0)
    }

    pub fn resolved_received_qty(&self) -> i64 {
        self.received_qty.or(self.quantity).unwrap_or(0)
    }

    /// Catalog price after this line posts: sale price if given, else cost.
    pub fn new_price_cents(&self) -> i64 {
        self.sale_price_cents.unwrap_or(self.purchase_price_cents)
    }

    /// `quantity × rate`, `None` on overflow.
    pub fn computed_total(&self) -> Option<Money> {
        Money::from_cents(self.rate_cents).checked_multiply_quantity(self.resolved_quantity())
    }
}

impl StockLine for NewPurchaseItem {
    fn product_id(&self) -> Option<i64> {
        self.item_id
    }

    fn stock_quantity(&self) -> i64 {
        self.resolved_received_qty()
    }
}

impl NewPurchase {
    pub fn totals(&self) -> HeaderTotals {
        HeaderTotals::new(
            self.subtotal_cents,
            self.discount_cents,
            self.tax_cents,
            self.grand_total_cents,
        )
    }

    pub fn payment_status(&self) -> PaymentStatus {
        PaymentStatus::from_amounts(
            Money::from_cents(self.amount_paid_cents),
            Money::from_cents(self.grand_total_cents),
        )
    }

    /// `max(grand_total − amount_paid, 0)`.
    pub fn balance_due(&self) -> Money {
        (Money::from_cents(self.grand_total_cents) - Money::from_cents(self.amount_paid_cents))
            .non_negative()
    }
}

impl Posting for NewPurchase {
    type Line = NewPurchaseItem;

    const KIND: TransactionKind = TransactionKind::Purchase;

    fn business_id(&self) -> Option<&str> {
        self.purchase_id.as_deref()
    }

    fn lines(&self) -> &[NewPurchaseItem] {
        &self.items
    }

    fn validate(&self, settings: &LedgerSettings) -> ValidationResult<()> {
        validate_supplied_id("purchase_id", self.business_id())?;
        validate_counterparty("supplier_name", &self.supplier_name)?;
        validate_header_amounts(&self.totals())?;
        validate_amount("amount_paid_cents", self.amount_paid_cents)?;

        for (i, item) in self.items.iter().enumerate() {
            validate_line_name(&line_field(i, "product_name"), item.item_id, &item.product_name)?;
            if let Some(quantity) = item.quantity {
                validate_non_negative(&line_field(i, "quantity"), quantity)?;
            }
            if let Some(received) = item.received_qty {
                validate_non_negative(&line_field(i, "received_qty"), received)?;
            }
            validate_amount(&line_field(i, "rate_cents"), item.rate_cents)?;
            validate_amount(&line_field(i, "purchase_price_cents"), item.purchase_price_cents)?;
            if let Some(sale_price) = item.sale_price_cents {
                validate_amount(&line_field(i, "sale_price_cents"), sale_price)?;
            }
        }

        if settings.verify_totals {
            let lines = line_totals("total_cents", &self.items, |item| {
                (item.total_cents, item.computed_total())
            })?;
            self.totals()
                .verify("total_cents", &lines, settings.totals_tolerance_cents)?;
        }

        Ok(())
    }
}

// =============================================================================
// Returns
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct NewReturnItem {
    pub item_id: Option<i64>,
    pub product_name: String,
    pub return_qty: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub item_condition: String,
}

impl NewReturnItem {
    /// `return_qty × unit_price`, `None` on overflow.
    pub fn computed_line_total(&self) -> Option<Money> {
        Money::from_cents(self.unit_price_cents).checked_multiply_quantity(self.return_qty)
    }
}

impl StockLine for NewReturnItem {
    fn product_id(&self) -> Option<i64> {
        self.item_id
    }

    fn stock_quantity(&self) -> i64 {
        self.return_qty
    }
}

fn validate_return_lines(
    items: &[NewReturnItem],
    totals: HeaderTotals,
    settings: &LedgerSettings,
) -> ValidationResult<()> {
    validate_header_amounts(&totals)?;

    for (i, item) in items.iter().enumerate() {
        validate_line_name(&line_field(i, "product_name"), item.item_id, &item.product_name)?;
        validate_positive_quantity(&line_field(i, "return_qty"), item.return_qty)?;
        validate_amount(&line_field(i, "unit_price_cents"), item.unit_price_cents)?;
    }

    if settings.verify_totals {
        let lines = line_totals("line_total_cents", items, |item| {
            (item.line_total_cents, item.computed_line_total())
        })?;
        totals.verify("line_total_cents", &lines, settings.totals_tolerance_cents)?;
    }

    Ok(())
}

/// Goods a customer brings back.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct NewSaleReturn {
    pub return_id: Option<String>,
    /// Business id of the original sale. Informational, not enforced.
    pub sale_id: String,
    #[ts(as = "Option<String>")]
    pub return_date: Option<NaiveDate>,
    pub customer_name: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub grand_total_cents: i64,
    pub reason: String,
    pub status: ReturnStatus,
    pub notes: String,
    pub items: Vec<NewReturnItem>,
}

impl NewSaleReturn {
    pub fn totals(&self) -> HeaderTotals {
        HeaderTotals::new(
            self.subtotal_cents,
            self.discount_cents,
            self.tax_cents,
            self.grand_total_cents,
        )
    }
}

impl Posting for NewSaleReturn {
    type Line = NewReturnItem;

    const KIND: TransactionKind = TransactionKind::SaleReturn;

    fn business_id(&self) -> Option<&str> {
        self.return_id.as_deref()
    }

    fn lines(&self) -> &[NewReturnItem] {
        &self.items
    }

    fn validate(&self, settings: &LedgerSettings) -> ValidationResult<()> {
        validate_supplied_id("return_id", self.business_id())?;
        validate_max_len("customer_name", &self.customer_name, MAX_NAME_LEN)?;
        validate_return_lines(&self.items, self.totals(), settings)
    }
}

/// Goods sent back to a supplier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct NewPurchaseReturn {
    pub return_id: Option<String>,
    /// Business id of the original purchase. Informational, not enforced.
    pub purchase_id: String,
    #[ts(as = "Option<String>")]
    pub return_date: Option<NaiveDate>,
    pub supplier_name: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub grand_total_cents: i64,
    pub reason: String,
    pub status: ReturnStatus,
    pub notes: String,
    pub items: Vec<NewReturnItem>,
}

impl NewPurchaseReturn {
    pub fn totals(&self) -> HeaderTotals {
        HeaderTotals::new(
            self.subtotal_cents,
            self.discount_cents,
            self.tax_cents,
            self.grand_total_cents,
        )
    }
}

impl Posting for NewPurchaseReturn {
    type Line = NewReturnItem;

    const KIND: TransactionKind = TransactionKind::PurchaseReturn;

    fn business_id(&self) -> Option<&str> {
        self.return_id.as_deref()
    }

    fn lines(&self) -> &[NewReturnItem] {
        &self.items
    }

    fn validate(&self, settings: &LedgerSettings) -> ValidationResult<()> {
        validate_supplied_id("return_id", self.business_id())?;
        validate_counterparty("supplier_name", &self.supplier_name)?;
        validate_return_lines(&self.items, self.totals(), settings)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{movements, Direction, StockMovement};
    use chrono::TimeZone;

    #[test]
    fn test_minimal_sale_payload_defaults() {
        let sale: NewSale =
            serde_json::from_str(r#"{ "items": [ { "item_id": 7, "quantity": 3 } ] }"#).unwrap();

        assert!(sale.sale_id.is_none());
        assert!(sale.sale_date.is_none());
        assert_eq!(sale.customer_name, "");
        assert_eq!(sale.grand_total_cents, 0);
        assert_eq!(sale.items[0].item_discount_cents, 0);
        assert!(sale.validate(&LedgerSettings::default()).is_ok());
    }

    #[test]
    fn test_generated_business_id() {
        let at = Utc.timestamp_millis_opt(1_718_000_000_000).unwrap();
        assert_eq!(
            NewPurchase::default().resolve_business_id(at),
            "PUR-1718000000000"
        );
        assert_eq!(
            NewSaleReturn::default().resolve_business_id(at),
            "SR-1718000000000"
        );

        let supplied = NewSale {
            sale_id: Some("SALE-CUSTOM".to_string()),
            ..NewSale::default()
        };
        assert_eq!(supplied.resolve_business_id(at), "SALE-CUSTOM");
    }

    #[test]
    fn test_sale_totals_verified() {
        let mut sale = NewSale {
            subtotal_cents: 2900,
            discount_cents: 100,
            tax_cents: 50,
            grand_total_cents: 2850,
            items: vec![NewSaleItem {
                item_id: Some(1),
                quantity: 3,
                rate_per_unit_cents: 1000,
                item_discount_cents: 100,
                amount_cents: 2900,
                ..NewSaleItem::default()
            }],
            ..NewSale::default()
        };
        assert!(sale.validate(&LedgerSettings::default()).is_ok());

        sale.grand_total_cents = 9999;
        let err = sale.validate(&LedgerSettings::default()).unwrap_err();
        assert!(matches!(err, ValidationError::TotalsMismatch { .. }));

        // Verification can be switched off.
        assert!(sale.validate(&LedgerSettings::trusting()).is_ok());
    }

    #[test]
    fn test_line_overflow_is_a_validation_error() {
        let sale = NewSale {
            items: vec![NewSaleItem {
                item_id: Some(1),
                quantity: 3,
                rate_per_unit_cents: i64::MAX / 2,
                ..NewSaleItem::default()
            }],
            ..NewSale::default()
        };
        let err = sale.validate(&LedgerSettings::default()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Overflow { ref field } if field == "items[0].amount_cents"
        ));

        let purchase_return = NewPurchaseReturn {
            supplier_name: "Acme".to_string(),
            items: vec![
                NewReturnItem {
                    item_id: Some(1),
                    return_qty: 1,
                    ..NewReturnItem::default()
                },
                NewReturnItem {
                    item_id: Some(2),
                    return_qty: i64::MAX,
                    unit_price_cents: 2,
                    ..NewReturnItem::default()
                },
            ],
            ..NewPurchaseReturn::default()
        };
        assert!(matches!(
            purchase_return.validate(&LedgerSettings::default()),
            Err(ValidationError::Overflow { ref field }) if field == "items[1].line_total_cents"
        ));

        // Nothing is recomputed when verification is off.
        assert!(sale.validate(&LedgerSettings::trusting()).is_ok());
    }

    #[test]
    fn test_sale_rejects_zero_quantity_and_nameless_free_text() {
        let zero = NewSale {
            items: vec![NewSaleItem {
                item_id: Some(1),
                quantity: 0,
                ..NewSaleItem::default()
            }],
            ..NewSale::default()
        };
        assert!(matches!(
            zero.validate(&LedgerSettings::default()),
            Err(ValidationError::MustBePositive { .. })
        ));

        let nameless = NewSale {
            items: vec![NewSaleItem {
                quantity: 1,
                ..NewSaleItem::default()
            }],
            ..NewSale::default()
        };
        let err = nameless.validate(&LedgerSettings::default()).unwrap_err();
        assert_eq!(err.to_string(), "items[0].product_name is required");
    }

    #[test]
    fn test_purchase_requires_supplier() {
        let purchase = NewPurchase::default();
        let err = purchase.validate(&LedgerSettings::default()).unwrap_err();
        assert_eq!(err.to_string(), "supplier_name is required");
    }

    #[test]
    fn test_purchase_quantity_resolution() {
        let purchase: NewPurchase = serde_json::from_str(
            r#"{
                "supplier_name": "Acme",
                "items": [
                    { "item_id": 7, "received_qty": 5, "sale_price_cents": 1200 },
                    { "item_id": 8, "quantity": 4, "purchase_price_cents": 300 },
                    { "item_id": 9, "quantity": 10, "received_qty": 6 },
                    { "item_id": 10 }
                ]
            }"#,
        )
        .unwrap();

        let items = &purchase.items;
        assert_eq!(items[0].resolved_quantity(), 5);
        assert_eq!(items[0].new_price_cents(), 1200);
        assert_eq!(items[1].resolved_received_qty(), 4);
        assert_eq!(items[1].new_price_cents(), 300);
        assert_eq!(items[2].resolved_quantity(), 10);
        assert_eq!(items[2].resolved_received_qty(), 6);
        assert_eq!(items[3].resolved_received_qty(), 0);

        assert!(purchase.validate(&LedgerSettings::default()).is_ok());

        let moves = movements(TransactionKind::Purchase, Direction::Post, purchase.lines());
        assert_eq!(moves[2], StockMovement { product_id: 9, delta: 6 });
    }

    #[test]
    fn test_purchase_payment_status_and_balance() {
        let purchase = NewPurchase {
            grand_total_cents: 10_000,
            amount_paid_cents: 4_000,
            ..NewPurchase::default()
        };
        assert_eq!(purchase.payment_status(), PaymentStatus::Partial);
        assert_eq!(purchase.balance_due().cents(), 6_000);

        let overpaid = NewPurchase {
            grand_total_cents: 10_000,
            amount_paid_cents: 12_000,
            ..NewPurchase::default()
        };
        assert_eq!(overpaid.payment_status(), PaymentStatus::Paid);
        assert_eq!(overpaid.balance_due(), Money::zero());
    }

    #[test]
    fn test_purchase_rejects_negative_received() {
        let purchase = NewPurchase {
            supplier_name: "Acme".to_string(),
            items: vec![NewPurchaseItem {
                item_id: Some(1),
                received_qty: Some(-2),
                ..NewPurchaseItem::default()
            }],
            ..NewPurchase::default()
        };
        assert!(matches!(
            purchase.validate(&LedgerSettings::default()),
            Err(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn test_return_payloads() {
        let sale_return: NewSaleReturn = serde_json::from_str(
            r#"{
                "sale_id": "SALE-1",
                "items": [ { "item_id": 7, "return_qty": 2, "unit_price_cents": 500,
                             "line_total_cents": 1000, "item_condition": "Good" } ],
                "subtotal_cents": 1000,
                "grand_total_cents": 1000
            }"#,
        )
        .unwrap();
        assert_eq!(sale_return.status, ReturnStatus::Pending);
        assert!(sale_return.validate(&LedgerSettings::default()).is_ok());

        let purchase_return = NewPurchaseReturn {
            items: sale_return.items.clone(),
            subtotal_cents: 1000,
            grand_total_cents: 1000,
            ..NewPurchaseReturn::default()
        };
        assert!(matches!(
            purchase_return.validate(&LedgerSettings::default()),
            Err(ValidationError::Required { .. })
        ));

        let bad_id = NewSaleReturn {
            return_id: Some("SR 1".to_string()),
            ..NewSaleReturn::default()
        };
        assert!(matches!(
            bad_id.validate(&LedgerSettings::default()),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_empty_item_list_is_legal() {
        let purchase = NewPurchase {
            supplier_name: "Acme".to_string(),
            ..NewPurchase::default()
        };
        assert!(purchase.validate(&LedgerSettings::default()).is_ok());
        assert!(purchase.lines().is_empty());
    }
}
