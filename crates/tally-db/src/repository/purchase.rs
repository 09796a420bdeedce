//! # Purchase Repository
//!
//! Posting, reversal and reads for purchases and purchase items.
//!
//! A purchase line does two things to its product:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  stock       += received_qty        (reversed on delete)             │
//! │  price_cents  = sale_price ?? purchase_price   (NOT reversed)        │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Price overwrite is last-write-wins: the most recently posted purchase
//! line for a product sets its catalog price.

use chrono::Utc;
use sqlx::SqlitePool;
use tally_core::{
    Direction, LedgerSettings, NewPurchase, Posting, Purchase, PurchaseItem, PurchaseWithItems,
    ReversalSummary, TransactionKind,
};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::lock_header;
use crate::repository::stock::StockLedger;

const KIND: TransactionKind = TransactionKind::Purchase;

const PURCHASE_COLUMNS: &str = r#"
    id, purchase_id, purchase_date, supplier_name, invoice_number,
    subtotal_cents, discount_cents, tax_cents, grand_total_cents,
    amount_paid_cents, balance_due_cents, payment_status, notes, created_at
"#;

const PURCHASE_ITEM_COLUMNS: &str = r#"
    id, purchase_id, item_id, product_name, quantity, received_qty, unit,
    rate_cents, purchase_price_cents, sale_price_cents, total_cents, expiry_date
"#;

/// Repository for purchase database operations.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
    ledger: LedgerSettings,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool, ledger: LedgerSettings) -> Self {
        PurchaseRepository { pool, ledger }
    }

    /// Posts a purchase: header, items, stock increments and catalog price
    /// updates in one transaction.
    pub async fn post(&self, purchase: NewPurchase) -> DbResult<PurchaseWithItems> {
        purchase.validate(&self.ledger)?;

        let now = Utc::now();
        let purchase_id = purchase.resolve_business_id(now);
        let payment_status = purchase.payment_status();

        debug!(
            purchase_id = %purchase_id,
            supplier = %purchase.supplier_name,
            items = purchase.items.len(),
            "Posting purchase"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO purchases (
                purchase_id, purchase_date, supplier_name, invoice_number,
                subtotal_cents, discount_cents, tax_cents, grand_total_cents,
                amount_paid_cents, balance_due_cents, payment_status, notes, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12, ?13
            )
            "#,
        )
        .bind(&purchase_id)
        .bind(purchase.purchase_date.unwrap_or_else(|| now.date_naive()))
        .bind(purchase.supplier_name.trim())
        .bind(&purchase.invoice_number)
        .bind(purchase.subtotal_cents)
        .bind(purchase.discount_cents)
        .bind(purchase.tax_cents)
        .bind(purchase.grand_total_cents)
        .bind(purchase.amount_paid_cents)
        .bind(purchase.balance_due().cents())
        .bind(payment_status)
        .bind(&purchase.notes)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&purchase_id))?;

        let mut moved = 0;
        for item in &purchase.items {
            sqlx::query(
                r#"
                INSERT INTO purchase_items (
                    purchase_id, item_id, product_name, quantity, received_qty, unit,
                    rate_cents, purchase_price_cents, sale_price_cents, total_cents, expiry_date
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6,
                    ?7, ?8, ?9, ?10, ?11
                )
                "#,
            )
            .bind(&purchase_id)
            .bind(item.item_id)
            .bind(&item.product_name)
            .bind(item.resolved_quantity())
            .bind(item.resolved_received_qty())
            .bind(&item.unit)
            .bind(item.rate_cents)
            .bind(item.purchase_price_cents)
            .bind(item.sale_price_cents)
            .bind(item.total_cents)
            .bind(item.expiry_date)
            .execute(&mut *tx)
            .await?;

            if StockLedger::apply_line(&mut tx, KIND, Direction::Post, item).await? {
                moved += 1;
            }

            if let Some(product_id) = item.item_id {
                StockLedger::overwrite_price(&mut tx, product_id, item.new_price_cents()).await?;
            }
        }

        tx.commit().await?;

        info!(
            purchase_id = %purchase_id,
            items = purchase.items.len(),
            stock_movements = moved,
            payment_status = ?payment_status,
            "Purchase posted"
        );

        self.get(&purchase_id).await
    }

    /// Deletes a purchase and takes back the stock it added.
    ///
    /// Catalog prices stay as they are.
    pub async fn delete(&self, purchase_id: &str) -> DbResult<ReversalSummary> {
        debug!(purchase_id = %purchase_id, "Reversing purchase");

        let mut tx = self.pool.begin().await?;

        if !lock_header(&mut tx, "purchases", "purchase_id", purchase_id).await? {
            return Err(DbError::not_found(KIND.to_string(), purchase_id));
        }

        let sql = format!(
            "SELECT {PURCHASE_ITEM_COLUMNS} FROM purchase_items WHERE purchase_id = ?1 ORDER BY id"
        );
        let items: Vec<PurchaseItem> = sqlx::query_as(&sql)
            .bind(purchase_id)
            .fetch_all(&mut *tx)
            .await?;

        let moved = StockLedger::reverse_lines(&mut tx, KIND, &items).await?;

        sqlx::query("DELETE FROM purchases WHERE purchase_id = ?1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            purchase_id = %purchase_id,
            lines = items.len(),
            stock_movements = moved,
            "Purchase reversed"
        );

        Ok(ReversalSummary {
            business_id: purchase_id.to_string(),
            lines_removed: items.len(),
            stock_movements: moved,
        })
    }

    /// Gets a purchase with its items.
    pub async fn get(&self, purchase_id: &str) -> DbResult<PurchaseWithItems> {
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE purchase_id = ?1");
        let header: Option<Purchase> = sqlx::query_as(&sql)
            .bind(purchase_id)
            .fetch_optional(&self.pool)
            .await?;

        let header = header.ok_or_else(|| DbError::not_found(KIND.to_string(), purchase_id))?;
        let items = self.items(purchase_id).await?;

        Ok(PurchaseWithItems::new(header, items))
    }

    pub async fn items(&self, purchase_id: &str) -> DbResult<Vec<PurchaseItem>> {
        let sql = format!(
            "SELECT {PURCHASE_ITEM_COLUMNS} FROM purchase_items WHERE purchase_id = ?1 ORDER BY id"
        );
        let items = sqlx::query_as(&sql)
            .bind(purchase_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// All purchase headers, newest first.
    pub async fn list(&self) -> DbResult<Vec<Purchase>> {
        let sql = format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases ORDER BY created_at DESC, id DESC"
        );
        let purchases = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(purchases)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::{Database, DbConfig};
    use crate::repository::testing::{db_with_product, file_db_with_product, row_count};
    use tally_core::{NewPurchaseItem, PaymentStatus};

    fn purchase_of(item_id: i64, received: i64) -> NewPurchase {
        NewPurchase {
            supplier_name: "Acme Traders".to_string(),
            items: vec![NewPurchaseItem {
                item_id: Some(item_id),
                received_qty: Some(received),
                ..NewPurchaseItem::default()
            }],
            ..NewPurchase::default()
        }
    }

    #[tokio::test]
    async fn test_post_purchase_adds_stock_and_sets_price() {
        let (db, id) = db_with_product(0).await;

        let purchase: NewPurchase = serde_json::from_value(serde_json::json!({
            "supplier_name": "Acme Traders",
            "items": [
                { "item_id": id, "received_qty": 5, "purchase_price_cents": 800,
                  "sale_price_cents": 1200 }
            ]
        }))
        .unwrap();

        let posted = db.purchases().post(purchase).await.unwrap();

        assert!(posted.header.purchase_id.starts_with("PUR-"));
        assert_eq!(posted.items[0].quantity, 5);
        assert_eq!(posted.items[0].received_qty, Some(5));

        let product = db.products().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(product.stock, 5);
        assert_eq!(product.price_cents, 1200);
    }

    #[tokio::test]
    async fn test_price_falls_back_to_purchase_price_and_survives_reversal() {
        let (db, id) = db_with_product(0).await;

        let mut purchase = purchase_of(id, 4);
        purchase.items[0].purchase_price_cents = 650;

        let posted = db.purchases().post(purchase).await.unwrap();
        db.purchases().delete(&posted.header.purchase_id).await.unwrap();

        let product = db.products().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(product.stock, 0);
        assert_eq!(product.price_cents, 650);
    }

    #[tokio::test]
    async fn test_received_qty_drives_stock() {
        let (db, id) = db_with_product(0).await;

        let mut purchase = purchase_of(id, 6);
        purchase.items[0].quantity = Some(10);

        db.purchases().post(purchase).await.unwrap();
        assert_eq!(db.products().get_stock(id).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_reversal_of_row_without_received_qty_uses_quantity() {
        let (db, id) = db_with_product(0).await;

        let posted = db.purchases().post(purchase_of(id, 3)).await.unwrap();
        let purchase_id = posted.header.purchase_id;

        sqlx::query("UPDATE purchase_items SET received_qty = NULL WHERE purchase_id = ?1")
            .bind(&purchase_id)
            .execute(db.pool())
            .await
            .unwrap();

        db.purchases().delete(&purchase_id).await.unwrap();
        assert_eq!(db.products().get_stock(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_payment_status_recorded() {
        let (db, id) = db_with_product(0).await;

        let mut purchase = purchase_of(id, 2);
        purchase.items[0].rate_cents = 500;
        purchase.items[0].total_cents = 1000;
        purchase.subtotal_cents = 1000;
        purchase.grand_total_cents = 1000;
        purchase.amount_paid_cents = 400;

        let posted = db.purchases().post(purchase).await.unwrap();

        assert_eq!(posted.header.payment_status, PaymentStatus::Partial);
        assert_eq!(posted.header.balance_due_cents, 600);
    }

    #[tokio::test]
    async fn test_missing_supplier_is_rejected() {
        let (db, id) = db_with_product(0).await;

        let mut purchase = purchase_of(id, 2);
        purchase.supplier_name = "   ".to_string();

        let err = db.purchases().post(purchase).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(row_count(&db, "purchases").await, 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_purchase_is_not_found() {
        let (db, _) = db_with_product(0).await;

        let err = db.purchases().delete("PUR-404").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    /// Overlapping purchases on a pooled file database: every relative
    /// update lands.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_purchases_all_land() {
        let (db, id, _dir) = file_db_with_product(0).await;

        let spawn_purchase = |db: Database, purchase_id: String| {
            let mut purchase = purchase_of(id, 5);
            purchase.purchase_id = Some(purchase_id);
            tokio::spawn(async move { db.purchases().post(purchase).await })
        };

        let handles: Vec<_> = (0..8)
            .map(|n| spawn_purchase(db.clone(), format!("PUR-{n}")))
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(db.products().get_stock(id).await.unwrap(), 40);
        assert_eq!(db.purchases().list().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_trusting_settings_skip_totals() {
        let db = Database::new(DbConfig::in_memory().ledger(LedgerSettings::trusting()))
            .await
            .unwrap();

        let purchase = NewPurchase {
            supplier_name: "Acme Traders".to_string(),
            grand_total_cents: 12_345,
            ..NewPurchase::default()
        };

        let posted = db.purchases().post(purchase).await.unwrap();
        assert_eq!(posted.header.grand_total_cents, 12_345);
        assert!(posted.items.is_empty());
    }
}
