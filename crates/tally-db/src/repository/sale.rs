//! # Sale Repository
//!
//! Posting, reversal and reads for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. POST  ── post(NewSale)                                              │
//! │     ├── validate payload (+ totals)            nothing written yet      │
//! │     ├── BEGIN                                                           │
//! │     ├── INSERT sales                           SALE-<epochMillis>       │
//! │     ├── for each item, in order:                                        │
//! │     │     INSERT sale_items                                             │
//! │     │     UPDATE products SET stock = stock - quantity                  │
//! │     ├── COMMIT                                                          │
//! │     └── re-read header + items                                          │
//! │                                                                         │
//! │  2. DELETE ── delete(sale_id)                                           │
//! │     ├── BEGIN                                                           │
//! │     ├── touch sales row (write lock)     NotFound + rollback if absent  │
//! │     ├── SELECT sale_items                                               │
//! │     ├── UPDATE products SET stock = stock + quantity  (per item)        │
//! │     ├── DELETE sales  → sale_items cascade                              │
//! │     └── COMMIT                                                          │
//! │                                                                         │
//! │  There is no draft or void state: a sale is posted or it is gone.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tally_core::{
    Direction, LedgerSettings, NewSale, Posting, ReversalSummary, Sale, SaleItem, SaleWithItems,
    TransactionKind,
};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::lock_header;
use crate::repository::stock::StockLedger;

const KIND: TransactionKind = TransactionKind::Sale;

const SALE_COLUMNS: &str = r#"
    id, sale_id, sale_date, sale_time, customer_name,
    subtotal_cents, discount_cents, tax_cents, grand_total_cents,
    payment_method, amount_received_cents, change_due_cents,
    sold_by, notes, created_at
"#;

const SALE_ITEM_COLUMNS: &str = r#"
    id, sale_id, item_id, product_name, barcode, sale_type,
    quantity, unit, rate_per_unit_cents, amount_cents, item_discount_cents
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    ledger: LedgerSettings,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, ledger: LedgerSettings) -> Self {
        SaleRepository { pool, ledger }
    }

    /// Posts a sale: header, items and stock decrements in one transaction.
    ///
    /// ## Returns
    /// * `Ok(SaleWithItems)` - stored header and items as re-read
    /// * `Err(DbError::Validation)` - payload rejected, nothing written
    /// * `Err(DbError::UniqueViolation)` - `sale_id` already taken
    /// * `Err(DbError::ForeignKeyViolation)` - an item references an unknown product
    pub async fn post(&self, sale: NewSale) -> DbResult<SaleWithItems> {
        sale.validate(&self.ledger)?;

        let now = Utc::now();
        let sale_id = sale.resolve_business_id(now);

        debug!(sale_id = %sale_id, items = sale.items.len(), "Posting sale");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                sale_id, sale_date, sale_time, customer_name,
                subtotal_cents, discount_cents, tax_cents, grand_total_cents,
                payment_method, amount_received_cents, change_due_cents,
                sold_by, notes, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11,
                ?12, ?13, ?14
            )
            "#,
        )
        .bind(&sale_id)
        .bind(sale.sale_date.unwrap_or_else(|| now.date_naive()))
        .bind(sale.sale_time.unwrap_or_else(|| now.time()))
        .bind(&sale.customer_name)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.tax_cents)
        .bind(sale.grand_total_cents)
        .bind(&sale.payment_method)
        .bind(sale.amount_received_cents)
        .bind(sale.change_due_cents)
        .bind(&sale.sold_by)
        .bind(&sale.notes)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&sale_id))?;

        let mut moved = 0;
        for item in &sale.items {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    sale_id, item_id, product_name, barcode, sale_type,
                    quantity, unit, rate_per_unit_cents, amount_cents, item_discount_cents
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5,
                    ?6, ?7, ?8, ?9, ?10
                )
                "#,
            )
            .bind(&sale_id)
            .bind(item.item_id)
            .bind(&item.product_name)
            .bind(&item.barcode)
            .bind(&item.sale_type)
            .bind(item.quantity)
            .bind(&item.unit)
            .bind(item.rate_per_unit_cents)
            .bind(item.amount_cents)
            .bind(item.item_discount_cents)
            .execute(&mut *tx)
            .await?;

            if StockLedger::apply_line(&mut tx, KIND, Direction::Post, item).await? {
                moved += 1;
            }
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            items = sale.items.len(),
            stock_movements = moved,
            grand_total = sale.grand_total_cents,
            "Sale posted"
        );

        self.get(&sale_id).await
    }

    /// Deletes a sale and restores the stock it consumed.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no such sale; nothing changed
    pub async fn delete(&self, sale_id: &str) -> DbResult<ReversalSummary> {
        debug!(sale_id = %sale_id, "Reversing sale");

        let mut tx = self.pool.begin().await?;

        if !lock_header(&mut tx, "sales", "sale_id", sale_id).await? {
            return Err(DbError::not_found(KIND.to_string(), sale_id));
        }

        let sql = format!(
            "SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY id"
        );
        let items: Vec<SaleItem> = sqlx::query_as(&sql)
            .bind(sale_id)
            .fetch_all(&mut *tx)
            .await?;

        let moved = StockLedger::reverse_lines(&mut tx, KIND, &items).await?;

        sqlx::query("DELETE FROM sales WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(sale_id = %sale_id, lines = items.len(), stock_movements = moved, "Sale reversed");

        Ok(ReversalSummary {
            business_id: sale_id.to_string(),
            lines_removed: items.len(),
            stock_movements: moved,
        })
    }

    /// Gets a sale with its items.
    pub async fn get(&self, sale_id: &str) -> DbResult<SaleWithItems> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE sale_id = ?1");
        let header: Option<Sale> = sqlx::query_as(&sql)
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?;

        let header = header.ok_or_else(|| DbError::not_found(KIND.to_string(), sale_id))?;
        let items = self.items(sale_id).await?;

        Ok(SaleWithItems::new(header, items))
    }

    /// Gets all items of a sale, in posting order.
    pub async fn items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!(
            "SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY id"
        );
        let items = sqlx::query_as(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// All sale headers, newest first. Items are not included.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC, id DESC");
        let sales = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(sales)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::repository::testing::{
        db_with_product, file_db_with_product, product_count, row_count,
    };
    use tally_core::NewSaleItem;

    fn sale_of(item_id: Option<i64>, quantity: i64) -> NewSale {
        NewSale {
            items: vec![NewSaleItem {
                item_id,
                product_name: "Counter item".to_string(),
                quantity,
                ..NewSaleItem::default()
            }],
            ..NewSale::default()
        }
    }

    #[tokio::test]
    async fn test_post_sale_decrements_stock() {
        let (db, id) = db_with_product(10).await;

        let posted = db.sales().post(sale_of(Some(id), 3)).await.unwrap();

        assert!(posted.header.sale_id.starts_with("SALE-"));
        assert_eq!(posted.items.len(), 1);
        assert_eq!(posted.items[0].item_id, Some(id));
        assert_eq!(db.products().get_stock(id).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_delete_sale_restores_stock() {
        let (db, id) = db_with_product(10).await;

        let posted = db.sales().post(sale_of(Some(id), 3)).await.unwrap();
        let summary = db.sales().delete(&posted.header.sale_id).await.unwrap();

        assert_eq!(summary.lines_removed, 1);
        assert_eq!(summary.stock_movements, 1);
        assert_eq!(db.products().get_stock(id).await.unwrap(), 10);
        assert_eq!(row_count(&db, "sale_items").await, 0);
        assert_eq!(
            db.sales().get(&posted.header.sale_id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_free_text_line_moves_no_stock() {
        let (db, id) = db_with_product(10).await;

        let posted = db.sales().post(sale_of(None, 2)).await.unwrap();

        assert_eq!(posted.items.len(), 1);
        assert_eq!(posted.items[0].item_id, None);
        assert_eq!(db.products().get_stock(id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_failed_line_rolls_back_everything() {
        let (db, id) = db_with_product(10).await;

        let mut sale = sale_of(Some(id), 1);
        sale.items.push(NewSaleItem {
            item_id: Some(id + 999),
            quantity: 1,
            ..NewSaleItem::default()
        });
        sale.items.push(NewSaleItem {
            item_id: Some(id),
            quantity: 1,
            ..NewSaleItem::default()
        });

        let err = db.sales().post(sale).await.unwrap_err();

        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert_eq!(db.products().get_stock(id).await.unwrap(), 10);
        assert_eq!(row_count(&db, "sales").await, 0);
        assert_eq!(row_count(&db, "sale_items").await, 0);
        assert_eq!(product_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_sale_id_is_conflict() {
        let (db, id) = db_with_product(10).await;

        let mut sale = sale_of(Some(id), 1);
        sale.sale_id = Some("SALE-FIXED".to_string());

        db.sales().post(sale.clone()).await.unwrap();
        let err = db.sales().post(sale).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("SALE-FIXED"));
        // The rejected second posting did not touch stock.
        assert_eq!(db.products().get_stock(id).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_delete_unknown_sale_is_not_found() {
        let (db, _) = db_with_product(10).await;

        let err = db.sales().delete("SALE-0").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_totals_mismatch_is_rejected_before_writing() {
        let (db, id) = db_with_product(10).await;

        let mut sale = sale_of(Some(id), 2);
        sale.items[0].rate_per_unit_cents = 500;
        sale.items[0].amount_cents = 1000;
        sale.subtotal_cents = 1000;
        sale.grand_total_cents = 900;

        let err = db.sales().post(sale).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(row_count(&db, "sales").await, 0);
        assert_eq!(db.products().get_stock(id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_out_of_range_line_total_is_rejected() {
        let (db, id) = db_with_product(10).await;

        let mut sale = sale_of(Some(id), 3);
        sale.items[0].rate_per_unit_cents = i64::MAX / 2;

        let err = db.sales().post(sale).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("items[0].amount_cents"));
        assert_eq!(row_count(&db, "sales").await, 0);
        assert_eq!(db.products().get_stock(id).await.unwrap(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deletes_all_reverse() {
        let (db, id, _dir) = file_db_with_product(100).await;

        let mut sale_ids = Vec::new();
        for n in 0..16 {
            let mut sale = sale_of(Some(id), 1);
            sale.sale_id = Some(format!("SALE-{n}"));
            let posted = db.sales().post(sale).await.unwrap();
            sale_ids.push(posted.header.sale_id);
        }
        assert_eq!(db.products().get_stock(id).await.unwrap(), 84);

        let handles: Vec<_> = sale_ids
            .into_iter()
            .map(|sale_id| {
                let db = db.clone();
                tokio::spawn(async move { db.sales().delete(&sale_id).await })
            })
            .collect();

        for handle in handles {
            let summary = handle.await.unwrap().unwrap();
            assert_eq!(summary.stock_movements, 1);
        }

        assert_eq!(db.products().get_stock(id).await.unwrap(), 100);
        assert!(db.sales().list().await.unwrap().is_empty());
        assert_eq!(row_count(&db, "sale_items").await, 0);
    }

    #[tokio::test]
    async fn test_reads_are_repeatable() {
        let (db, id) = db_with_product(10).await;

        let posted = db.sales().post(sale_of(Some(id), 3)).await.unwrap();

        let first = db.sales().get(&posted.header.sale_id).await.unwrap();
        let second = db.sales().get(&posted.header.sale_id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, posted);
        assert_eq!(db.products().get_stock(id).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_list_newest_first_without_items() {
        let (db, id) = db_with_product(10).await;

        for n in 1..=3 {
            let mut sale = sale_of(Some(id), 1);
            sale.sale_id = Some(format!("SALE-{n}"));
            db.sales().post(sale).await.unwrap();
        }

        let ids: Vec<String> = db
            .sales()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.sale_id)
            .collect();
        assert_eq!(ids, vec!["SALE-3", "SALE-2", "SALE-1"]);
    }

    #[tokio::test]
    async fn test_empty_sale_is_legal() {
        let (db, _) = db_with_product(10).await;

        let posted = db.sales().post(NewSale::default()).await.unwrap();
        assert!(posted.items.is_empty());

        let summary = db.sales().delete(&posted.header.sale_id).await.unwrap();
        assert_eq!(summary.lines_removed, 0);
    }

    #[tokio::test]
    async fn test_deleted_product_leaves_history() {
        let (db, id) = db_with_product(10).await;

        let posted = db.sales().post(sale_of(Some(id), 2)).await.unwrap();
        db.products().delete(id).await.unwrap();

        let sale = db.sales().get(&posted.header.sale_id).await.unwrap();
        assert_eq!(sale.items.len(), 1);
        assert_eq!(sale.items[0].item_id, None);
    }
}
