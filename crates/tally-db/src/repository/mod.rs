//! # Repository Module
//!
//! Database repository implementations for the Tally ledger.
//!
//! ## Repository Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and What They Touch                     │
//! │                                                                         │
//! │  Caller                                                                 │
//! │       │  db.sales().post(new_sale)                                      │
//! │       ▼                                                                 │
//! │  SaleRepository / PurchaseRepository / ...ReturnRepository              │
//! │  ├── post(payload)     header + lines + StockLedger   (one tx)          │
//! │  ├── delete(id)        inverse StockLedger + header   (one tx)          │
//! │  ├── get(id)           header + lines                                   │
//! │  └── list()            headers, newest first                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StockLedger           UPDATE products SET stock = stock + ?            │
//! │                                                                         │
//! │  ProductRepository     catalog CRUD, stock reads                        │
//! │  CategoryRepository    category / sub-category lookups                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product catalog
//! - [`CategoryRepository`](category::CategoryRepository) - Category lookups
//! - [`SaleRepository`](sale::SaleRepository) - Sales
//! - [`PurchaseRepository`](purchase::PurchaseRepository) - Purchases
//! - [`SaleReturnRepository`](sale_return::SaleReturnRepository) - Sale returns
//! - [`PurchaseReturnRepository`](purchase_return::PurchaseReturnRepository) - Purchase returns
//! - [`StockLedger`](stock::StockLedger) - Stock deltas inside a transaction
//!
//! ## Reversal Locking
//! ```text
//! BEGIN (deferred)
//!   UPDATE <headers> SET notes = notes WHERE <business id> = ?   write lock taken here
//!   SELECT <lines>                                               reads see the latest commit
//!   UPDATE products SET stock = stock ± qty
//!   DELETE <headers>
//! COMMIT
//! ```
//!
//! A deferred transaction that reads first holds a WAL snapshot; if another
//! writer commits before its first write, SQLite fails the upgrade with
//! "database is locked" without waiting. Reversals therefore write first.

use sqlx::{Sqlite, Transaction};

use crate::error::DbResult;

pub mod category;
pub mod product;
pub mod purchase;
pub mod purchase_return;
pub(crate) mod returns;
pub mod sale;
pub mod sale_return;
pub mod stock;

/// Touches a header row so the transaction holds the write lock before it
/// reads the lines.
///
/// Returns `false` when `table` has no row with that business id.
pub(crate) async fn lock_header(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    key_column: &str,
    business_id: &str,
) -> DbResult<bool> {
    let sql = format!("UPDATE {table} SET notes = notes WHERE {key_column} = ?1");
    let result = sqlx::query(&sql)
        .bind(business_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() > 0)
}


// =============================================================================
// Cross-Repository Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::testing::db_with_product;
    use tally_core::{
        NewPurchase, NewPurchaseItem, NewPurchaseReturn, NewReturnItem, NewSale, NewSaleItem,
        NewSaleReturn,
    };

    fn sale(item_id: i64, quantity: i64) -> NewSale {
        NewSale {
            items: vec![NewSaleItem {
                item_id: Some(item_id),
                quantity,
                ..NewSaleItem::default()
            }],
            ..NewSale::default()
        }
    }

    fn purchase(item_id: i64, received: i64) -> NewPurchase {
        NewPurchase {
            supplier_name: "Acme Traders".to_string(),
            items: vec![NewPurchaseItem {
                item_id: Some(item_id),
                received_qty: Some(received),
                purchase_price_cents: 800,
                ..NewPurchaseItem::default()
            }],
            ..NewPurchase::default()
        }
    }

    fn return_item(item_id: i64, qty: i64) -> NewReturnItem {
        NewReturnItem {
            item_id: Some(item_id),
            return_qty: qty,
            ..NewReturnItem::default()
        }
    }

    fn sale_return(item_id: i64, qty: i64) -> NewSaleReturn {
        NewSaleReturn {
            items: vec![return_item(item_id, qty)],
            ..NewSaleReturn::default()
        }
    }

    fn purchase_return(item_id: i64, qty: i64) -> NewPurchaseReturn {
        NewPurchaseReturn {
            supplier_name: "Acme Traders".to_string(),
            items: vec![return_item(item_id, qty)],
            ..NewPurchaseReturn::default()
        }
    }

    /// Sale, purchase and purchase return walked through in order.
    #[tokio::test]
    async fn test_sale_purchase_and_return_sequence() {
        let (db, id) = db_with_product(10).await;

        // A: sale of 3 from 10.
        let posted = db.sales().post(sale(id, 3)).await.unwrap();
        assert_eq!(db.products().get_stock(id).await.unwrap(), 7);

        // B: purchase receives 5 and sets the sale price.
        let purchase: NewPurchase = serde_json::from_value(serde_json::json!({
            "supplier_name": "Acme Traders",
            "items": [ { "item_id": id, "received_qty": 5, "sale_price_cents": 1200 } ]
        }))
        .unwrap();
        db.purchases().post(purchase).await.unwrap();

        let product = db.products().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(product.stock, 12);
        assert_eq!(product.price_cents, 1200);

        // D: purchase return of 2.
        db.purchase_returns()
            .post(purchase_return(id, 2))
            .await
            .unwrap();
        assert_eq!(db.products().get_stock(id).await.unwrap(), 10);

        // C: deleting the sale gives its 3 units back.
        db.sales().delete(&posted.header.sale_id).await.unwrap();
        assert_eq!(db.products().get_stock(id).await.unwrap(), 13);
    }

    #[tokio::test]
    async fn test_round_trip_for_every_kind_restores_stock() {
        let (db, id) = db_with_product(20).await;

        let s = db.sales().post(sale(id, 4)).await.unwrap();
        db.sales().delete(&s.header.sale_id).await.unwrap();
        assert_eq!(db.products().get_stock(id).await.unwrap(), 20);

        let p = db.purchases().post(purchase(id, 6)).await.unwrap();
        db.purchases().delete(&p.header.purchase_id).await.unwrap();
        assert_eq!(db.products().get_stock(id).await.unwrap(), 20);

        let sr = db.sale_returns().post(sale_return(id, 2)).await.unwrap();
        db.sale_returns().delete(&sr.header.return_id).await.unwrap();
        assert_eq!(db.products().get_stock(id).await.unwrap(), 20);

        let pr = db
            .purchase_returns()
            .post(purchase_return(id, 5))
            .await
            .unwrap();
        db.purchase_returns()
            .delete(&pr.header.return_id)
            .await
            .unwrap();
        assert_eq!(db.products().get_stock(id).await.unwrap(), 20);
    }

    /// stock = opening + purchases + sale returns - sales - purchase returns,
    /// counting only postings that were not deleted.
    #[tokio::test]
    async fn test_stock_matches_surviving_postings() {
        let (db, id) = db_with_product(50).await;

        let s1 = db.sales().post(sale(id, 7)).await.unwrap();
        db.sales().post(sale(id, 2)).await.unwrap();
        db.purchases().post(purchase(id, 11)).await.unwrap();
        let p2 = db.purchases().post(purchase(id, 4)).await.unwrap();
        db.sale_returns().post(sale_return(id, 3)).await.unwrap();
        db.purchase_returns()
            .post(purchase_return(id, 6))
            .await
            .unwrap();

        db.sales().delete(&s1.header.sale_id).await.unwrap();
        db.purchases().delete(&p2.header.purchase_id).await.unwrap();

        let expected = 50 + 11 + 3 - 2 - 6;
        assert_eq!(db.products().get_stock(id).await.unwrap(), expected);

        assert_eq!(db.sales().list().await.unwrap().len(), 1);
        assert_eq!(db.purchases().list().await.unwrap().len(), 1);
        assert_eq!(db.sale_returns().list().await.unwrap().len(), 1);
        assert_eq!(db.purchase_returns().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_business_id_across_kinds_is_allowed() {
        let (db, id) = db_with_product(10).await;

        let mut s = sale(id, 1);
        s.sale_id = Some("DOC-1".to_string());
        let mut p = purchase(id, 1);
        p.purchase_id = Some("DOC-1".to_string());

        db.sales().post(s).await.unwrap();
        db.purchases().post(p).await.unwrap();

        assert_eq!(db.products().get_stock(id).await.unwrap(), 10);
    }
}
