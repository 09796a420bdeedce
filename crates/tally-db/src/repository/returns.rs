//! # Return Lines
//!
//! Line storage and reversal shared by sale returns and purchase returns.
//!
//! ```text
//! ┌──────────────────┬──────────────────┬───────────────────────┬─────────┐
//! │ kind             │ headers          │ lines                 │ post    │
//! ├──────────────────┼──────────────────┼───────────────────────┼─────────┤
//! │ SaleReturn       │ sale_returns     │ sale_return_items     │ + qty   │
//! │ PurchaseReturn   │ purchase_returns │ purchase_return_items │ − qty   │
//! └──────────────────┴──────────────────┴───────────────────────┴─────────┘
//! ```
//!
//! Both line tables have the same columns. Headers differ (customer vs.
//! supplier) and stay in their own repositories.

use sqlx::{Executor, Sqlite, SqlitePool, Transaction};
use tally_core::{Direction, NewReturnItem, ReturnItem, ReversalSummary, TransactionKind};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::lock_header;
use crate::repository::stock::StockLedger;

const RETURN_ITEM_COLUMNS: &str = r#"
    id, return_id, item_id, product_name, return_qty,
    unit_price_cents, line_total_cents, item_condition
"#;

/// Table pair and ledger kind of one return flavour.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReturnTables {
    pub kind: TransactionKind,
    pub headers: &'static str,
    pub lines: &'static str,
}

pub(crate) const SALE_RETURNS: ReturnTables = ReturnTables {
    kind: TransactionKind::SaleReturn,
    headers: "sale_returns",
    lines: "sale_return_items",
};

pub(crate) const PURCHASE_RETURNS: ReturnTables = ReturnTables {
    kind: TransactionKind::PurchaseReturn,
    headers: "purchase_returns",
    lines: "purchase_return_items",
};

impl ReturnTables {
    /// Inserts the lines of a freshly inserted header and applies their stock
    /// movements. Returns how many lines moved stock.
    pub(crate) async fn insert_lines(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        return_id: &str,
        items: &[NewReturnItem],
    ) -> DbResult<usize> {
        let sql = format!(
            r#"
            INSERT INTO {} (
                return_id, item_id, product_name, return_qty,
                unit_price_cents, line_total_cents, item_condition
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            self.lines
        );

        let mut moved = 0;
        for item in items {
            sqlx::query(&sql)
                .bind(return_id)
                .bind(item.item_id)
                .bind(&item.product_name)
                .bind(item.return_qty)
                .bind(item.unit_price_cents)
                .bind(item.line_total_cents)
                .bind(&item.item_condition)
                .execute(&mut **tx)
                .await?;

            if StockLedger::apply_line(tx, self.kind, Direction::Post, item).await? {
                moved += 1;
            }
        }

        Ok(moved)
    }

    /// Stored lines of one return, in posting order.
    pub(crate) async fn fetch_lines<'e, E>(
        &self,
        executor: E,
        return_id: &str,
    ) -> DbResult<Vec<ReturnItem>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "SELECT {RETURN_ITEM_COLUMNS} FROM {} WHERE return_id = ?1 ORDER BY id",
            self.lines
        );
        let items = sqlx::query_as(&sql)
            .bind(return_id)
            .fetch_all(executor)
            .await?;
        Ok(items)
    }

    /// Undoes every stock movement of a return and deletes it, atomically.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no such return; nothing changed
    pub(crate) async fn reverse(
        &self,
        pool: &SqlitePool,
        return_id: &str,
    ) -> DbResult<ReversalSummary> {
        debug!(kind = %self.kind, return_id = %return_id, "Reversing return");

        let mut tx = pool.begin().await?;

        if !lock_header(&mut tx, self.headers, "return_id", return_id).await? {
            return Err(DbError::not_found(self.kind.to_string(), return_id));
        }

        let items = self.fetch_lines(&mut *tx, return_id).await?;
        let moved = StockLedger::reverse_lines(&mut tx, self.kind, &items).await?;

        sqlx::query(&format!("DELETE FROM {} WHERE return_id = ?1", self.headers))
            .bind(return_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            kind = %self.kind,
            return_id = %return_id,
            lines = items.len(),
            stock_movements = moved,
            "Return reversed"
        );

        Ok(ReversalSummary {
            business_id: return_id.to_string(),
            lines_removed: items.len(),
            stock_movements: moved,
        })
    }
}
