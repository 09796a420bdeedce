//! # Sale Return Repository
//!
//! A sale return puts goods back on the shelf: posting adds `return_qty`
//! to stock, deleting takes it away again.
//!
//! The referenced `sale_id` is informational. It is stored but not checked
//! against `sales`, and returning more than was sold is allowed.

use chrono::Utc;
use sqlx::SqlitePool;
use tally_core::{
    LedgerSettings, NewSaleReturn, Posting, ReversalSummary, SaleReturn, SaleReturnWithItems,
};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::returns::SALE_RETURNS;

const SALE_RETURN_COLUMNS: &str = r#"
    id, return_id, sale_id, return_date, customer_name,
    subtotal_cents, discount_cents, tax_cents, grand_total_cents,
    reason, status, notes, created_at
"#;

/// Repository for sale return database operations.
#[derive(Debug, Clone)]
pub struct SaleReturnRepository {
    pool: SqlitePool,
    ledger: LedgerSettings,
}

impl SaleReturnRepository {
    pub fn new(pool: SqlitePool, ledger: LedgerSettings) -> Self {
        SaleReturnRepository { pool, ledger }
    }

    /// Posts a sale return: header, items and stock increments atomically.
    pub async fn post(&self, sale_return: NewSaleReturn) -> DbResult<SaleReturnWithItems> {
        sale_return.validate(&self.ledger)?;

        let now = Utc::now();
        let return_id = sale_return.resolve_business_id(now);

        debug!(
            return_id = %return_id,
            sale_id = %sale_return.sale_id,
            items = sale_return.items.len(),
            "Posting sale return"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sale_returns (
                return_id, sale_id, return_date, customer_name,
                subtotal_cents, discount_cents, tax_cents, grand_total_cents,
                reason, status, notes, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12
            )
            "#,
        )
        .bind(&return_id)
        .bind(&sale_return.sale_id)
        .bind(sale_return.return_date.unwrap_or_else(|| now.date_naive()))
        .bind(&sale_return.customer_name)
        .bind(sale_return.subtotal_cents)
        .bind(sale_return.discount_cents)
        .bind(sale_return.tax_cents)
        .bind(sale_return.grand_total_cents)
        .bind(&sale_return.reason)
        .bind(sale_return.status)
        .bind(&sale_return.notes)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&return_id))?;

        let moved = SALE_RETURNS
            .insert_lines(&mut tx, &return_id, &sale_return.items)
            .await?;

        tx.commit().await?;

        info!(
            return_id = %return_id,
            items = sale_return.items.len(),
            stock_movements = moved,
            "Sale return posted"
        );

        self.get(&return_id).await
    }

    /// Deletes a sale return and removes the stock it put back.
    pub async fn delete(&self, return_id: &str) -> DbResult<ReversalSummary> {
        SALE_RETURNS.reverse(&self.pool, return_id).await
    }

    pub async fn get(&self, return_id: &str) -> DbResult<SaleReturnWithItems> {
        let sql = format!("SELECT {SALE_RETURN_COLUMNS} FROM sale_returns WHERE return_id = ?1");
        let header: Option<SaleReturn> = sqlx::query_as(&sql)
            .bind(return_id)
            .fetch_optional(&self.pool)
            .await?;

        let header =
            header.ok_or_else(|| DbError::not_found(SALE_RETURNS.kind.to_string(), return_id))?;

        let items = SALE_RETURNS.fetch_lines(&self.pool, return_id).await?;

        Ok(SaleReturnWithItems::new(header, items))
    }

    /// All sale return headers, newest first.
    pub async fn list(&self) -> DbResult<Vec<SaleReturn>> {
        let sql = format!(
            "SELECT {SALE_RETURN_COLUMNS} FROM sale_returns ORDER BY created_at DESC, id DESC"
        );
        let returns = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(returns)
    }
}
