//! # Purchase Return Repository
//!
//! A purchase return sends goods back to the supplier: posting subtracts
//! `return_qty` from stock, deleting adds it back. Catalog prices are not
//! touched in either direction.

use chrono::Utc;
use sqlx::SqlitePool;
use tally_core::{
    LedgerSettings, NewPurchaseReturn, Posting, PurchaseReturn, PurchaseReturnWithItems,
    ReversalSummary,
};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::returns::PURCHASE_RETURNS;

const PURCHASE_RETURN_COLUMNS: &str = r#"
    id, return_id, purchase_id, return_date, supplier_name,
    subtotal_cents, discount_cents, tax_cents, grand_total_cents,
    reason, status, notes, created_at
"#;

/// Repository for purchase return database operations.
#[derive(Debug, Clone)]
pub struct PurchaseReturnRepository {
    pool: SqlitePool,
    ledger: LedgerSettings,
}

impl PurchaseReturnRepository {
    pub fn new(pool: SqlitePool, ledger: LedgerSettings) -> Self {
        PurchaseReturnRepository { pool, ledger }
    }

    /// Posts a purchase return: header, items and stock decrements atomically.
    pub async fn post(
        &self,
        purchase_return: NewPurchaseReturn,
    ) -> DbResult<PurchaseReturnWithItems> {
        purchase_return.validate(&self.ledger)?;

        let now = Utc::now();
        let return_id = purchase_return.resolve_business_id(now);

        debug!(
            return_id = %return_id,
            purchase_id = %purchase_return.purchase_id,
            items = purchase_return.items.len(),
            "Posting purchase return"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO purchase_returns (
                return_id, purchase_id, return_date, supplier_name,
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
        .bind(&purchase_return.purchase_id)
        .bind(purchase_return.return_date.unwrap_or_else(|| now.date_naive()))
        .bind(purchase_return.supplier_name.trim())
        .bind(purchase_return.subtotal_cents)
        .bind(purchase_return.discount_cents)
        .bind(purchase_return.tax_cents)
        .bind(purchase_return.grand_total_cents)
        .bind(&purchase_return.reason)
        .bind(purchase_return.status)
        .bind(&purchase_return.notes)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&return_id))?;

        let moved = PURCHASE_RETURNS
            .insert_lines(&mut tx, &return_id, &purchase_return.items)
            .await?;

        tx.commit().await?;

        info!(
            return_id = %return_id,
            items = purchase_return.items.len(),
            stock_movements = moved,
            "Purchase return posted"
        );

        self.get(&return_id).await
    }

    /// Deletes a purchase return and restores the stock it sent back.
    pub async fn delete(&self, return_id: &str) -> DbResult<ReversalSummary> {
        PURCHASE_RETURNS.reverse(&self.pool, return_id).await
    }

    pub async fn get(&self, return_id: &str) -> DbResult<PurchaseReturnWithItems> {
        let sql = format!(
            "SELECT {PURCHASE_RETURN_COLUMNS} FROM purchase_returns WHERE return_id = ?1"
        );
        let header: Option<PurchaseReturn> = sqlx::query_as(&sql)
            .bind(return_id)
            .fetch_optional(&self.pool)
            .await?;

        let header =
            header.ok_or_else(|| DbError::not_found(PURCHASE_RETURNS.kind.to_string(), return_id))?;

        let items = PURCHASE_RETURNS.fetch_lines(&self.pool, return_id).await?;

        Ok(PurchaseReturnWithItems::new(header, items))
    }

    /// All purchase return headers, newest first.
    pub async fn list(&self) -> DbResult<Vec<PurchaseReturn>> {
        let sql = format!(
            "SELECT {PURCHASE_RETURN_COLUMNS} FROM purchase_returns ORDER BY created_at DESC, id DESC"
        );
        let returns = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(returns)
    }
}
