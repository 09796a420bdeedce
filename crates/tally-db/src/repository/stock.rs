//! # Stock Ledger
//!
//! Applies signed stock deltas inside the caller's transaction.
//!
//! ## Relative Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                            │
//! │                                                                     │
//! │  ❌ WRONG: read-modify-write (loses concurrent updates)             │
//! │     SELECT stock ...; UPDATE products SET stock = 7 WHERE id = ?    │
//! │                                                                     │
//! │  ✅ CORRECT: relative update                                        │
//! │     UPDATE products SET stock = stock + ?delta WHERE id = ?         │
//! │                                                                     │
//! │  Purchase A: +5 ─┐                                                  │
//! │                  ├─► SQLite serializes writers ─► stock = 0+5+5     │
//! │  Purchase B: +5 ─┘                                                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No lower bound is enforced: stock may go negative (oversold).

use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use tally_core::ledger::movement_for;
use tally_core::{Direction, StockLine, StockMovement, TransactionKind};
use tracing::{debug, warn};

use crate::error::DbResult;

/// Stateless stock mutations. Every method runs on an open transaction so
/// the stock change commits or rolls back with the header and lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockLedger;

impl StockLedger {
    /// Adds `delta` to one product's stock.
    ///
    /// `None` is a free-text line and does nothing. Returns the number of
    /// rows touched; zero means the product id is unknown and is logged.
    pub async fn apply_delta(
        tx: &mut Transaction<'_, Sqlite>,
        product_id: Option<i64>,
        delta: i64,
    ) -> DbResult<u64> {
        let Some(product_id) = product_id else {
            return Ok(0);
        };

        debug!(product_id, delta, "Applying stock delta");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            warn!(product_id, delta, "Stock delta matched no product");
        }

        Ok(result.rows_affected())
    }

    /// Last-write-wins catalog price update used by purchase posting.
    pub async fn overwrite_price(
        tx: &mut Transaction<'_, Sqlite>,
        product_id: i64,
        price_cents: i64,
    ) -> DbResult<u64> {
        debug!(product_id, price_cents, "Overwriting catalog price");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET price_cents = ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(price_cents)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            warn!(product_id, "Price overwrite matched no product");
        }

        Ok(result.rows_affected())
    }

    /// Applies a batch of movements in order.
    pub async fn apply_movements(
        tx: &mut Transaction<'_, Sqlite>,
        movements: &[StockMovement],
    ) -> DbResult<usize> {
        for movement in movements {
            Self::apply_delta(tx, Some(movement.product_id), movement.delta).await?;
        }
        Ok(movements.len())
    }

    /// Applies the stock effect of one line item.
    ///
    /// Returns whether the line moved stock (free-text lines don't).
    pub async fn apply_line<L: StockLine + Sync>(
        tx: &mut Transaction<'_, Sqlite>,
        kind: TransactionKind,
        direction: Direction,
        line: &L,
    ) -> DbResult<bool> {
        match movement_for(kind, direction, line) {
            Some(movement) => {
                Self::apply_delta(tx, Some(movement.product_id), movement.delta).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Applies the inverse stock effect of every stored line.
    ///
    /// Returns the number of lines that moved stock.
    pub async fn reverse_lines<L: StockLine + Sync>(
        tx: &mut Transaction<'_, Sqlite>,
        kind: TransactionKind,
        lines: &[L],
    ) -> DbResult<usize> {
        let movements = tally_core::ledger::movements(kind, Direction::Reverse, lines);
        Self::apply_movements(tx, &movements).await
    }
}
