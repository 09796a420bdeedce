//! # Stock Delta Convention
//!
//! The single rule that keeps stock consistent with posted transactions.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Transaction       Posting                 Reversal                     │
//! │  ───────────────   ─────────────────────   ─────────────────────        │
//! │  Sale              stock -= quantity       stock += quantity            │
//! │  Purchase          stock += received_qty   stock -= received_qty        │
//! │  Sale Return       stock += return_qty     stock -= return_qty          │
//! │  Purchase Return   stock -= return_qty     stock += return_qty          │
//! │                                                                         │
//! │  Invariant for every product p:                                         │
//! │    stock(p) = opening(p) + Σ purchases − Σ sales                        │
//! │               + Σ sale returns − Σ purchase returns                     │
//! │    over the transactions currently posted.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module only computes movements; `tally-db` applies them inside the
//! posting transaction with relative `UPDATE`s.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::TransactionKind;

/// A line item that can move stock.
pub trait StockLine {
    /// Catalog product the line refers to; `None` leaves stock untouched.
    fn product_id(&self) -> Option<i64>;

    /// Unsigned quantity that moves stock for this line.
    fn stock_quantity(&self) -> i64;
}

/// Whether a transaction is being posted or reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Post,
    Reverse,
}

/// A signed change to one product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockMovement {
    pub product_id: i64,
    pub delta: i64,
}

/// Signed multiplier for a kind in a direction.
pub const fn sign(kind: TransactionKind, direction: Direction) -> i64 {
    match direction {
        Direction::Post => kind.posting_sign(),
        Direction::Reverse => -kind.posting_sign(),
    }
}

/// Movement for one line, or `None` for a free-text line.
pub fn movement_for<L: StockLine>(
    kind: TransactionKind,
    direction: Direction,
    line: &L,
) -> Option<StockMovement> {
    line.product_id().map(|product_id| StockMovement {
        product_id,
        delta: sign(kind, direction) * line.stock_quantity(),
    })
}

/// Movements for all lines, in input order.
pub fn movements<L: StockLine>(
    kind: TransactionKind,
    direction: Direction,
    lines: &[L],
) -> Vec<StockMovement> {
    lines
        .iter()
        .filter_map(|line| movement_for(kind, direction, line))
        .collect()
}

/// Net stock change per product (used for diagnostics and invariant checks).
pub fn net_effect(movements: &[StockMovement]) -> BTreeMap<i64, i64> {
    let mut net = BTreeMap::new();
    for movement in movements {
        *net.entry(movement.product_id).or_insert(0) += movement.delta;
    }
    net
}

// =============================================================================
// Ledger Settings
// =============================================================================

/// Posting behavior knobs, loaded from the `[ledger]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Recompute line and header totals and reject mismatches.
    #[serde(default = "default_verify_totals")]
    pub verify_totals: bool,

    /// Allowed difference (minor units) between supplied and recomputed totals.
    #[serde(default = "default_tolerance")]
    pub totals_tolerance_cents: i64,
}

fn default_verify_totals() -> bool {
    true
}

fn default_tolerance() -> i64 {
    1
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            verify_totals: default_verify_totals(),
            totals_tolerance_cents: default_tolerance(),
        }
    }
}

impl LedgerSettings {
    /// Trusts caller-supplied totals as-is.
    pub fn trusting() -> Self {
        LedgerSettings {
            verify_totals: false,
            ..LedgerSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Line(Option<i64>, i64);

    impl StockLine for Line {
        fn product_id(&self) -> Option<i64> {
            self.0
        }

        fn stock_quantity(&self) -> i64 {
            self.1
        }
    }

    #[test]
    fn test_reversal_mirrors_posting_for_every_kind() {
        let lines = [Line(Some(7), 3), Line(Some(8), 5)];

        for kind in TransactionKind::ALL {
            let posted = movements(kind, Direction::Post, &lines);
            let reversed = movements(kind, Direction::Reverse, &lines);

            let mut all = posted.clone();
            all.extend(reversed);
            assert!(
                net_effect(&all).values().all(|d| *d == 0),
                "{kind} reversal does not cancel posting"
            );
        }
    }

    #[test]
    fn test_sale_decrements_and_purchase_increments() {
        let lines = [Line(Some(7), 3)];
        assert_eq!(
            movements(TransactionKind::Sale, Direction::Post, &lines),
            vec![StockMovement { product_id: 7, delta: -3 }]
        );
        assert_eq!(
            movements(TransactionKind::Purchase, Direction::Post, &lines),
            vec![StockMovement { product_id: 7, delta: 3 }]
        );
        assert_eq!(
            movements(TransactionKind::PurchaseReturn, Direction::Reverse, &lines),
            vec![StockMovement { product_id: 7, delta: 3 }]
        );
    }

    #[test]
    fn test_free_text_lines_do_not_move_stock() {
        let lines = [Line(None, 4), Line(Some(1), 1)];
        let moves = movements(TransactionKind::Sale, Direction::Post, &lines);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].product_id, 1);
    }

    #[test]
    fn test_net_effect_groups_by_product() {
        let moves = [
            StockMovement { product_id: 7, delta: -3 },
            StockMovement { product_id: 7, delta: 5 },
            StockMovement { product_id: 9, delta: -1 },
        ];
        let net = net_effect(&moves);
        assert_eq!(net.get(&7), Some(&2));
        assert_eq!(net.get(&9), Some(&-1));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = LedgerSettings::default();
        assert!(settings.verify_totals);
        assert_eq!(settings.totals_tolerance_cents, 1);
        assert!(!LedgerSettings::trusting().verify_totals);
    }
}
