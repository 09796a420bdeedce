//! # tally-core: Pure Domain Logic for the Tally Inventory Ledger
//!
//! Types, money, validation and the stock-delta convention, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Callers (HTTP handlers, desktop UI)                │   │
//! │  │   post sale ── delete purchase ── get return ── read stock      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   input   │  │  ledger   │  │  totals   │  │ validation│  │   │
//! │  │   │  NewSale  │  │ movements │  │ recompute │  │   rules   │  │   │
//! │  │   │ NewPurch. │  │   signs   │  │  compare  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                 │   │
//! │  │   │   types   │  │ documents │  │   money   │                 │   │
//! │  │   │  Product  │  │ Sale, ... │  │   Money   │                 │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │      SQLite, migrations, stock ledger, posters, reversers       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog types and shared enums (Product, TransactionKind, ...)
//! - [`documents`] - Stored transaction headers and line items
//! - [`input`] - Posting payloads with defaults and validation
//! - [`ledger`] - Stock-delta convention and posting settings
//! - [`totals`] - Server-side recomputation of caller-supplied totals
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Field-level rules
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::ledger::{movements, Direction};
//! use tally_core::input::{NewSaleItem, NewSale};
//! use tally_core::TransactionKind;
//!
//! let sale = NewSale {
//!     items: vec![NewSaleItem { item_id: Some(7), quantity: 3, ..Default::default() }],
//!     ..Default::default()
//! };
//!
//! let moves = movements(TransactionKind::Sale, Direction::Post, &sale.items);
//! assert_eq!(moves[0].delta, -3);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod documents;
pub mod error;
pub mod input;
pub mod ledger;
pub mod money;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use documents::*;
pub use error::{CoreError, CoreResult, ValidationError};
pub use input::{
    NewPurchase, NewPurchaseItem, NewPurchaseReturn, NewReturnItem, NewSale, NewSaleItem,
    NewSaleReturn, Posting,
};
pub use ledger::{Direction, LedgerSettings, StockLine, StockMovement};
pub use money::Money;
pub use types::*;

/// Prefix of generated product SKUs (`PRD00042`).
pub const SKU_PREFIX: &str = "PRD";

/// Formats an auto-generated SKU from a sequence number.
///
/// ```rust
/// assert_eq!(tally_core::generated_sku(42), "PRD00042");
/// ```
pub fn generated_sku(sequence: i64) -> String {
    format!("{SKU_PREFIX}{sequence:05}")
}
