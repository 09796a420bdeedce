//! # tally-db: Persistent Store and Posting Engine for Tally
//!
//! This crate owns every database operation of the inventory ledger.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  Caller (HTTP handler, UI command, seed binary)                         │
//! │       │  NewSale / NewPurchase / NewSaleReturn / NewPurchaseReturn      │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     tally-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │    │    │
//! │  │   │   (pool.rs)   │    │  post/delete  │    │  (embedded)  │    │    │
//! │  │   │               │    │  get/list     │    │              │    │    │
//! │  │   │ SqlitePool    │◄───│ StockLedger   │    │ 001_initial  │    │    │
//! │  │   │ TallyConfig   │    │ Catalog       │    │              │    │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     SQLite Database (WAL, foreign keys on)      │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `tally.toml` + `TALLY_*` environment configuration
//! - [`pool`] - Connection pool creation and repository access
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types and their caller-facing classes
//! - [`repository`] - Posting, reversal, reads and the stock ledger
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, TallyConfig};
//! use tally_core::{NewSale, NewSaleItem};
//!
//! let config = TallyConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let sale = db
//!     .sales()
//!     .post(NewSale {
//!         items: vec![NewSaleItem { item_id: Some(7), quantity: 3, ..Default::default() }],
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! assert_eq!(db.products().get_stock(7).await?, 7);
//! db.sales().delete(&sale.header.sale_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, DatabaseSettings, TallyConfig};
pub use error::{DbError, DbResult, ErrorKind};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::product::ProductRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::purchase_return::PurchaseReturnRepository;
pub use repository::sale::SaleRepository;
pub use repository::sale_return::SaleReturnRepository;
pub use repository::stock::StockLedger;
