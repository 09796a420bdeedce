//! # Product Repository
//!
//! Database operations for catalog products.
//!
//! ## Key Operations
//! - Create with generated SKU and sub-category resolution
//! - Lookups by id, SKU and barcode
//! - Detail edits (never stock)
//! - Stock reads and low-stock listing
//!
//! ## Stock Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(NewProduct { stock: 10 })   ← opening stock, written once       │
//! │                                                                         │
//! │  update_details(..)                 ← labels, status, price only        │
//! │                                                                         │
//! │  StockLedger (posting / reversal)   ← the only writer of `stock`        │
//! │                                                                         │
//! │  delete(id)                         ← hard delete; historical lines     │
//! │                                       keep their row, item_id → NULL    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tally_core::validation::{validate_product_name, validate_sku};
use tally_core::{generated_sku, NewProduct, Product, ProductUpdate};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::category::resolve_category;

const PRODUCT_COLUMNS: &str = r#"
    id, sku, barcode, name, secondary_name,
    category, sub_category, brand, unit, supplier,
    status, stock, price_cents, created_at, updated_at
"#;

/// `PRD` + the id the next insert will receive, moved past any SKU a
/// caller already supplied in that form.
///
/// `products.id` is AUTOINCREMENT, so the next id comes from
/// `sqlite_sequence`; ids of deleted rows are never reused.
async fn next_generated_sku(tx: &mut Transaction<'_, Sqlite>) -> DbResult<String> {
    let mut next: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE((SELECT seq FROM sqlite_sequence WHERE name = 'products'), 0) + 1
        "#,
    )
    .fetch_one(&mut **tx)
    .await?;

    loop {
        let sku = generated_sku(next);
        let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE sku = ?1")
            .bind(&sku)
            .fetch_optional(&mut **tx)
            .await?;

        match taken {
            None => return Ok(sku),
            Some(id) => {
                debug!(sku = %sku, taken_by = id, "Generated SKU already in use");
                next += 1;
            }
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let product = db.products().create(NewProduct { name: "Rice 5kg".into(), ..Default::default() }).await?;
/// let stock = db.products().get_stock(product.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## What This Does
    /// 1. Validates name and (if given) SKU
    /// 2. Opens a transaction
    /// 3. Resolves the category through the sub-category lookup
    /// 4. Generates `PRD` + the next row id when no SKU was given
    /// 5. Inserts and returns the stored row
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    /// * `Err(DbError::Domain)` - sub-category belongs to another category
    pub async fn create(&self, product: NewProduct) -> DbResult<Product> {
        validate_product_name(&product.name)?;
        let supplied_sku = match product.sku.as_deref().map(str::trim) {
            Some(sku) if !sku.is_empty() => {
                validate_sku(sku)?;
                Some(sku.to_string())
            }
            _ => None,
        };

        let mut tx = self.pool.begin().await?;

        let category =
            resolve_category(&mut tx, &product.category, &product.sub_category).await?;

        let sku = match supplied_sku {
            Some(sku) => sku,
            None => next_generated_sku(&mut tx).await?,
        };

        debug!(sku = %sku, "Inserting product");

        let now = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO products (
                sku, barcode, name, secondary_name,
                category, sub_category, brand, unit, supplier,
                status, stock, price_cents, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13, ?13
            )
            RETURNING {PRODUCT_COLUMNS}
            "#
        );

        let created: Product = sqlx::query_as(&sql)
            .bind(&sku)
            .bind(non_empty(product.barcode))
            .bind(product.name.trim())
            .bind(non_empty(product.secondary_name))
            .bind(&category)
            .bind(product.sub_category.trim())
            .bind(product.brand.trim())
            .bind(product.unit.trim())
            .bind(product.supplier.trim())
            .bind(product.status)
            .bind(product.stock)
            .bind(product.price_cents)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).with_value(&sku))?;

        tx.commit().await?;

        info!(id = created.id, sku = %created.sku, stock = created.stock, "Product created");
        Ok(created)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");
        let product = sqlx::query_as(&sql)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Gets the first product carrying a barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?1 ORDER BY id LIMIT 1"
        );
        let product = sqlx::query_as(&sql)
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// All products by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, id");
        let products = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(products)
    }

    /// Products at or below `threshold`, lowest stock first. Negative stock
    /// is included.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE stock <= ?1 ORDER BY stock, id"
        );
        let products = sqlx::query_as(&sql)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Updates labels, status and price.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update_details(&self, id: i64, update: ProductUpdate) -> DbResult<Product> {
        validate_product_name(&update.name)?;
        debug!(id, "Updating product");

        let mut tx = self.pool.begin().await?;

        let category = resolve_category(&mut tx, &update.category, &update.sub_category).await?;

        let sql = format!(
            r#"
            UPDATE products SET
                barcode = ?2,
                name = ?3,
                secondary_name = ?4,
                category = ?5,
                sub_category = ?6,
                brand = ?7,
                unit = ?8,
                supplier = ?9,
                status = ?10,
                price_cents = ?11,
                updated_at = ?12
            WHERE id = ?1
            RETURNING {PRODUCT_COLUMNS}
            "#
        );

        let updated: Option<Product> = sqlx::query_as(&sql)
            .bind(id)
            .bind(non_empty(update.barcode))
            .bind(update.name.trim())
            .bind(non_empty(update.secondary_name))
            .bind(&category)
            .bind(update.sub_category.trim())
            .bind(update.brand.trim())
            .bind(update.unit.trim())
            .bind(update.supplier.trim())
            .bind(update.status)
            .bind(update.price_cents)
            .bind(Utc::now())
            .fetch_optional(&mut *tx)
            .await?;

        let updated = updated.ok_or_else(|| DbError::not_found("Product", id))?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Hard-deletes a product. No stock reconciliation is performed;
    /// historical line items keep their rows with `item_id` set to NULL.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id, "Product deleted");
        Ok(())
    }

    /// Current stock of a product (may be negative).
    pub async fn get_stock(&self, id: i64) -> DbResult<i64> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        stock.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
