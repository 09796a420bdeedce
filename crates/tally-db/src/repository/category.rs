//! # Category Repository
//!
//! Category and sub-category lookup tables.
//!
//! Products store category labels as plain text. The lookup tables only
//! matter at write time: a known sub-category pins its parent category.
//!
//! ```text
//! categories            sub_categories
//! ┌────┬───────────┐    ┌────┬─────────────┬─────────────┐
//! │ id │ name      │    │ id │ category_id │ name        │
//! ├────┼───────────┤    ├────┼─────────────┼─────────────┤
//! │  1 │ Beverages │◄───│  1 │      1      │ Soft Drinks │
//! │  2 │ Snacks    │◄───│  2 │      2      │ Chips       │
//! └────┴───────────┘    └────┴─────────────┴─────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tally_core::validation::{validate_max_len, MAX_NAME_LEN};
use tally_core::{Category, CoreError, SubCategory, ValidationError};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Repository for category lookups.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Creates a category. Duplicate names are a conflict.
    pub async fn create_category(&self, name: &str) -> DbResult<Category> {
        let name = clean_label("name", name)?;
        debug!(name = %name, "Creating category");

        let category: Category =
            sqlx::query_as("INSERT INTO categories (name) VALUES (?1) RETURNING id, name")
                .bind(&name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DbError::from(e).with_value(&name))?;

        Ok(category)
    }

    /// Creates a sub-category under an existing category.
    pub async fn create_sub_category(&self, category: &str, name: &str) -> DbResult<SubCategory> {
        let name = clean_label("name", name)?;
        debug!(category = %category, name = %name, "Creating sub-category");

        let category_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM categories WHERE name = ?1")
                .bind(category.trim())
                .fetch_optional(&self.pool)
                .await?;

        let category_id = category_id.ok_or_else(|| DbError::not_found("Category", category))?;

        let sub_category: SubCategory = sqlx::query_as(
            r#"
            INSERT INTO sub_categories (category_id, name)
            VALUES (?1, ?2)
            RETURNING id, category_id, name
            "#,
        )
        .bind(category_id)
        .bind(&name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(&name))?;

        Ok(sub_category)
    }

    /// All categories, alphabetically.
    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    /// Sub-categories of one category, alphabetically.
    pub async fn list_sub_categories(&self, category: &str) -> DbResult<Vec<SubCategory>> {
        let sub_categories = sqlx::query_as(
            r#"
            SELECT s.id, s.category_id, s.name
            FROM sub_categories s
            JOIN categories c ON c.id = s.category_id
            WHERE c.name = ?1
            ORDER BY s.name
            "#,
        )
        .bind(category.trim())
        .fetch_all(&self.pool)
        .await?;
        Ok(sub_categories)
    }

    /// Parent category name of a known sub-category.
    pub async fn resolve_parent(&self, sub_category: &str) -> DbResult<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        parent_of(&mut conn, sub_category).await
    }
}

fn clean_label(field: &str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    validate_max_len(field, value, MAX_NAME_LEN)?;
    Ok(value.to_string())
}

async fn parent_of(conn: &mut SqliteConnection, sub_category: &str) -> DbResult<Option<String>> {
    let parent: Option<String> = sqlx::query_scalar(
        r#"
        SELECT c.name
        FROM sub_categories s
        JOIN categories c ON c.id = s.category_id
        WHERE s.name = ?1
        "#,
    )
    .bind(sub_category)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(parent)
}

/// Category label to store for a product.
///
/// ```text
/// sub_category unknown          → category as given
/// known, category empty         → parent category
/// known, category == parent     → category as given
/// known, category != parent     → CategoryMismatch
/// ```
pub(crate) async fn resolve_category(
    conn: &mut SqliteConnection,
    category: &str,
    sub_category: &str,
) -> DbResult<String> {
    let category = category.trim();
    let sub_category = sub_category.trim();

    if sub_category.is_empty() {
        return Ok(category.to_string());
    }

    match parent_of(conn, sub_category).await? {
        None => Ok(category.to_string()),
        Some(parent) if category.is_empty() || category == parent => Ok(parent),
        Some(parent) => Err(CoreError::CategoryMismatch {
            sub_category: sub_category.to_string(),
            expected: parent,
            given: category.to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::{Database, DbConfig};

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let categories = db.categories();
        categories.create_category("Beverages").await.unwrap();
        categories.create_category("Snacks").await.unwrap();
        categories
            .create_sub_category("Beverages", "Soft Drinks")
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_lookups() {
        let db = setup().await;
        let categories = db.categories();

        let names: Vec<String> = categories
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Beverages", "Snacks"]);

        let subs = categories.list_sub_categories("Beverages").await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].name, "Soft Drinks");
        assert!(categories.list_sub_categories("Snacks").await.unwrap().is_empty());

        assert_eq!(
            categories.resolve_parent("Soft Drinks").await.unwrap(),
            Some("Beverages".to_string())
        );
        assert_eq!(categories.resolve_parent("Chips").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicates_and_unknown_parent() {
        let db = setup().await;
        let categories = db.categories();

        let err = categories.create_category("Beverages").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = categories
            .create_sub_category("Frozen", "Ice Cream")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = categories.create_category("  ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_resolve_category_rules() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        assert_eq!(
            resolve_category(&mut conn, "", "Soft Drinks").await.unwrap(),
            "Beverages"
        );
        assert_eq!(
            resolve_category(&mut conn, "Beverages", "Soft Drinks").await.unwrap(),
            "Beverages"
        );
        assert_eq!(
            resolve_category(&mut conn, "Household", "Detergent").await.unwrap(),
            "Household"
        );

        let err = resolve_category(&mut conn, "Snacks", "Soft Drinks")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::CategoryMismatch { .. })
        ));
    }
}
