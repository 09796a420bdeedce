//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError / CoreError (tally-core)   sqlx::Error (SQLite)        │
//! │              │                                     │                    │
//! │              └──────────────┬──────────────────────┘                    │
//! │                             ▼                                           │
//! │  DbError (this module) ← Adds context and categorization                │
//! │                             │                                           │
//! │                             ▼                                           │
//! │  DbError::kind()  →  Validation | Conflict | NotFound | Storage         │
//! │                             │                                           │
//! │                             ▼                                           │
//! │  Caller (HTTP layer / UI) maps the kind to a status or message          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tally_core::{CoreError, ValidationError};
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - Reading or deleting a transaction by an unknown business id
    /// - Reading stock of an unknown product
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Posting with a business id that is already taken
    /// - Two postings of one kind in the same millisecond
    /// - Inserting a duplicate SKU or category name
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - A line item references a product id that does not exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Payload rejected before anything was written.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Domain rule violated (e.g. sub-category filed under another category).
    #[error(transparent)]
    Domain(CoreError),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Caller-facing error classes.
///
/// ```text
/// Validation  fix the payload and resubmit
/// Conflict    pick another identifier / catalog entry
/// NotFound    the referenced row does not exist
/// Storage     nothing was persisted; retry later
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Storage,
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Fills in the offending value of a unique violation parsed from SQLite,
    /// which only reports the column.
    pub fn with_value(self, value: &str) -> Self {
        match self {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: value.to_string(),
            },
            other => other,
        }
    }

    /// Classifies the error for the transport layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Validation(_) | DbError::ForeignKeyViolation { .. } | DbError::Domain(_) => {
                ErrorKind::Validation
            }
            DbError::UniqueViolation { .. } => ErrorKind::Conflict,
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::TransactionFailed(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => ErrorKind::Storage,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Not-found and validation errors keep their class; other domain errors
/// are wrapped.
impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => DbError::not_found("Product", id),
            CoreError::TransactionNotFound { kind, id } => DbError::NotFound { entity: kind, id },
            CoreError::Validation(v) => DbError::Validation(v),
            other => DbError::Domain(other),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(DbError::not_found("Sale", "SALE-1").kind(), ErrorKind::NotFound);
        assert_eq!(
            DbError::duplicate("sales.sale_id", "SALE-1").kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            DbError::ForeignKeyViolation {
                message: "FOREIGN KEY constraint failed".to_string()
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(DbError::PoolExhausted.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_core_error_conversion() {
        let err: DbError = CoreError::ProductNotFound(7).into();
        assert_eq!(err.to_string(), "Product not found: 7");
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: DbError = CoreError::CategoryMismatch {
            sub_category: "Soft Drinks".to_string(),
            expected: "Beverages".to_string(),
            given: "Snacks".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_with_value_only_touches_unique_violations() {
        let err = DbError::duplicate("sales.sale_id", "unknown").with_value("SALE-1");
        assert_eq!(
            err.to_string(),
            "Duplicate sales.sale_id: 'SALE-1' already exists"
        );

        let err = DbError::PoolExhausted.with_value("SALE-1");
        assert!(matches!(err, DbError::PoolExhausted));
    }
}
