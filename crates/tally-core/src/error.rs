//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Store failures, conflicts, not-found           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller (HTTP/UI)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every validation failure is raised before the atomic scope opens, so a
//! `ValidationError` always means nothing was written.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core ledger errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// A transaction with the given business identifier does not exist.
    #[error("{kind} not found: {id}")]
    TransactionNotFound { kind: String, id: String },

    /// Sub-category is registered under a different category.
    ///
    /// ## When This Occurs
    /// ```text
    /// sub_categories: "Soft Drinks" → categories: "Beverages"
    ///
    /// NewProduct { category: "Snacks", sub_category: "Soft Drinks" }
    ///      │
    ///      ▼
    /// CategoryMismatch { sub_category: "Soft Drinks", expected: "Beverages", .. }
    /// ```
    #[error("Sub-category '{sub_category}' belongs to '{expected}', not '{given}'")]
    CategoryMismatch {
        sub_category: String,
        expected: String,
        given: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a payload doesn't meet requirements and can be
/// fixed by the caller before resubmitting.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., business identifier with spaces).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A caller-supplied total disagrees with the recomputed one.
    ///
    /// Amounts are in minor units (cents).
    #[error("{field} is {supplied} but line items add up to {expected}")]
    TotalsMismatch {
        field: String,
        supplied: i64,
        expected: i64,
    },

    /// A recomputed total does not fit in minor units.
    #[error("{field} is out of range")]
    Overflow { field: String },
}

impl ValidationError {
    pub(crate) fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub(crate) fn overflow(field: impl Into<String>) -> Self {
        ValidationError::Overflow {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
