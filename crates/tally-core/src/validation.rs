//! # Validation Module
//!
//! Field-level checks run on every payload before the atomic scope opens.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                       │
//! │  ├── Field types, missing fields defaulted                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE + input::*::validate                              │
//! │  ├── Required counterparty, product names on free-text lines            │
//! │  ├── Quantity signs, business identifier format                         │
//! │  └── Totals recomputation (when enabled)                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── UNIQUE business identifiers and SKUs                               │
//! │  └── FOREIGN KEY line → product, line → header                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_business_id, validate_positive_quantity};
//!
//! assert!(validate_business_id("sale_id", "SALE-1718000000000").is_ok());
//! assert!(validate_positive_quantity("items[0].quantity", 0).is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted business identifier.
pub const MAX_BUSINESS_ID_LEN: usize = 64;

/// Longest accepted counterparty or product name.
pub const MAX_NAME_LEN: usize = 200;

/// Longest accepted SKU.
pub const MAX_SKU_LEN: usize = 50;

// =============================================================================
// String Validators
// =============================================================================

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Validates a caller-supplied business identifier.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - ASCII letters, digits, hyphens and underscores only
pub fn validate_business_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    if id.len() > MAX_BUSINESS_ID_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_BUSINESS_ID_LEN,
        });
    }

    if !id.chars().all(is_identifier_char) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a required counterparty name (supplier on purchases and
/// purchase returns).
pub fn validate_counterparty(field: &str, name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    validate_max_len(field, name, MAX_NAME_LEN)
}

/// Validates an optional free-text label: empty is fine, overlong is not.
pub fn validate_max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a catalog product name.
///
/// ```rust
/// use tally_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Coca-Cola 330ml").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::required("name"));
    }

    validate_max_len("name", name, MAX_NAME_LEN)
}

/// A line without a product reference must at least say what was sold.
pub fn validate_line_name(
    field: &str,
    item_id: Option<i64>,
    product_name: &str,
) -> ValidationResult<()> {
    if item_id.is_none() && product_name.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    validate_max_len(field, product_name, MAX_NAME_LEN)
}

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::required("sku"));
    }

    if sku.len() > MAX_SKU_LEN {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LEN,
        });
    }

    if !sku.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Sale and return quantities must be at least one.
pub fn validate_positive_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Purchase quantities may be zero (ordered but nothing received yet).
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Prices, discounts, taxes and payments are never negative on input.
#[inline]
pub fn validate_amount(field: &str, cents: i64) -> ValidationResult<()> {
    validate_non_negative(field, cents)
}

/// Field path of a line-item attribute, e.g. `items[2].quantity`.
pub fn line_field(index: usize, name: &str) -> String {
    format!("items[{index}].{name}")
}

// =============================================================================
// Unit Tests
// =============================================================================
