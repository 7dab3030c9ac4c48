//! # Validation Module
//!
//! Input validation for the cart engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (apps/api)                                              │
//! │  └── JSON shape (deserialization rejects wrong types)                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Identifiers present and bounded                                   │
//! │  └── Quantities positive                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK (quantity >= 1), CHECK (available_qty >= 0)                 │
//! │  └── UNIQUE (cart_id, variant_id)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::validation::{normalize_coupon_code, validate_quantity};
//!
//! assert_eq!(normalize_coupon_code(" welcome10 ").unwrap(), "WELCOME10");
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::CouponKind;
use crate::BASIS_POINTS_PER_WHOLE;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted identifier (user id, variant id, item id).
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Longest accepted coupon code.
pub const MAX_COUPON_CODE_LEN: usize = 32;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an opaque identifier. The value is returned unchanged.
///
/// ## Rules
/// - Must not be empty or blank
/// - No leading or trailing whitespace
/// - At most [`MAX_IDENTIFIER_LEN`] characters
pub fn validate_identifier<'a>(field: &str, value: &'a str) -> ValidationResult<&'a str> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_IDENTIFIER_LEN,
        });
    }

    if value.trim().len() != value.len() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not have leading or trailing whitespace".to_string(),
        });
    }

    Ok(value)
}

/// Canonical form of a coupon code a customer typed in: trimmed and
/// upper-cased.
///
/// Only emptiness is rejected. A code that breaks the catalog format can
/// never match a stored coupon, so the lookup reports it as not found.
pub fn normalize_coupon_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    Ok(code.to_ascii_uppercase())
}

/// Validates a catalog coupon code and returns its canonical (upper-case)
/// form, the one stored in `coupons.code`.
///
/// Codes are matched case-insensitively: `welcome10` and `WELCOME10` are
/// the same coupon.
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_coupon_code;
///
/// assert!(validate_coupon_code("SAVE20").is_ok());
/// assert!(validate_coupon_code("").is_err());
/// assert!(validate_coupon_code("SAVE 20").is_err());
/// ```
pub fn validate_coupon_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > MAX_COUPON_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_COUPON_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code.to_ascii_uppercase())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a requested quantity.
///
/// ## Rules
/// - Must be positive (> 0)
///
/// No fixed upper bound: available stock is the only ceiling.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Add Item                                                         │
/// │                                                                         │
/// │  User enters quantity: 5                                               │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       └── OK → stock check inside the cart transaction                 │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a stock level. Zero is allowed (sold out).
pub fn validate_stock(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::OutOfRange {
            field: "available_qty".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a coupon value against its kind.
///
/// ## Rules
/// - Percentage: 1..=10000 basis points
/// - Fixed amount: positive cents
pub fn validate_coupon_value(kind: CouponKind, value: i64) -> ValidationResult<()> {
    match kind {
        CouponKind::Percentage => {
            if !(1..=BASIS_POINTS_PER_WHOLE).contains(&value) {
                return Err(ValidationError::OutOfRange {
                    field: "value".to_string(),
                    min: 1,
                    max: BASIS_POINTS_PER_WHOLE,
                });
            }
        }
        CouponKind::FixedAmount => {
            if value <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "value".to_string(),
                });
            }
        }
    }

    Ok(())
}
