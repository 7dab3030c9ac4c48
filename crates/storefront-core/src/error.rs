//! # Error Types
//!
//! Domain error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core (this file)                                           │
//! │  ├── CoreError        - Cart rule violations                           │
//! │  └── ValidationError  - Malformed input                                │
//! │                                                                         │
//! │  storefront-db                                                         │
//! │  └── DbError          - Storage failures                               │
//! │                                                                         │
//! │  storefront-cart                                                       │
//! │  └── CartError        - What callers of the façade see                 │
//! │                                                                         │
//! │  apps/api                                                              │
//! │  └── ApiError         - JSON body + HTTP status                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::coupon::CouponRejection;

// =============================================================================
// Core Error
// =============================================================================

/// Cart rule violations.
///
/// Every variant is client-correctable: retrying the same request against
/// the same state fails the same way.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The variant id does not resolve in the catalog.
    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    /// The item id is not a line of this user's cart.
    #[error("Cart item not found: {0}")]
    CartItemNotFound(String),

    /// The coupon code does not resolve to an active coupon.
    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    /// The user has never had a cart.
    #[error("Cart not found for user {0}")]
    CartNotFound(String),

    /// Requested (or merged) quantity exceeds current available stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty: 2, already in cart: 2)
    ///      │
    ///      ▼
    /// Check stock: available=3, requested=4
    ///      │
    ///      ▼
    /// InsufficientStock { available: 3, requested: 4 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 left in stock"
    /// ```
    #[error("Insufficient stock for variant {variant_id}: available {available}, requested {requested}")]
    InsufficientStock {
        variant_id: String,
        available: i64,
        requested: i64,
    },

    /// The coupon exists but does not apply to this cart right now.
    #[error("Coupon {code} cannot be applied: {reason}")]
    InvalidCoupon {
        code: String,
        reason: CouponRejection,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any storage access.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
