//! # Cart Service Errors
//!
//! The taxonomy callers of [`CartService`](crate::CartService) see.
//!
//! ## Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CoreError::VariantNotFound / CartItemNotFound /                        │
//! │            CouponNotFound / CartNotFound      ──► NotFound              │
//! │  CoreError::InsufficientStock                 ──► InsufficientStock     │
//! │  CoreError::InvalidCoupon                     ──► InvalidCoupon         │
//! │  CoreError::Validation / ValidationError      ──► Validation            │
//! │                                                                         │
//! │  DbError::NotFound                            ──► NotFound              │
//! │  DbError::Invalid                             ──► Validation            │
//! │  DbError::Busy / PoolExhausted                ──► StorageUnavailable    │
//! │                                                   { transient: true }   │
//! │  any other DbError                            ──► StorageUnavailable    │
//! │                                                   { transient: false }  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only transient storage failures are retried, and only by re-running the
//! whole transaction.

use storefront_core::{CoreError, CouponRejection, ValidationError};
use storefront_db::DbError;
use thiserror::Error;

/// Errors returned by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Unknown variant, item, coupon or cart.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Requested (or merged) quantity exceeds available stock.
    #[error("Insufficient stock for variant {variant_id}: available {available}, requested {requested}")]
    InsufficientStock {
        variant_id: String,
        available: i64,
        requested: i64,
    },

    /// The coupon exists but fails an eligibility rule.
    #[error("Coupon {code} cannot be applied: {reason}")]
    InvalidCoupon {
        code: String,
        reason: CouponRejection,
    },

    /// Malformed input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage could not complete the transaction.
    #[error("Storage unavailable: {reason}")]
    StorageUnavailable { reason: String, transient: bool },
}

impl CartError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CartError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether the failed transaction may be run again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CartError::StorageUnavailable { transient: true, .. })
    }
}

impl From<CoreError> for CartError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::VariantNotFound(id) => CartError::not_found("Variant", id),
            CoreError::CartItemNotFound(id) => CartError::not_found("CartItem", id),
            CoreError::CouponNotFound(code) => CartError::not_found("Coupon", code),
            CoreError::CartNotFound(user_id) => CartError::not_found("Cart", user_id),
            CoreError::InsufficientStock {
                variant_id,
                available,
                requested,
            } => CartError::InsufficientStock {
                variant_id,
                available,
                requested,
            },
            CoreError::InvalidCoupon { code, reason } => CartError::InvalidCoupon { code, reason },
            CoreError::Validation(e) => CartError::Validation(e),
        }
    }
}

impl From<DbError> for CartError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CartError::NotFound { entity, id },
            DbError::Invalid(e) => CartError::Validation(e),
            other => CartError::StorageUnavailable {
                transient: other.is_transient(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<sqlx::Error> for CartError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

/// Result type for cart operations.
pub type CartResult<T> = Result<T, CartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_storage_is_retryable() {
        let busy: CartError = DbError::Busy("database is locked".into()).into();
        assert!(busy.is_retryable());

        let pool: CartError = DbError::PoolExhausted.into();
        assert!(pool.is_retryable());

        let broken: CartError = DbError::QueryFailed("no such table".into()).into();
        assert!(matches!(broken, CartError::StorageUnavailable { transient: false, .. }));
        assert!(!broken.is_retryable());

        let stock: CartError = CoreError::InsufficientStock {
            variant_id: "v-1".into(),
            available: 3,
            requested: 4,
        }
        .into();
        assert!(!stock.is_retryable());
    }

    #[test]
    fn test_core_not_found_variants_collapse() {
        let err: CartError = CoreError::CartItemNotFound("item-9".into()).into();
        assert!(matches!(err, CartError::NotFound { ref entity, ref id }
            if entity == "CartItem" && id == "item-9"));

        let err: CartError = DbError::not_found("Variant", "v-1").into();
        assert!(matches!(err, CartError::NotFound { .. }));

        let err: CartError = DbError::from(ValidationError::MustBePositive {
            field: "value".into(),
        })
        .into();
        assert!(matches!(err, CartError::Validation(_)));
        assert!(!err.is_retryable());
    }
}
