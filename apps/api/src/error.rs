//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  handler ──► CartService ──► Result<CartQuote, CartError>               │
//! │                                      │                                  │
//! │                                      ▼                                  │
//! │                           From<CartError> for ApiError                  │
//! │                                      │                                  │
//! │                                      ▼                                  │
//! │  HTTP status + { "code": "INSUFFICIENT_STOCK",                          │
//! │                  "message": "...",                                      │
//! │                  "availableQty": 3 }                                    │
//! │                                                                         │
//! │  Storage failures are logged with detail and returned generically.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use storefront_cart::CartError;
use storefront_core::CouponRejection;

/// Error body returned by every failing route.
///
/// ```json
/// {
///   "code": "INVALID_COUPON",
///   "message": "Coupon WELCOME10 cannot be applied: below_minimum",
///   "reason": "below_minimum"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Stock left, on `INSUFFICIENT_STOCK`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_qty: Option<i64>,

    /// Failed coupon rule, on `INVALID_COUPON`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<CouponRejection>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Unknown variant, item, coupon or cart (404)
    NotFound,

    /// Not enough stock (409)
    InsufficientStock,

    /// Coupon fails an eligibility rule (422)
    InvalidCoupon,

    /// Input validation failed (400)
    ValidationError,

    /// Missing or bad bearer token (401)
    Unauthorized,

    /// Storage could not complete the request (503)
    StorageUnavailable,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InsufficientStock => StatusCode::CONFLICT,
            ErrorCode::InvalidCoupon => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            available_qty: None,
            reason: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

/// Converts cart errors to API errors.
impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        let message = err.to_string();
        match err {
            CartError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, message),
            CartError::InsufficientStock { available, .. } => ApiError {
                available_qty: Some(available),
                ..ApiError::new(ErrorCode::InsufficientStock, message)
            },
            CartError::InvalidCoupon { reason, .. } => ApiError {
                reason: Some(reason),
                ..ApiError::new(ErrorCode::InvalidCoupon, message)
            },
            CartError::Validation(_) => ApiError::new(ErrorCode::ValidationError, message),
            CartError::StorageUnavailable { reason, transient } => {
                // Log the actual error but return a generic message
                tracing::error!(transient, "Cart storage failure: {}", reason);
                ApiError::new(
                    ErrorCode::StorageUnavailable,
                    "Storage is temporarily unavailable",
                )
            }
        }
    }
}

/// Malformed or missing JSON bodies.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
