//! # storefront-core: Pure Cart Pricing Logic
//!
//! The rules of the cart engine as pure functions: no database, no locks,
//! no clock reads. Callers hand in the rows they loaded and the current
//! time; this crate decides what the cart looks like afterwards and what it
//! costs.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Cart Engine                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/api (HTTP/JSON)                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        storefront-cart (locks, transactions, retries)           │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────┐  ┌────────────▼────────────────────┐  │
//! │  │ ★ storefront-core ★         │  │ storefront-db                   │  │
//! │  │                             │  │                                 │  │
//! │  │  money     coupon           │  │  variants, coupons, carts       │  │
//! │  │  inventory cart  pricing    │  │  SQLite + migrations            │  │
//! │  │                             │  │                                 │  │
//! │  │  NO I/O • PURE FUNCTIONS    │  │                                 │  │
//! │  └─────────────────────────────┘  └─────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Fixed-point money in minor currency units
//! - [`types`] - Variant, Coupon, Cart and CartItem rows
//! - [`inventory`] - Stock check against a freshly read variant
//! - [`coupon`] - Coupon validator (ordered eligibility rules)
//! - [`cart`] - The cart aggregate and its mutations
//! - [`pricing`] - Quote calculation (subtotal, discount, total)
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::money::Money;
//!
//! let subtotal = Money::from_cents(10_000); // $100.00
//! let discount = subtotal.percentage(1_000); // 10%
//! assert_eq!(discount.cents(), 1_000);
//! ```

pub mod cart;
pub mod coupon;
pub mod error;
pub mod inventory;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

pub use cart::{CartAggregate, ItemChange};
pub use coupon::{CouponDecision, CouponRejection};
pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::StockCheck;
pub use money::Money;
pub use pricing::{CartQuote, QuoteLine};
pub use types::*;

/// Scale of percentage coupon values: 10 000 basis points = 100%.
pub const BASIS_POINTS_PER_WHOLE: i64 = 10_000;
