//! # Domain Types
//!
//! Rows the cart engine reads and writes.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog (read-only here)          Cart (owned here)                    │
//! │  ┌─────────────────┐               ┌─────────────────┐                  │
//! │  │    Variant      │               │      Cart       │  one per user    │
//! │  │  ─────────────  │               │  ─────────────  │                  │
//! │  │  id, sku, name  │               │  user_id        │                  │
//! │  │  price_cents    │               │  coupon_code?   │                  │
//! │  │  available_qty  │               │  version        │                  │
//! │  └────────┬────────┘               └────────┬────────┘                  │
//! │           │ variant_id                      │ cart_id                   │
//! │           │        ┌─────────────────┐      │                           │
//! │           └───────►│    CartItem     │◄─────┘                           │
//! │                    │  ─────────────  │  unique (cart_id, variant_id)    │
//! │                    │  quantity ≥ 1   │                                  │
//! │                    │  price_snapshot │                                  │
//! │                    └─────────────────┘                                  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │     Coupon      │   │   CouponKind    │                              │
//! │  │  code (unique)  │   │  Percentage     │  value in basis points       │
//! │  │  kind, value    │   │  FixedAmount    │  value in cents              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A cart item freezes the unit price when it is added or its quantity
//! changes. Later catalog price edits do not move an existing line until the
//! customer touches it again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Variant
// =============================================================================

/// A purchasable variant of a product (size, colour, storage tier...).
///
/// Owned by the catalog. The cart engine reads it fresh inside every
/// mutation and never writes it, except through the checkout-side stock
/// decrement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning product.
    pub product_id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Current unit price in cents.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub available_qty: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    /// Returns the current unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// How a coupon's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// `value` is basis points of the subtotal (1000 = 10%).
    Percentage,
    /// `value` is cents off the subtotal (2000 = $20.00).
    FixedAmount,
}

impl CouponKind {
    /// Column representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponKind::Percentage => "percentage",
            CouponKind::FixedAmount => "fixed_amount",
        }
    }
}

/// A discount code, global across users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: String,

    /// Customer-facing code, unique (e.g. `WELCOME10`).
    pub code: String,

    pub kind: CouponKind,

    /// Basis points for [`CouponKind::Percentage`], cents for
    /// [`CouponKind::FixedAmount`].
    pub value: i64,

    /// Minimum subtotal in cents for the coupon to apply.
    pub min_amount_cents: Option<i64>,

    /// Redemption limit. `None` means unlimited.
    pub max_uses: Option<i64>,

    /// Redemptions so far. Only written by the atomic redeem statement.
    pub used_count: i64,

    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,

    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Returns the minimum subtotal as Money, if any.
    #[inline]
    pub fn min_amount(&self) -> Option<Money> {
        self.min_amount_cents.map(Money::from_cents)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The per-user cart header row.
///
/// Created lazily on first access and never deleted, only emptied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,

    /// Opaque identity from the auth service; unique.
    pub user_id: String,

    /// Attached coupon, by code. Resolved fresh on every quote.
    pub coupon_code: Option<String>,

    /// Bumped by every mutation.
    pub version: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Cart Item
// =============================================================================

/// A line in a cart. At most one per (cart, variant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub cart_id: String,
    pub variant_id: String,
    /// Always ≥ 1. Removing the line is the only way to reach zero.
    pub quantity: i64,
    /// Unit price frozen at add / last quantity change.
    pub price_snapshot_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Returns the snapshot unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.price_snapshot_cents)
    }

    /// Snapshot price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart Line (read model)
// =============================================================================

/// A cart item joined with its variant's current catalog state.
///
/// Input to the quote; never written.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartLine {
    pub item_id: String,
    pub variant_id: String,
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub price_snapshot_cents: i64,
    pub current_price_cents: i64,
    pub available_qty: i64,
}

impl CartLine {
    /// Snapshot price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.price_snapshot_cents).multiply_quantity(self.quantity)
    }
}
