//! # Coupon Validator
//!
//! Decides whether a coupon applies to a candidate subtotal, and for how
//! much.
//!
//! ## Rule Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  evaluate(coupon, subtotal, now)                                        │
//! │                                                                         │
//! │  1. missing or inactive ──────────────────────► invalid                 │
//! │  2. expires_at < now ─────────────────────────► expired                 │
//! │  3. used_count ≥ max_uses ────────────────────► exhausted               │
//! │  4. subtotal < min_amount ────────────────────► below_minimum           │
//! │       │                                                                 │
//! │       ▼ all pass                                                        │
//! │  percentage:   subtotal × bps / 10000, half-up, capped at subtotal      │
//! │  fixed_amount: min(value, subtotal)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first failing rule wins. Evaluation is pure: it never touches
//! `used_count`. Redemption is a separate atomic statement in storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Coupon, CouponKind};

// =============================================================================
// Decision Types
// =============================================================================

/// Why a coupon does not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CouponRejection {
    /// Missing or deactivated.
    Invalid,
    /// Past its expiry instant.
    Expired,
    /// Redemption limit reached.
    Exhausted,
    /// Subtotal under the coupon's minimum.
    BelowMinimum,
}

impl CouponRejection {
    /// Wire form, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponRejection::Invalid => "invalid",
            CouponRejection::Expired => "expired",
            CouponRejection::Exhausted => "exhausted",
            CouponRejection::BelowMinimum => "below_minimum",
        }
    }
}

impl fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponDecision {
    pub applicable: bool,
    /// Zero whenever `applicable` is false.
    pub discount: Money,
    pub reason: Option<CouponRejection>,
}

impl CouponDecision {
    fn rejected(reason: CouponRejection) -> Self {
        CouponDecision {
            applicable: false,
            discount: Money::zero(),
            reason: Some(reason),
        }
    }

    fn applies(discount: Money) -> Self {
        CouponDecision {
            applicable: true,
            discount,
            reason: None,
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Runs the eligibility rules and computes the discount.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use storefront_core::coupon::{evaluate, CouponRejection};
/// use storefront_core::money::Money;
///
/// // No coupon row at all
/// let decision = evaluate(None, Money::from_cents(10_000), Utc::now());
/// assert_eq!(decision.reason, Some(CouponRejection::Invalid));
/// assert!(decision.discount.is_zero());
/// ```
pub fn evaluate(coupon: Option<&Coupon>, subtotal: Money, now: DateTime<Utc>) -> CouponDecision {
    let coupon = match coupon {
        Some(c) if c.is_active => c,
        _ => return CouponDecision::rejected(CouponRejection::Invalid),
    };

    if matches!(coupon.expires_at, Some(expires_at) if expires_at < now) {
        return CouponDecision::rejected(CouponRejection::Expired);
    }

    if matches!(coupon.max_uses, Some(max_uses) if coupon.used_count >= max_uses) {
        return CouponDecision::rejected(CouponRejection::Exhausted);
    }

    if matches!(coupon.min_amount(), Some(min) if subtotal < min) {
        return CouponDecision::rejected(CouponRejection::BelowMinimum);
    }

    CouponDecision::applies(discount_for(coupon, subtotal))
}

/// Discount for a coupon that already passed the rules.
fn discount_for(coupon: &Coupon, subtotal: Money) -> Money {
    if subtotal.is_negative() || subtotal.is_zero() {
        return Money::zero();
    }

    let raw = match coupon.kind {
        CouponKind::Percentage => subtotal.percentage(coupon.value),
        CouponKind::FixedAmount => Money::from_cents(coupon.value),
    };

    raw.clamp(Money::zero(), subtotal)
}

/// Applying a coupon to a cart: the strict form of [`evaluate`].
///
/// ## Errors
/// ```text
/// no row / inactive ──► CouponNotFound(code)
/// any other rule    ──► InvalidCoupon { code, reason }
/// ```
pub fn ensure_applicable(
    code: &str,
    coupon: Option<&Coupon>,
    subtotal: Money,
    now: DateTime<Utc>,
) -> CoreResult<Money> {
    let coupon = match coupon {
        Some(c) if c.is_active => c,
        _ => return Err(CoreError::CouponNotFound(code.to_string())),
    };

    let decision = evaluate(Some(coupon), subtotal, now);
    match decision.reason {
        None => Ok(decision.discount),
        Some(reason) => Err(CoreError::InvalidCoupon {
            code: coupon.code.clone(),
            reason,
        }),
    }
}
