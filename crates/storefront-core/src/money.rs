//! # Money Module
//!
//! Fixed-point money for cart arithmetic.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    29.99 × 3 = 89.97000000000001  in binary floating point             │
//! │                                                                         │
//! │  A cart total computed that way drifts from what the customer sees.    │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    2999 cents × 3 = 8997 cents, exactly                                │
//! │    Percentages are applied once, with explicit half-up rounding        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::money::Money;
//!
//! let price = Money::from_cents(2999);        // $29.99
//! let line = price.multiply_quantity(3);      // $89.97
//! let discount = line.percentage(1000);       // 10% → $9.00 (rounded)
//! assert_eq!((line - discount).cents(), 8097);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

use crate::BASIS_POINTS_PER_WHOLE;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents for USD).
///
/// ## Where Money Flows
/// ```text
/// Variant.price_cents ──► CartItem.price_snapshot_cents ──► line total
///                                                              │
///                                 Σ lines ──► subtotal ────────┤
///                                                              ▼
///                          Coupon rule ──► discount ──► total = max(0, subtotal − discount)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole and fractional units.
    ///
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(999, 99).cents(), 99_999);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the fractional portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Unit price times quantity.
    ///
    /// ## Overflow
    /// Saturates instead of wrapping. A saturated line total still fails
    /// every sane stock or price check downstream.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Returns `bps` basis points of this amount, rounded half-up to the cent.
    ///
    /// ## Rounding
    /// Integer math in i128: `(cents × bps + 5000) / 10000`.
    ///
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// // 10% of $100.00
    /// assert_eq!(Money::from_cents(10_000).percentage(1_000).cents(), 1_000);
    /// // 15% of $0.99 = 14.85¢ → 15¢
    /// assert_eq!(Money::from_cents(99).percentage(1_500).cents(), 15);
    /// ```
    pub fn percentage(&self, bps: i64) -> Money {
        let scale = BASIS_POINTS_PER_WHOLE as i128;
        let part = (self.0 as i128 * bps as i128 + scale / 2) / scale;
        Money(part.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// Subtraction floored at zero.
    ///
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// let total = Money::from_cents(1500).saturating_sub_to_zero(Money::from_cents(2000));
    /// assert!(total.is_zero());
    /// ```
    #[inline]
    pub fn saturating_sub_to_zero(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented formatting; the frontend does its own localisation.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}
