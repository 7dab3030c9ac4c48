//! # Pricing Calculator
//!
//! Turns a cart, its lines and its (freshly read) coupon into the quote the
//! client sees. Recomputed on every read and after every mutation; nothing
//! here is ever stored.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  lines ──► Σ price_snapshot × quantity ──► subtotal                     │
//! │                                               │                         │
//! │  cart.coupon_code? ──no──► discount = 0       │                         │
//! │        │                                      │                         │
//! │       yes                                     │                         │
//! │        ▼                                      ▼                         │
//! │  coupon::evaluate(coupon, subtotal, now) ──► discount (0 if rejected)   │
//! │                                               │                         │
//! │                                               ▼                         │
//! │                          total = max(0, subtotal − discount)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::coupon::{evaluate, CouponRejection};
use crate::money::Money;
use crate::types::{Cart, CartLine, Coupon};

// =============================================================================
// Quote DTOs
// =============================================================================

/// One priced line of a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub item_id: String,
    pub variant_id: String,
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    /// Snapshot unit price; what the customer pays.
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    /// Catalog price right now. May differ from the snapshot.
    pub current_price_cents: i64,
    pub available_qty: i64,
}

impl From<&CartLine> for QuoteLine {
    fn from(line: &CartLine) -> Self {
        QuoteLine {
            item_id: line.item_id.clone(),
            variant_id: line.variant_id.clone(),
            product_id: line.product_id.clone(),
            sku: line.sku.clone(),
            name: line.name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.price_snapshot_cents,
            line_total_cents: line.line_total().cents(),
            current_price_cents: line.current_price_cents,
            available_qty: line.available_qty,
        }
    }
}

/// The priced view of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartQuote {
    pub cart_id: String,
    pub user_id: String,
    pub version: i64,
    pub items: Vec<QuoteLine>,
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub coupon_code: Option<String>,
    /// Set when a coupon is attached but does not apply right now.
    pub coupon_rejection: Option<CouponRejection>,
}

impl CartQuote {
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Calculation
// =============================================================================

/// Prices a cart.
///
/// `coupon` is the row for `cart.coupon_code`, re-read by the caller; it is
/// ignored when the cart has no code attached.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use storefront_core::pricing::quote;
/// use storefront_core::types::Cart;
///
/// let now = Utc::now();
/// let cart = Cart {
///     id: "c-1".into(), user_id: "u-1".into(), coupon_code: None,
///     version: 1, created_at: now, updated_at: now,
/// };
/// let q = quote(&cart, &[], None, now);
/// assert_eq!(q.total_cents, 0);
/// assert!(q.items.is_empty());
/// ```
pub fn quote(
    cart: &Cart,
    lines: &[CartLine],
    coupon: Option<&Coupon>,
    now: DateTime<Utc>,
) -> CartQuote {
    let items: Vec<QuoteLine> = lines.iter().map(QuoteLine::from).collect();
    let subtotal: Money = lines.iter().map(CartLine::line_total).sum();

    let (discount, rejection) = match cart.coupon_code {
        Some(_) => {
            let decision = evaluate(coupon, subtotal, now);
            (decision.discount, decision.reason)
        }
        None => (Money::zero(), None),
    };

    let total = subtotal.saturating_sub_to_zero(discount);

    CartQuote {
        cart_id: cart.id.clone(),
        user_id: cart.user_id.clone(),
        version: cart.version,
        item_count: items.len(),
        total_quantity: lines.iter().map(|l| l.quantity).sum(),
        items,
        subtotal_cents: subtotal.cents(),
        discount_cents: discount.cents(),
        total_cents: total.cents(),
        coupon_code: cart.coupon_code.clone(),
        coupon_rejection: rejection,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CouponKind;
    use chrono::Duration;

    fn cart(coupon_code: Option<&str>) -> Cart {
        let now = Utc::now();
        Cart {
            id: "cart-1".to_string(),
            user_id: "user-1".to_string(),
            coupon_code: coupon_code.map(str::to_string),
            version: 3,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(id: &str, snapshot: i64, current: i64, qty: i64) -> CartLine {
        CartLine {
            item_id: format!("item-{}", id),
            variant_id: format!("v-{}", id),
            product_id: "p-1".to_string(),
            sku: format!("SKU-{}", id),
            name: format!("Variant {}", id),
            quantity: qty,
            price_snapshot_cents: snapshot,
            current_price_cents: current,
            available_qty: 10,
        }
    }

    fn coupon(code: &str, kind: CouponKind, value: i64, min: Option<i64>) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: format!("c-{}", code),
            code: code.to_string(),
            kind,
            value,
            min_amount_cents: min,
            max_uses: None,
            used_count: 0,
            expires_at: Some(now + Duration::days(30)),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_subtotal_uses_snapshots() {
        let lines = [line("1", 2999, 3499, 2), line("2", 500, 500, 1)];
        let q = quote(&cart(None), &lines, None, Utc::now());

        assert_eq!(q.subtotal_cents, 6498);
        assert_eq!(q.discount_cents, 0);
        assert_eq!(q.total_cents, 6498);
        assert_eq!(q.items[0].unit_price_cents, 2999);
        assert_eq!(q.items[0].current_price_cents, 3499);
        assert_eq!(q.item_count, 2);
        assert_eq!(q.total_quantity, 3);
        assert_eq!(q.version, 3);
    }

    #[test]
    fn test_welcome10_on_100() {
        let c = coupon("WELCOME10", CouponKind::Percentage, 1_000, Some(5_000));
        let q = quote(
            &cart(Some("WELCOME10")),
            &[line("1", 10_000, 10_000, 1)],
            Some(&c),
            Utc::now(),
        );
        assert_eq!(q.discount_cents, 1_000);
        assert_eq!(q.total_cents, 9_000);
        assert_eq!(q.coupon_rejection, None);
    }

    #[test]
    fn test_save20_on_15_floors_total_at_zero() {
        let c = coupon("SAVE20", CouponKind::FixedAmount, 2_000, None);
        let q = quote(
            &cart(Some("SAVE20")),
            &[line("1", 1_500, 1_500, 1)],
            Some(&c),
            Utc::now(),
        );
        assert_eq!(q.discount_cents, 1_500);
        assert_eq!(q.total_cents, 0);
    }

    #[test]
    fn test_attached_coupon_that_no_longer_applies() {
        let now = Utc::now();
        let mut c = coupon("WELCOME10", CouponKind::Percentage, 1_000, None);
        c.expires_at = Some(now - Duration::seconds(1));

        let q = quote(
            &cart(Some("WELCOME10")),
            &[line("1", 10_000, 10_000, 1)],
            Some(&c),
            now,
        );
        assert_eq!(q.discount_cents, 0);
        assert_eq!(q.total_cents, 10_000);
        assert_eq!(q.coupon_code.as_deref(), Some("WELCOME10"));
        assert_eq!(q.coupon_rejection, Some(CouponRejection::Expired));
    }

    #[test]
    fn test_attached_coupon_deleted_from_catalog() {
        let q = quote(
            &cart(Some("GONE")),
            &[line("1", 1_000, 1_000, 1)],
            None,
            Utc::now(),
        );
        assert_eq!(q.discount_cents, 0);
        assert_eq!(q.coupon_rejection, Some(CouponRejection::Invalid));
    }

    #[test]
    fn test_quote_json_is_camel_case() {
        let q = quote(&cart(None), &[line("1", 100, 100, 1)], None, Utc::now());
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["subtotalCents"], 100);
        assert_eq!(json["items"][0]["lineTotalCents"], 100);
        assert!(json["couponCode"].is_null());
    }
}
