//! # Inventory Check
//!
//! The pure half of the inventory ledger: given a variant row read inside
//! the current transaction, can the cart hold `requested` units of it?
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  No soft reservations                                                   │
//! │                                                                         │
//! │  cart tx ──► read variant ──► check_available ──► write cart item       │
//! │                                   │                                     │
//! │                                   └── requested > available?            │
//! │                                          └─► InsufficientStock          │
//! │                                                                         │
//! │  Stock is only decremented at checkout.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::Variant;

/// Result of a stock check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockCheck {
    pub ok: bool,
    pub available_qty: i64,
    pub requested_qty: i64,
}

impl StockCheck {
    /// Converts a failed check into [`CoreError::InsufficientStock`].
    pub fn into_result(self, variant_id: &str) -> CoreResult<StockCheck> {
        if self.ok {
            Ok(self)
        } else {
            Err(CoreError::InsufficientStock {
                variant_id: variant_id.to_string(),
                available: self.available_qty,
                requested: self.requested_qty,
            })
        }
    }
}

/// Checks `requested` against the variant's available quantity.
///
/// ```rust
/// # use chrono::Utc;
/// # use storefront_core::types::Variant;
/// use storefront_core::inventory::check_available;
/// # let now = Utc::now();
/// # let variant = Variant {
/// #     id: "v-1".into(), product_id: "p-1".into(), sku: "TS-M".into(),
/// #     name: "T-Shirt M".into(), price_cents: 2999, available_qty: 3,
/// #     created_at: now, updated_at: now,
/// # };
///
/// assert!(check_available(&variant, 3).ok);
/// assert!(!check_available(&variant, 4).ok);
/// ```
pub fn check_available(variant: &Variant, requested: i64) -> StockCheck {
    StockCheck {
        ok: requested <= variant.available_qty,
        available_qty: variant.available_qty,
        requested_qty: requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn variant(available: i64) -> Variant {
        let now = Utc::now();
        Variant {
            id: "v-1".to_string(),
            product_id: "p-1".to_string(),
            sku: "TS-M".to_string(),
            name: "T-Shirt M".to_string(),
            price_cents: 2999,
            available_qty: available,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_exact_stock_is_ok() {
        let check = check_available(&variant(3), 3);
        assert!(check.ok);
        assert_eq!(check.available_qty, 3);
    }

    #[test]
    fn test_over_stock_fails_with_counts() {
        let err = check_available(&variant(3), 4).into_result("v-1").unwrap_err();
        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 3);
                assert_eq!(requested, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sold_out() {
        assert!(!check_available(&variant(0), 1).ok);
    }
}
