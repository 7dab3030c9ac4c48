//! # Cart Aggregate
//!
//! A cart header plus its items, mutated as one unit.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Aggregate Operations                            │
//! │                                                                         │
//! │  Operation             Check                      Change                │
//! │  ─────────             ─────                      ──────                │
//! │                                                                         │
//! │  add_item(v, n) ─────► existing + n ≤ stock ────► Added / merged        │
//! │                                                   QuantityChanged       │
//! │                                                                         │
//! │  update_quantity(i,n)► item in cart, n ≤ stock ─► QuantityChanged       │
//! │                                                                         │
//! │  remove_item(i) ─────► item in cart ────────────► Removed               │
//! │                                                                         │
//! │  attach / detach coupon, clear                                          │
//! │                                                                         │
//! │  Every quantity write re-snapshots the unit price from the variant.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations validate first and only then touch `self`, so a failed call
//! leaves the aggregate unchanged. Each returns an [`ItemChange`] that the
//! storage layer persists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::inventory::check_available;
use crate::money::Money;
use crate::types::{Cart, CartItem, Variant};
use crate::validation::validate_quantity;

/// A persisted effect of one item mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemChange {
    /// A new line was created.
    Added(CartItem),
    /// An existing line got a new quantity (and a fresh price snapshot).
    QuantityChanged(CartItem),
    /// The line with this id was deleted.
    Removed(String),
}

impl ItemChange {
    /// The id of the line this change touches.
    pub fn item_id(&self) -> &str {
        match self {
            ItemChange::Added(item) | ItemChange::QuantityChanged(item) => &item.id,
            ItemChange::Removed(id) => id,
        }
    }
}

/// A cart and its items.
///
/// ## Invariants
/// - Items are unique by `variant_id` (adding the same variant merges)
/// - Every item has `quantity ≥ 1`
/// - At the moment of each mutation, the touched item's quantity does not
///   exceed the variant's available stock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartAggregate {
    pub cart: Cart,
    pub items: Vec<CartItem>,
}

impl CartAggregate {
    pub fn new(cart: Cart, items: Vec<CartItem>) -> Self {
        CartAggregate { cart, items }
    }

    /// Adds `quantity` units of `variant`, merging into an existing line.
    ///
    /// ## Behavior
    /// - Variant already in cart: quantity becomes `existing + quantity`
    /// - Otherwise: a new line is created
    /// - Either way the price snapshot is set to the variant's current price
    ///
    /// ## Errors
    /// - `Validation` if `quantity ≤ 0`
    /// - `InsufficientStock` if the resulting quantity exceeds stock
    pub fn add_item(
        &mut self,
        variant: &Variant,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<ItemChange> {
        validate_quantity(quantity)?;

        let existing = self.items.iter().position(|i| i.variant_id == variant.id);
        let merged = match existing {
            Some(idx) => self.items[idx].quantity.checked_add(quantity).ok_or_else(|| {
                ValidationError::OutOfRange {
                    field: "quantity".to_string(),
                    min: 1,
                    max: i64::MAX,
                }
            })?,
            None => quantity,
        };

        check_available(variant, merged).into_result(&variant.id)?;

        match existing {
            Some(idx) => {
                let item = &mut self.items[idx];
                item.quantity = merged;
                item.price_snapshot_cents = variant.price_cents;
                item.updated_at = now;
                Ok(ItemChange::QuantityChanged(item.clone()))
            }
            None => {
                let item = CartItem {
                    id: Uuid::new_v4().to_string(),
                    cart_id: self.cart.id.clone(),
                    variant_id: variant.id.clone(),
                    quantity,
                    price_snapshot_cents: variant.price_cents,
                    created_at: now,
                    updated_at: now,
                };
                self.items.push(item.clone());
                Ok(ItemChange::Added(item))
            }
        }
    }

    /// Sets an existing line's quantity.
    ///
    /// `variant` must be the line's variant, read fresh by the caller.
    ///
    /// ## Errors
    /// - `Validation` if `quantity ≤ 0` (removal is its own operation)
    /// - `CartItemNotFound` if `item_id` is not in this cart
    /// - `InsufficientStock` if `quantity` exceeds stock
    pub fn update_quantity(
        &mut self,
        item_id: &str,
        quantity: i64,
        variant: &Variant,
        now: DateTime<Utc>,
    ) -> CoreResult<ItemChange> {
        validate_quantity(quantity)?;

        let idx = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| CoreError::CartItemNotFound(item_id.to_string()))?;

        if self.items[idx].variant_id != variant.id {
            return Err(CoreError::VariantNotFound(self.items[idx].variant_id.clone()));
        }

        check_available(variant, quantity).into_result(&variant.id)?;

        let item = &mut self.items[idx];
        item.quantity = quantity;
        item.price_snapshot_cents = variant.price_cents;
        item.updated_at = now;
        Ok(ItemChange::QuantityChanged(item.clone()))
    }

    /// Deletes a line.
    pub fn remove_item(&mut self, item_id: &str) -> CoreResult<ItemChange> {
        let idx = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| CoreError::CartItemNotFound(item_id.to_string()))?;

        let removed = self.items.remove(idx);
        Ok(ItemChange::Removed(removed.id))
    }

    /// Stores a coupon code, replacing any previous one.
    pub fn attach_coupon(&mut self, code: impl Into<String>) {
        self.cart.coupon_code = Some(code.into());
    }

    /// Clears the coupon. Returns whether one was attached.
    pub fn detach_coupon(&mut self) -> bool {
        self.cart.coupon_code.take().is_some()
    }

    /// Drops every item and the coupon.
    pub fn clear(&mut self) {
        self.items.clear();
        self.cart.coupon_code = None;
    }

    /// Looks up a line by id.
    pub fn find_item(&self, item_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Σ snapshot × quantity.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Total units across lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
