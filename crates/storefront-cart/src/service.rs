//! # Cart Service
//!
//! The public cart operations. Each runs atomically with respect to every
//! other operation on the same cart.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  add_item(user, variant, qty)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate input ──────────────────────────► Validation (no retry)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  locks.acquire(user)           same-cart operations queue here          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─ retry (backoff, transient storage errors only) ────────────────┐   │
//! │  │  BEGIN                                                          │   │
//! │  │    carts.ensure_cart      write first: takes SQLite write lock  │   │
//! │  │    carts.items            load aggregate                        │   │
//! │  │    ledger.variant         fresh stock + price                   │   │
//! │  │    aggregate.add_item     merge, stock check, snapshot          │   │
//! │  │    carts.apply_change     persist                               │   │
//! │  │    quote                  lines + fresh coupon → CartQuote      │   │
//! │  │  COMMIT                   (any error: dropped tx rolls back)    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CartQuote                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use sqlx::SqliteConnection;
use storefront_core::coupon::ensure_applicable;
use storefront_core::inventory::StockCheck;
use storefront_core::pricing::quote;
use storefront_core::validation::{normalize_coupon_code, validate_identifier, validate_quantity};
use storefront_core::{Cart, CartAggregate, CartQuote};
use storefront_db::Database;
use tracing::{debug, info};

use crate::error::{CartError, CartResult};
use crate::ledger::InventoryLedger;
use crate::locks::CartLocks;
use crate::retry::{with_retry, CartServiceConfig};

/// Cart Service Façade.
///
/// Cheap to clone; clones share the lock registry.
///
/// ## Usage
/// ```rust,ignore
/// let service = CartService::new(db, CartServiceConfig::default());
///
/// let quote = service.add_item("user-1", &variant_id, 2).await?;
/// let quote = service.apply_coupon("user-1", "WELCOME10").await?;
/// println!("total: {}", quote.total());
/// ```
#[derive(Debug, Clone)]
pub struct CartService {
    db: Database,
    ledger: InventoryLedger,
    locks: Arc<CartLocks>,
    config: CartServiceConfig,
}

impl CartService {
    pub fn new(db: Database, config: CartServiceConfig) -> Self {
        CartService {
            ledger: InventoryLedger::new(db.clone()),
            locks: Arc::new(CartLocks::new()),
            db,
            config,
        }
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn config(&self) -> &CartServiceConfig {
        &self.config
    }

    // =========================================================================
    // Public operations
    // =========================================================================

    /// Loads the user's cart, creating an empty one on first access.
    pub async fn get_cart(&self, user_id: &str) -> CartResult<CartQuote> {
        let user_id = validate_identifier("user_id", user_id)?;

        self.with_cart(user_id, "get_cart", || self.get_cart_once(user_id))
            .await
    }

    /// Adds `quantity` units of a variant, merging into an existing line.
    pub async fn add_item(
        &self,
        user_id: &str,
        variant_id: &str,
        quantity: i64,
    ) -> CartResult<CartQuote> {
        let user_id = validate_identifier("user_id", user_id)?;
        let variant_id = validate_identifier("variant_id", variant_id)?;
        validate_quantity(quantity)?;

        let quote = self
            .with_cart(user_id, "add_item", || {
                self.add_item_once(user_id, variant_id, quantity)
            })
            .await?;

        info!(user_id = %user_id, variant_id = %variant_id, quantity, "Item added to cart");
        Ok(quote)
    }

    /// Sets the quantity of a line in the user's cart.
    pub async fn update_item_quantity(
        &self,
        user_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> CartResult<CartQuote> {
        let user_id = validate_identifier("user_id", user_id)?;
        let item_id = validate_identifier("item_id", item_id)?;
        validate_quantity(quantity)?;

        let quote = self
            .with_cart(user_id, "update_item_quantity", || {
                self.update_item_once(user_id, item_id, quantity)
            })
            .await?;

        info!(user_id = %user_id, item_id = %item_id, quantity, "Cart item quantity updated");
        Ok(quote)
    }

    /// Removes a line from the user's cart.
    pub async fn remove_item(&self, user_id: &str, item_id: &str) -> CartResult<CartQuote> {
        let user_id = validate_identifier("user_id", user_id)?;
        let item_id = validate_identifier("item_id", item_id)?;

        let quote = self
            .with_cart(user_id, "remove_item", || self.remove_item_once(user_id, item_id))
            .await?;

        info!(user_id = %user_id, item_id = %item_id, "Item removed from cart");
        Ok(quote)
    }

    /// Validates a coupon against the current subtotal and attaches it,
    /// replacing any previous one.
    pub async fn apply_coupon(&self, user_id: &str, code: &str) -> CartResult<CartQuote> {
        let user_id = validate_identifier("user_id", user_id)?;
        let code = normalize_coupon_code(code)?;

        let quote = self
            .with_cart(user_id, "apply_coupon", || self.apply_coupon_once(user_id, &code))
            .await?;

        info!(user_id = %user_id, code = %code, discount_cents = quote.discount_cents, "Coupon applied");
        Ok(quote)
    }

    /// Detaches the coupon. Idempotent.
    pub async fn remove_coupon(&self, user_id: &str) -> CartResult<CartQuote> {
        let user_id = validate_identifier("user_id", user_id)?;

        let quote = self
            .with_cart(user_id, "remove_coupon", || self.remove_coupon_once(user_id))
            .await?;

        info!(user_id = %user_id, "Coupon removed");
        Ok(quote)
    }

    /// Deletes every line and the coupon in one step.
    ///
    /// ## Errors
    /// `NotFound` only if the user never had a cart.
    pub async fn clear_cart(&self, user_id: &str) -> CartResult<CartQuote> {
        let user_id = validate_identifier("user_id", user_id)?;

        let quote = self
            .with_cart(user_id, "clear_cart", || self.clear_cart_once(user_id))
            .await?;

        info!(user_id = %user_id, "Cart cleared");
        Ok(quote)
    }

    /// Stock check outside any cart (product pages, availability badges).
    pub async fn check_available(&self, variant_id: &str, requested: i64) -> CartResult<StockCheck> {
        let variant_id = validate_identifier("variant_id", variant_id)?;
        validate_quantity(requested)?;

        self.retrying("check_available", || self.check_available_once(variant_id, requested))
            .await
    }

    /// Takes stock out at checkout. See [`InventoryLedger::decrement_stock`].
    pub async fn decrement_stock(&self, variant_id: &str, qty: i64) -> CartResult<bool> {
        let variant_id = validate_identifier("variant_id", variant_id)?;
        self.retrying("decrement_stock", || self.ledger.decrement_stock(variant_id, qty))
            .await
    }

    /// Counts one redemption of a coupon. Checkout-side; never called by
    /// the cart operations.
    ///
    /// ## Returns
    /// * `Ok(true)` - redeemed
    /// * `Ok(false)` - inactive, expired or exhausted
    pub async fn redeem_coupon(&self, code: &str) -> CartResult<bool> {
        let code = normalize_coupon_code(code)?;

        let redeemed = self
            .retrying("redeem_coupon", || self.redeem_coupon_once(&code))
            .await?;

        info!(code = %code, redeemed, "Coupon redemption");
        Ok(redeemed)
    }

    // =========================================================================
    // Concurrency discipline
    // =========================================================================

    /// Runs `attempt` under the cart's lock, retrying transient failures.
    async fn with_cart<T, F, Fut>(&self, user_id: &str, op: &'static str, attempt: F) -> CartResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CartResult<T>>,
    {
        let _guard = self.locks.acquire(user_id).await;
        debug!(user_id = %user_id, op, active_carts = self.locks.active(), "Cart lock acquired");

        self.retrying(op, attempt).await
    }

    async fn retrying<T, F, Fut>(&self, op: &'static str, attempt: F) -> CartResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CartResult<T>>,
    {
        with_retry(&self.config, op, attempt).await
    }

    // =========================================================================
    // Single attempts (one transaction each)
    // =========================================================================

    async fn get_cart_once(&self, user_id: &str) -> CartResult<CartQuote> {
        let mut tx = self.db.begin().await?;

        let cart = self.db.carts().get_or_create(&mut tx, user_id).await?;
        let quote = self.quote(&mut tx, &cart).await?;

        tx.commit().await?;
        Ok(quote)
    }

    async fn add_item_once(
        &self,
        user_id: &str,
        variant_id: &str,
        quantity: i64,
    ) -> CartResult<CartQuote> {
        let mut tx = self.db.begin().await?;
        let carts = self.db.carts();

        let mut aggregate = self.load_aggregate(&mut tx, user_id).await?;
        let variant = self.ledger.variant(&mut tx, variant_id).await?;

        let change = aggregate.add_item(&variant, quantity, Utc::now())?;
        carts.apply_change(&mut tx, &aggregate.cart.id, &change).await?;

        let quote = self.quote(&mut tx, &aggregate.cart).await?;
        tx.commit().await?;
        Ok(quote)
    }

    async fn update_item_once(
        &self,
        user_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> CartResult<CartQuote> {
        let mut tx = self.db.begin().await?;
        let carts = self.db.carts();

        let mut aggregate = self.load_aggregate(&mut tx, user_id).await?;
        let variant_id = aggregate
            .find_item(item_id)
            .map(|item| item.variant_id.clone())
            .ok_or_else(|| CartError::not_found("CartItem", item_id))?;
        let variant = self.ledger.variant(&mut tx, &variant_id).await?;

        let change = aggregate.update_quantity(item_id, quantity, &variant, Utc::now())?;
        carts.apply_change(&mut tx, &aggregate.cart.id, &change).await?;

        let quote = self.quote(&mut tx, &aggregate.cart).await?;
        tx.commit().await?;
        Ok(quote)
    }

    async fn remove_item_once(&self, user_id: &str, item_id: &str) -> CartResult<CartQuote> {
        let mut tx = self.db.begin().await?;
        let carts = self.db.carts();

        let mut aggregate = self.load_aggregate(&mut tx, user_id).await?;
        let change = aggregate.remove_item(item_id)?;
        carts.apply_change(&mut tx, &aggregate.cart.id, &change).await?;

        let quote = self.quote(&mut tx, &aggregate.cart).await?;
        tx.commit().await?;
        Ok(quote)
    }

    async fn apply_coupon_once(&self, user_id: &str, code: &str) -> CartResult<CartQuote> {
        let mut tx = self.db.begin().await?;
        let carts = self.db.carts();

        let mut aggregate = self.load_aggregate(&mut tx, user_id).await?;
        let coupon = self.db.coupons().find_by_code(&mut tx, code).await?;

        ensure_applicable(code, coupon.as_ref(), aggregate.subtotal(), Utc::now())?;

        aggregate.attach_coupon(code);
        carts
            .set_coupon(&mut tx, &aggregate.cart.id, aggregate.cart.coupon_code.as_deref())
            .await?;

        let quote = self.quote(&mut tx, &aggregate.cart).await?;
        tx.commit().await?;
        Ok(quote)
    }

    async fn remove_coupon_once(&self, user_id: &str) -> CartResult<CartQuote> {
        let mut tx = self.db.begin().await?;
        let carts = self.db.carts();

        // Lines are not touched; the quote re-reads them
        let cart = carts.ensure_cart(&mut tx, user_id).await?;
        let mut aggregate = CartAggregate::new(cart, Vec::new());
        if aggregate.detach_coupon() {
            carts.set_coupon(&mut tx, &aggregate.cart.id, None).await?;
        }

        let quote = self.quote(&mut tx, &aggregate.cart).await?;
        tx.commit().await?;
        Ok(quote)
    }

    async fn clear_cart_once(&self, user_id: &str) -> CartResult<CartQuote> {
        let mut tx = self.db.begin().await?;
        let carts = self.db.carts();

        let cart = carts
            .touch_existing(&mut tx, user_id)
            .await?
            .ok_or_else(|| CartError::not_found("Cart", user_id))?;

        let mut aggregate = CartAggregate::new(cart, Vec::new());
        aggregate.clear();

        let removed = carts.delete_items(&mut tx, &aggregate.cart.id).await?;
        carts.set_coupon(&mut tx, &aggregate.cart.id, None).await?;
        debug!(user_id = %user_id, removed, "Cart items deleted");

        let quote = self.quote(&mut tx, &aggregate.cart).await?;
        tx.commit().await?;
        Ok(quote)
    }

    async fn check_available_once(&self, variant_id: &str, requested: i64) -> CartResult<StockCheck> {
        let mut conn = self.db.pool().acquire().await?;
        self.ledger
            .check_available(&mut conn, variant_id, requested)
            .await
    }

    async fn redeem_coupon_once(&self, code: &str) -> CartResult<bool> {
        let mut conn = self.db.pool().acquire().await?;
        let coupons = self.db.coupons();

        if coupons.redeem(&mut conn, code).await? {
            return Ok(true);
        }
        match coupons.find_by_code(&mut conn, code).await? {
            Some(_) => Ok(false),
            None => Err(CartError::not_found("Coupon", code)),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Opens the mutation with the cart-row write, then loads the items.
    async fn load_aggregate(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> CartResult<CartAggregate> {
        let carts = self.db.carts();
        let cart = carts.ensure_cart(conn, user_id).await?;
        let items = carts.items(conn, &cart.id).await?;
        Ok(CartAggregate::new(cart, items))
    }

    /// Prices the cart with a fresh read of its lines and coupon.
    async fn quote(&self, conn: &mut SqliteConnection, cart: &Cart) -> CartResult<CartQuote> {
        let lines = self.db.carts().lines(conn, &cart.id).await?;

        let coupon = match cart.coupon_code.as_deref() {
            Some(code) => self.db.coupons().find_by_code(conn, code).await?,
            None => None,
        };

        Ok(quote(cart, &lines, coupon.as_ref(), Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration as ChronoDuration};
    use std::time::Duration;
    use storefront_core::{Coupon, CouponKind, CouponRejection, Variant};
    use storefront_db::DbConfig;
    use uuid::Uuid;

    const USER: &str = "user-1";

    fn fast_config() -> CartServiceConfig {
        CartServiceConfig::default().delays(Duration::from_millis(1), Duration::from_millis(5))
    }

    async fn setup() -> (CartService, Database) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        (CartService::new(db.clone(), fast_config()), db)
    }

    async fn variant(db: &Database, price_cents: i64, available_qty: i64) -> Variant {
        let now = Utc::now();
        let variant = Variant {
            id: Uuid::new_v4().to_string(),
            product_id: "p-1".to_string(),
            sku: format!("SKU-{}", Uuid::new_v4().simple()),
            name: "Cotton T-Shirt - Size M - Blue".to_string(),
            price_cents,
            available_qty,
            created_at: now,
            updated_at: now,
        };
        db.variants().insert(&variant).await.unwrap();
        variant
    }

    fn coupon(
        code: &str,
        kind: CouponKind,
        value: i64,
        min_amount_cents: Option<i64>,
        max_uses: Option<i64>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            kind,
            value,
            min_amount_cents,
            max_uses,
            used_count: 0,
            expires_at,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seed_coupons(db: &Database) {
        let next_year = Some(Utc::now() + ChronoDuration::days(365));
        db.coupons()
            .insert(&coupon("WELCOME10", CouponKind::Percentage, 1000, Some(5000), Some(1000), next_year))
            .await
            .unwrap();
        db.coupons()
            .insert(&coupon("SAVE20", CouponKind::FixedAmount, 2000, Some(1000), Some(500), next_year))
            .await
            .unwrap();
    }

    // =========================================================================
    // Items
    // =========================================================================

    #[tokio::test]
    async fn test_new_cart_is_empty() {
        let (service, _db) = setup().await;

        let quote = service.get_cart(USER).await.unwrap();
        assert!(quote.items.is_empty());
        assert_eq!(quote.total_cents, 0);
        assert_eq!(quote.coupon_code, None);

        // Loading twice hands back the same cart
        let again = service.get_cart(USER).await.unwrap();
        assert_eq!(again.cart_id, quote.cart_id);
    }

    #[tokio::test]
    async fn test_add_then_remove_restores_subtotal() {
        let (service, db) = setup().await;
        let shirt = variant(&db, 2999, 100).await;
        let phone = variant(&db, 99999, 50).await;

        let before = service.add_item(USER, &shirt.id, 2).await.unwrap();
        assert_eq!(before.subtotal_cents, 5998);

        let after_add = service.add_item(USER, &phone.id, 1).await.unwrap();
        assert_eq!(after_add.subtotal_cents, 5998 + 99999);
        assert_eq!(after_add.item_count, 2);

        let phone_line = after_add
            .items
            .iter()
            .find(|line| line.variant_id == phone.id)
            .unwrap();
        let after_remove = service.remove_item(USER, &phone_line.item_id).await.unwrap();
        assert_eq!(after_remove.subtotal_cents, before.subtotal_cents);
        assert_eq!(after_remove.item_count, 1);
    }

    #[tokio::test]
    async fn test_adding_same_variant_merges() {
        let (service, db) = setup().await;
        let shirt = variant(&db, 2999, 5).await;

        service.add_item(USER, &shirt.id, 2).await.unwrap();
        let quote = service.add_item(USER, &shirt.id, 3).await.unwrap();

        assert_eq!(quote.items.len(), 1);
        assert_eq!(quote.items[0].quantity, 5);
        assert_eq!(quote.subtotal_cents, 5 * 2999);
    }

    #[tokio::test]
    async fn test_stock_is_checked_against_merged_quantity() {
        let (service, db) = setup().await;
        let shirt = variant(&db, 2999, 3).await;

        service.add_item(USER, &shirt.id, 3).await.unwrap();
        let err = service.add_item(USER, &shirt.id, 1).await.unwrap_err();

        match err {
            CartError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 3);
                assert_eq!(requested, 4);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        let quote = service.get_cart(USER).await.unwrap();
        assert_eq!(quote.items[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_update_quantity() {
        let (service, db) = setup().await;
        let shirt = variant(&db, 2999, 10).await;

        let quote = service.add_item(USER, &shirt.id, 1).await.unwrap();
        let item_id = quote.items[0].item_id.clone();

        let quote = service.update_item_quantity(USER, &item_id, 4).await.unwrap();
        assert_eq!(quote.items[0].quantity, 4);
        assert_eq!(quote.subtotal_cents, 4 * 2999);

        assert!(matches!(
            service.update_item_quantity(USER, &item_id, 11).await,
            Err(CartError::InsufficientStock { available: 10, .. })
        ));
        assert!(matches!(
            service.update_item_quantity(USER, &item_id, 0).await,
            Err(CartError::Validation(_))
        ));
        assert!(matches!(
            service.update_item_quantity(USER, "no-such-item", 1).await,
            Err(CartError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_variant_and_item() {
        let (service, _db) = setup().await;

        assert!(matches!(
            service.add_item(USER, "no-such-variant", 1).await,
            Err(CartError::NotFound { ref entity, .. }) if entity == "Variant"
        ));
        assert!(matches!(
            service.remove_item(USER, "no-such-item").await,
            Err(CartError::NotFound { ref entity, .. }) if entity == "CartItem"
        ));
    }

    #[tokio::test]
    async fn test_ids_are_not_rewritten() {
        let (service, db) = setup().await;
        let shirt = variant(&db, 2999, 10).await;

        assert!(matches!(
            service.add_item(" user-1", &shirt.id, 1).await,
            Err(CartError::Validation(_))
        ));
        assert!(matches!(
            service.add_item(USER, &format!("{} ", shirt.id), 1).await,
            Err(CartError::Validation(_))
        ));
        assert!(db.carts().find_by_user(USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_price_change_keeps_snapshot_until_quantity_changes() {
        let (service, db) = setup().await;
        let shirt = variant(&db, 2999, 10).await;

        let quote = service.add_item(USER, &shirt.id, 2).await.unwrap();
        let item_id = quote.items[0].item_id.clone();

        db.variants().update_price(&shirt.id, 3499).await.unwrap();

        let quote = service.get_cart(USER).await.unwrap();
        assert_eq!(quote.items[0].unit_price_cents, 2999);
        assert_eq!(quote.items[0].current_price_cents, 3499);
        assert_eq!(quote.subtotal_cents, 2 * 2999);

        let quote = service.update_item_quantity(USER, &item_id, 3).await.unwrap();
        assert_eq!(quote.items[0].unit_price_cents, 3499);
        assert_eq!(quote.subtotal_cents, 3 * 3499);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_cart_untouched() {
        let (service, db) = setup().await;
        let shirt = variant(&db, 2999, 2).await;

        let before = service.add_item(USER, &shirt.id, 2).await.unwrap();
        assert!(service.add_item(USER, &shirt.id, 1).await.is_err());

        let cart = db.carts().find_by_user(USER).await.unwrap().unwrap();
        assert_eq!(cart.version, before.version);

        let after = service.get_cart(USER).await.unwrap();
        assert_eq!(after.subtotal_cents, before.subtotal_cents);
    }

    #[tokio::test]
    async fn test_mutations_bump_version() {
        let (service, db) = setup().await;
        let shirt = variant(&db, 2999, 10).await;

        let first = service.add_item(USER, &shirt.id, 1).await.unwrap();
        let second = service.add_item(USER, &shirt.id, 1).await.unwrap();
        assert!(second.version > first.version);

        let read = service.get_cart(USER).await.unwrap();
        assert_eq!(read.version, second.version);
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    #[tokio::test]
    async fn test_welcome10_below_minimum_then_applied() {
        let (service, db) = setup().await;
        seed_coupons(&db).await;
        let item = variant(&db, 2000, 10).await;

        service.add_item(USER, &item.id, 2).await.unwrap();
        let err = service.apply_coupon(USER, "WELCOME10").await.unwrap_err();
        assert!(matches!(
            err,
            CartError::InvalidCoupon { reason: CouponRejection::BelowMinimum, .. }
        ));

        service.add_item(USER, &item.id, 3).await.unwrap();
        let quote = service.apply_coupon(USER, "welcome10").await.unwrap();
        assert_eq!(quote.coupon_code.as_deref(), Some("WELCOME10"));
        assert_eq!(quote.subtotal_cents, 10000);
        assert_eq!(quote.discount_cents, 1000);
        assert_eq!(quote.total_cents, 9000);
    }

    #[tokio::test]
    async fn test_fixed_coupon_never_goes_below_zero() {
        let (service, db) = setup().await;
        seed_coupons(&db).await;
        let item = variant(&db, 1500, 10).await;

        service.add_item(USER, &item.id, 1).await.unwrap();
        let quote = service.apply_coupon(USER, "SAVE20").await.unwrap();

        assert_eq!(quote.subtotal_cents, 1500);
        assert_eq!(quote.discount_cents, 1500);
        assert_eq!(quote.total_cents, 0);
    }

    #[tokio::test]
    async fn test_unknown_coupon_is_not_found() {
        let (service, _db) = setup().await;

        assert!(matches!(
            service.apply_coupon(USER, "NOPE").await,
            Err(CartError::NotFound { ref entity, .. }) if entity == "Coupon"
        ));
    }

    #[tokio::test]
    async fn test_coupon_going_stale_yields_zero_discount() {
        let (service, db) = setup().await;
        seed_coupons(&db).await;
        let item = variant(&db, 6000, 10).await;

        service.add_item(USER, &item.id, 1).await.unwrap();
        let quote = service.apply_coupon(USER, "WELCOME10").await.unwrap();
        assert_eq!(quote.discount_cents, 600);

        db.coupons()
            .set_expiry("WELCOME10", Some(Utc::now() - ChronoDuration::hours(1)))
            .await
            .unwrap();
        let quote = service.get_cart(USER).await.unwrap();
        assert_eq!(quote.coupon_code.as_deref(), Some("WELCOME10"));
        assert_eq!(quote.discount_cents, 0);
        assert_eq!(quote.total_cents, quote.subtotal_cents);
        assert_eq!(quote.coupon_rejection, Some(CouponRejection::Expired));

        db.coupons().set_active("WELCOME10", false).await.unwrap();
        let quote = service.get_cart(USER).await.unwrap();
        assert_eq!(quote.discount_cents, 0);
        assert_eq!(quote.coupon_rejection, Some(CouponRejection::Invalid));
    }

    #[tokio::test]
    async fn test_remove_coupon_is_idempotent() {
        let (service, db) = setup().await;
        seed_coupons(&db).await;
        let item = variant(&db, 6000, 10).await;

        service.add_item(USER, &item.id, 1).await.unwrap();
        service.apply_coupon(USER, "WELCOME10").await.unwrap();

        let quote = service.remove_coupon(USER).await.unwrap();
        assert_eq!(quote.coupon_code, None);
        assert_eq!(quote.discount_cents, 0);

        let quote = service.remove_coupon(USER).await.unwrap();
        assert_eq!(quote.coupon_code, None);
    }

    #[tokio::test]
    async fn test_redeem_never_exceeds_max_uses() {
        let (service, db) = setup().await;
        db.coupons()
            .insert(&coupon("ONCE", CouponKind::FixedAmount, 500, None, Some(2), None))
            .await
            .unwrap();

        assert!(service.redeem_coupon("ONCE").await.unwrap());
        assert!(service.redeem_coupon("once").await.unwrap());
        assert!(!service.redeem_coupon("ONCE").await.unwrap());
        assert_eq!(db.coupons().get_by_code("ONCE").await.unwrap().used_count, 2);

        assert!(matches!(
            service.redeem_coupon("MISSING").await,
            Err(CartError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_expired_coupon_is_not_redeemed() {
        let (service, db) = setup().await;
        let yesterday = Some(Utc::now() - ChronoDuration::days(1));
        db.coupons()
            .insert(&coupon("OLD", CouponKind::FixedAmount, 500, None, Some(10), yesterday))
            .await
            .unwrap();

        assert!(!service.redeem_coupon("OLD").await.unwrap());
        assert_eq!(db.coupons().get_by_code("OLD").await.unwrap().used_count, 0);
    }

    #[tokio::test]
    async fn test_lowercase_catalog_code_is_applied() {
        let (service, db) = setup().await;
        db.coupons()
            .insert(&coupon("summer", CouponKind::Percentage, 1000, None, None, None))
            .await
            .unwrap();
        let item = variant(&db, 2000, 10).await;

        service.add_item(USER, &item.id, 1).await.unwrap();
        let quote = service.apply_coupon(USER, "summer").await.unwrap();
        assert_eq!(quote.coupon_code.as_deref(), Some("SUMMER"));
        assert_eq!(quote.discount_cents, 200);

        assert!(service.redeem_coupon("Summer").await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_coupon_code_is_not_found() {
        let (service, db) = setup().await;
        let item = variant(&db, 2000, 10).await;
        service.add_item(USER, &item.id, 1).await.unwrap();

        assert!(matches!(
            service.apply_coupon(USER, "10%OFF").await,
            Err(CartError::NotFound { ref entity, ref id }) if entity == "Coupon" && id == "10%OFF"
        ));
        assert!(matches!(
            service.apply_coupon(USER, &"A".repeat(64)).await,
            Err(CartError::NotFound { .. })
        ));
        assert!(matches!(
            service.redeem_coupon("SAVE 20").await,
            Err(CartError::NotFound { .. })
        ));
        assert!(matches!(
            service.apply_coupon(USER, "   ").await,
            Err(CartError::Validation(_))
        ));
    }

    // =========================================================================
    // Clear / stock
    // =========================================================================

    #[tokio::test]
    async fn test_clear_cart() {
        let (service, db) = setup().await;
        seed_coupons(&db).await;
        let item = variant(&db, 6000, 10).await;

        assert!(matches!(
            service.clear_cart(USER).await,
            Err(CartError::NotFound { ref entity, .. }) if entity == "Cart"
        ));

        service.add_item(USER, &item.id, 2).await.unwrap();
        service.apply_coupon(USER, "WELCOME10").await.unwrap();

        let cleared = service.clear_cart(USER).await.unwrap();
        assert!(cleared.items.is_empty());
        assert_eq!(cleared.coupon_code, None);

        let quote = service.get_cart(USER).await.unwrap();
        assert!(quote.items.is_empty());
        assert_eq!(quote.subtotal_cents, 0);
        assert_eq!(quote.discount_cents, 0);
        assert_eq!(quote.total_cents, 0);
        assert_eq!(quote.coupon_code, None);
    }

    #[tokio::test]
    async fn test_stock_helpers() {
        let (service, db) = setup().await;
        let item = variant(&db, 1000, 2).await;

        let check = service.check_available(&item.id, 2).await.unwrap();
        assert!(check.ok);
        assert!(!service.check_available(&item.id, 3).await.unwrap().ok);

        assert!(service.decrement_stock(&item.id, 2).await.unwrap());
        assert!(!service.decrement_stock(&item.id, 1).await.unwrap());
        assert_eq!(db.variants().get_by_id(&item.id).await.unwrap().available_qty, 0);
    }

    // =========================================================================
    // Concurrency
    // =========================================================================

    async fn file_backed() -> (CartService, Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("cart.db")).max_connections(5);
        let db = Database::new(config).await.unwrap();
        (CartService::new(db.clone(), fast_config()), db, dir)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_adds_respect_stock() {
        const N: i64 = 8;
        let (service, db, _dir) = file_backed().await;
        let item = variant(&db, 1000, N - 1).await;

        let handles: Vec<_> = (0..N)
            .map(|_| {
                let service = service.clone();
                let variant_id = item.id.clone();
                tokio::spawn(async move { service.add_item(USER, &variant_id, 1).await })
            })
            .collect();

        let mut ok = 0;
        let mut short = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(CartError::InsufficientStock { .. }) => short += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(ok, N - 1);
        assert_eq!(short, 1);

        let quote = service.get_cart(USER).await.unwrap();
        assert_eq!(quote.items.len(), 1);
        assert_eq!(quote.items[0].quantity, N - 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_users_do_not_interfere() {
        let (service, db, _dir) = file_backed().await;
        let item = variant(&db, 1000, 100).await;

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let service = service.clone();
                let variant_id = item.id.clone();
                tokio::spawn(async move {
                    let user = format!("user-{i}");
                    service.add_item(&user, &variant_id, 2).await.unwrap();
                    service.add_item(&user, &variant_id, 1).await
                })
            })
            .collect();

        for handle in handles {
            let quote = handle.await.unwrap().unwrap();
            assert_eq!(quote.items.len(), 1);
            assert_eq!(quote.items[0].quantity, 3);
            assert_eq!(quote.subtotal_cents, 3000);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_interleaved_add_and_update_lose_no_writes() {
        let (service, db, _dir) = file_backed().await;
        let item = variant(&db, 1000, 1000).await;

        let first = service.add_item(USER, &item.id, 1).await.unwrap();
        let item_id = first.items[0].item_id.clone();

        let handles: Vec<_> = (0..12i64)
            .map(|i| {
                let service = service.clone();
                let variant_id = item.id.clone();
                let item_id = item_id.clone();
                tokio::spawn(async move {
                    if i % 3 == 0 {
                        let qty = 10 * (i + 1);
                        let quote = service.update_item_quantity(USER, &item_id, qty).await;
                        (Some(qty), quote.unwrap())
                    } else {
                        (None, service.add_item(USER, &variant_id, 1).await.unwrap())
                    }
                })
            })
            .collect();

        let mut applied = Vec::new();
        for handle in handles {
            applied.push(handle.await.unwrap());
        }
        applied.sort_by_key(|(_, quote)| quote.version);

        // Replaying in commit order must reproduce every returned quote
        let mut expected = first.items[0].quantity;
        let mut version = first.version;
        for (set_to, quote) in &applied {
            expected = match set_to {
                Some(qty) => *qty,
                None => expected + 1,
            };
            version += 1;
            assert_eq!(quote.version, version);
            assert_eq!(quote.items.len(), 1);
            assert_eq!(quote.items[0].quantity, expected);
        }

        let last = service.get_cart(USER).await.unwrap();
        assert_eq!(last.version, version);
        assert_eq!(last.items[0].quantity, expected);
    }
}
