//! # Cart Repository
//!
//! Cart header and cart item rows.
//!
//! ## Write-First Transactions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every cart mutation opens its transaction with a write on the cart     │
//! │  row, so SQLite's write lock is held before anything is read:           │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    ensure_cart()    INSERT ... ON CONFLICT(user_id)                     │
//! │                     DO UPDATE SET version = version + 1  ◄── lock taken │
//! │    items()          SELECT ... FROM cart_items                          │
//! │    variants.find()  SELECT ... FROM variants                            │
//! │    apply_change()   INSERT / UPDATE / DELETE cart_items                 │
//! │    lines()          SELECT ... JOIN variants                            │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  A read-first transaction would have to upgrade its snapshot to a       │
//! │  write lock later, which fails with SQLITE_BUSY under contention.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use storefront_core::{Cart, CartItem, CartLine, ItemChange};

const CART_COLUMNS: &str = "id, user_id, coupon_code, version, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, cart_id, variant_id, quantity, price_snapshot_cents, created_at, updated_at";

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    // =========================================================================
    // Cart header
    // =========================================================================

    /// Creates the user's cart or bumps its version, returning the row.
    ///
    /// The opening statement of every mutating cart transaction.
    pub async fn ensure_cart(&self, conn: &mut SqliteConnection, user_id: &str) -> DbResult<Cart> {
        debug!(user_id = %user_id, "Locking cart row");

        let now = Utc::now();
        let cart = sqlx::query_as::<_, Cart>(&format!(
            r#"
            INSERT INTO carts (id, user_id, coupon_code, version, created_at, updated_at)
            VALUES (?, ?, NULL, 1, ?, ?)
            ON CONFLICT (user_id) DO UPDATE
                SET version = carts.version + 1,
                    updated_at = excluded.updated_at
            RETURNING {CART_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(cart)
    }

    /// Returns the user's cart, creating an empty one if needed. Does not
    /// bump the version of an existing cart.
    pub async fn get_or_create(&self, conn: &mut SqliteConnection, user_id: &str) -> DbResult<Cart> {
        debug!(user_id = %user_id, "Loading cart");

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, coupon_code, version, created_at, updated_at)
            VALUES (?, ?, NULL, 0, ?, ?)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        sqlx::query_as::<_, Cart>(&format!("SELECT {CART_COLUMNS} FROM carts WHERE user_id = ?"))
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Cart", user_id))
    }

    /// Bumps the version of an existing cart. `None` if the user has no cart.
    pub async fn touch_existing(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> DbResult<Option<Cart>> {
        debug!(user_id = %user_id, "Locking existing cart row");

        let cart = sqlx::query_as::<_, Cart>(&format!(
            r#"
            UPDATE carts
            SET version = version + 1, updated_at = ?
            WHERE user_id = ?
            RETURNING {CART_COLUMNS}
            "#
        ))
        .bind(Utc::now())
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(cart)
    }

    /// Looks up a user's cart without creating it.
    pub async fn find_by_user(&self, user_id: &str) -> DbResult<Option<Cart>> {
        let cart =
            sqlx::query_as::<_, Cart>(&format!("SELECT {CART_COLUMNS} FROM carts WHERE user_id = ?"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(cart)
    }

    /// Stores (or clears) the attached coupon code.
    pub async fn set_coupon(
        &self,
        conn: &mut SqliteConnection,
        cart_id: &str,
        coupon_code: Option<&str>,
    ) -> DbResult<()> {
        debug!(cart_id = %cart_id, coupon_code = ?coupon_code, "Setting cart coupon");

        sqlx::query("UPDATE carts SET coupon_code = ?, updated_at = ? WHERE id = ?")
            .bind(coupon_code)
            .bind(Utc::now())
            .bind(cart_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    // =========================================================================
    // Cart items
    // =========================================================================

    /// Loads the cart's items in insertion order.
    pub async fn items(&self, conn: &mut SqliteConnection, cart_id: &str) -> DbResult<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM cart_items WHERE cart_id = ? ORDER BY created_at, rowid"
        ))
        .bind(cart_id)
        .fetch_all(conn)
        .await?;

        Ok(items)
    }

    /// Loads the cart's items joined with current catalog state.
    pub async fn lines(&self, conn: &mut SqliteConnection, cart_id: &str) -> DbResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT
                ci.id                    AS item_id,
                ci.variant_id            AS variant_id,
                v.product_id             AS product_id,
                v.sku                    AS sku,
                v.name                   AS name,
                ci.quantity              AS quantity,
                ci.price_snapshot_cents  AS price_snapshot_cents,
                v.price_cents            AS current_price_cents,
                v.available_qty          AS available_qty
            FROM cart_items ci
            JOIN variants v ON v.id = ci.variant_id
            WHERE ci.cart_id = ?
            ORDER BY ci.created_at, ci.rowid
            "#,
        )
        .bind(cart_id)
        .fetch_all(conn)
        .await?;

        Ok(lines)
    }

    /// Inserts a new line.
    pub async fn insert_item(&self, conn: &mut SqliteConnection, item: &CartItem) -> DbResult<()> {
        debug!(
            cart_id = %item.cart_id,
            variant_id = %item.variant_id,
            quantity = item.quantity,
            "Inserting cart item"
        );

        sqlx::query(&format!(
            "INSERT INTO cart_items ({ITEM_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&item.id)
        .bind(&item.cart_id)
        .bind(&item.variant_id)
        .bind(item.quantity)
        .bind(item.price_snapshot_cents)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Writes a line's quantity and price snapshot.
    pub async fn update_item(&self, conn: &mut SqliteConnection, item: &CartItem) -> DbResult<()> {
        debug!(item_id = %item.id, quantity = item.quantity, "Updating cart item");

        let result = sqlx::query(
            r#"
            UPDATE cart_items
            SET quantity = ?, price_snapshot_cents = ?, updated_at = ?
            WHERE id = ? AND cart_id = ?
            "#,
        )
        .bind(item.quantity)
        .bind(item.price_snapshot_cents)
        .bind(item.updated_at)
        .bind(&item.id)
        .bind(&item.cart_id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CartItem", &item.id));
        }

        Ok(())
    }

    /// Deletes one line. Returns whether it existed.
    pub async fn delete_item(
        &self,
        conn: &mut SqliteConnection,
        cart_id: &str,
        item_id: &str,
    ) -> DbResult<bool> {
        debug!(cart_id = %cart_id, item_id = %item_id, "Deleting cart item");

        let result = sqlx::query("DELETE FROM cart_items WHERE id = ? AND cart_id = ?")
            .bind(item_id)
            .bind(cart_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Deletes every line of a cart. Returns how many were removed.
    pub async fn delete_items(&self, conn: &mut SqliteConnection, cart_id: &str) -> DbResult<u64> {
        debug!(cart_id = %cart_id, "Deleting all cart items");

        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
            .bind(cart_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Persists one aggregate change.
    pub async fn apply_change(
        &self,
        conn: &mut SqliteConnection,
        cart_id: &str,
        change: &ItemChange,
    ) -> DbResult<()> {
        match change {
            ItemChange::Added(item) => self.insert_item(conn, item).await,
            ItemChange::QuantityChanged(item) => self.update_item(conn, item).await,
            ItemChange::Removed(item_id) => {
                if self.delete_item(conn, cart_id, item_id).await? {
                    Ok(())
                } else {
                    Err(DbError::not_found("CartItem", item_id))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use storefront_core::Variant;

    async fn setup() -> (Database, Variant) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let variant = Variant {
            id: Uuid::new_v4().to_string(),
            product_id: "p-1".to_string(),
            sku: "TSHIRT001-M-BLUE".to_string(),
            name: "Cotton T-Shirt - Size M - Blue".to_string(),
            price_cents: 2999,
            available_qty: 100,
            created_at: now,
            updated_at: now,
        };
        db.variants().insert(&variant).await.unwrap();
        (db, variant)
    }

    fn item_for(cart: &Cart, variant: &Variant, quantity: i64) -> CartItem {
        let now = Utc::now();
        CartItem {
            id: Uuid::new_v4().to_string(),
            cart_id: cart.id.clone(),
            variant_id: variant.id.clone(),
            quantity,
            price_snapshot_cents: variant.price_cents,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_ensure_cart_creates_then_bumps_version() {
        let (db, _) = setup().await;
        let repo = db.carts();

        let mut tx = db.begin().await.unwrap();
        let first = repo.ensure_cart(&mut tx, "user-1").await.unwrap();
        let second = repo.ensure_cart(&mut tx, "user-1").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
    }

    #[tokio::test]
    async fn test_get_or_create_does_not_bump_version() {
        let (db, _) = setup().await;
        let repo = db.carts();

        let mut conn = db.pool().acquire().await.unwrap();
        let created = repo.get_or_create(&mut conn, "user-1").await.unwrap();
        let again = repo.get_or_create(&mut conn, "user-1").await.unwrap();
        drop(conn);

        assert_eq!(created.id, again.id);
        assert_eq!(again.version, 0);
        assert!(repo.find_by_user("user-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_touch_existing_requires_cart() {
        let (db, _) = setup().await;
        let repo = db.carts();

        let mut tx = db.begin().await.unwrap();
        assert!(repo.touch_existing(&mut tx, "nobody").await.unwrap().is_none());
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_item_lifecycle_and_lines() {
        let (db, variant) = setup().await;
        let repo = db.carts();

        let mut tx = db.begin().await.unwrap();
        let cart = repo.ensure_cart(&mut tx, "user-1").await.unwrap();
        let mut item = item_for(&cart, &variant, 2);
        repo.apply_change(&mut tx, &cart.id, &ItemChange::Added(item.clone()))
            .await
            .unwrap();

        item.quantity = 5;
        repo.apply_change(&mut tx, &cart.id, &ItemChange::QuantityChanged(item.clone()))
            .await
            .unwrap();

        let lines = repo.lines(&mut tx, &cart.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
        assert_eq!(lines[0].sku, "TSHIRT001-M-BLUE");
        assert_eq!(lines[0].current_price_cents, 2999);

        repo.apply_change(&mut tx, &cart.id, &ItemChange::Removed(item.id.clone()))
            .await
            .unwrap();
        assert!(repo.items(&mut tx, &cart.id).await.unwrap().is_empty());

        let err = repo
            .apply_change(&mut tx, &cart.id, &ItemChange::Removed(item.id.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_one_line_per_variant() {
        let (db, variant) = setup().await;
        let repo = db.carts();

        let mut tx = db.begin().await.unwrap();
        let cart = repo.ensure_cart(&mut tx, "user-1").await.unwrap();
        repo.insert_item(&mut tx, &item_for(&cart, &variant, 1))
            .await
            .unwrap();
        let err = repo
            .insert_item(&mut tx, &item_for(&cart, &variant, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_rollback_leaves_cart_untouched() {
        let (db, variant) = setup().await;
        let repo = db.carts();

        let mut tx = db.begin().await.unwrap();
        let cart = repo.ensure_cart(&mut tx, "user-1").await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        repo.ensure_cart(&mut tx, "user-1").await.unwrap();
        repo.insert_item(&mut tx, &item_for(&cart, &variant, 3))
            .await
            .unwrap();
        repo.set_coupon(&mut tx, &cart.id, Some("WELCOME10"))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let reloaded = repo.find_by_user("user-1").await.unwrap().unwrap();
        assert_eq!(reloaded.version, 1);
        assert!(reloaded.coupon_code.is_none());

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(repo.items(&mut conn, &cart.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_items_and_clear_coupon() {
        let (db, variant) = setup().await;
        let repo = db.carts();

        let mut tx = db.begin().await.unwrap();
        let cart = repo.ensure_cart(&mut tx, "user-1").await.unwrap();
        repo.insert_item(&mut tx, &item_for(&cart, &variant, 1))
            .await
            .unwrap();
        repo.set_coupon(&mut tx, &cart.id, Some("SAVE20")).await.unwrap();

        assert_eq!(repo.delete_items(&mut tx, &cart.id).await.unwrap(), 1);
        repo.set_coupon(&mut tx, &cart.id, None).await.unwrap();
        tx.commit().await.unwrap();

        let reloaded = repo.find_by_user("user-1").await.unwrap().unwrap();
        assert!(reloaded.coupon_code.is_none());
    }
}
