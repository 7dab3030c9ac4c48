//! # Variant Repository
//!
//! Catalog variant rows: the authoritative stock count.
//!
//! ## Reads vs Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Cart transaction ──► find(conn, id)        fresh read, same tx         │
//! │                                                                         │
//! │  Checkout         ──► decrement_stock(conn, id, n)                      │
//! │                          UPDATE ... SET available_qty = available_qty-n │
//! │                          WHERE id = ? AND available_qty >= n            │
//! │                          └─► false when it would go negative            │
//! │                                                                         │
//! │  Catalog admin    ──► insert / update_price / set_stock                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::validation::{validate_price_cents, validate_stock};
use storefront_core::Variant;

const SELECT_VARIANT: &str = r#"
    SELECT id, product_id, sku, name, price_cents, available_qty, created_at, updated_at
    FROM variants
"#;

/// Repository for variant database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.variants();
///
/// let variant = repo.get_by_id("uuid-here").await?;
///
/// let mut tx = db.begin().await?;
/// let applied = repo.decrement_stock(&mut tx, &variant.id, 2).await?;
/// tx.commit().await?;
/// ```
#[derive(Debug, Clone)]
pub struct VariantRepository {
    pool: SqlitePool,
}

impl VariantRepository {
    /// Creates a new VariantRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VariantRepository { pool }
    }

    /// Gets a variant by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Variant> {
        let mut conn = self.pool.acquire().await?;
        self.find(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Variant", id))
    }

    /// Reads a variant on the caller's connection (usually a transaction).
    pub async fn find(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Variant>> {
        debug!(variant_id = %id, "Loading variant");

        let variant = sqlx::query_as::<_, Variant>(&format!("{SELECT_VARIANT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(variant)
    }

    /// Inserts a new variant.
    pub async fn insert(&self, variant: &Variant) -> DbResult<()> {
        debug!(sku = %variant.sku, "Inserting variant");
        validate_price_cents(variant.price_cents)?;
        validate_stock(variant.available_qty)?;

        sqlx::query(
            r#"
            INSERT INTO variants (
                id, product_id, sku, name, price_cents, available_qty, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.sku)
        .bind(&variant.name)
        .bind(variant.price_cents)
        .bind(variant.available_qty)
        .bind(variant.created_at)
        .bind(variant.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Changes the catalog price. Existing cart snapshots are unaffected.
    pub async fn update_price(&self, id: &str, price_cents: i64) -> DbResult<()> {
        debug!(variant_id = %id, price_cents, "Updating variant price");
        validate_price_cents(price_cents)?;

        let result = sqlx::query("UPDATE variants SET price_cents = ?, updated_at = ? WHERE id = ?")
            .bind(price_cents)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Variant", id));
        }

        Ok(())
    }

    /// Overwrites the stock level (restock, stocktake).
    pub async fn set_stock(&self, id: &str, available_qty: i64) -> DbResult<()> {
        debug!(variant_id = %id, available_qty, "Setting variant stock");
        validate_stock(available_qty)?;

        let result =
            sqlx::query("UPDATE variants SET available_qty = ?, updated_at = ? WHERE id = ?")
                .bind(available_qty)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Variant", id));
        }

        Ok(())
    }

    /// Takes `qty` units out of stock in one conditional statement.
    ///
    /// ## Returns
    /// * `Ok(true)` - stock was decremented
    /// * `Ok(false)` - not enough stock (or `qty ≤ 0`); nothing changed
    pub async fn decrement_stock(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        qty: i64,
    ) -> DbResult<bool> {
        debug!(variant_id = %id, qty, "Decrementing variant stock");

        let result = sqlx::query(
            r#"
            UPDATE variants
            SET available_qty = available_qty - ?1, updated_at = ?2
            WHERE id = ?3 AND ?1 > 0 AND available_qty >= ?1
            "#,
        )
        .bind(qty)
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Counts catalog variants.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM variants")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
