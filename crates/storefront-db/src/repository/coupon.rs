//! # Coupon Repository
//!
//! Coupon lookup by code, plus the atomic redemption counter.
//!
//! ## Redemption
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two checkouts redeem the last WELCOME10 use at the same time           │
//! │                                                                         │
//! │  ❌ read used_count=999 ─► +1 ─► write 1000      (both do this)         │
//! │     → used_count=1000 twice, 1001 redemptions                           │
//! │                                                                         │
//! │  ✅ UPDATE coupons SET used_count = used_count + 1                      │
//! │     WHERE code = ? AND is_active = 1                                    │
//! │       AND (expires_at IS NULL OR expires_at >= ?)                       │
//! │       AND (max_uses IS NULL OR used_count < max_uses)                   │
//! │     → exactly one statement matches the row                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Codes are stored upper-case; callers look them up in that form.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::validation::{validate_coupon_code, validate_coupon_value};
use storefront_core::Coupon;

const SELECT_COUPON: &str = r#"
    SELECT id, code, kind, value, min_amount_cents, max_uses, used_count,
           expires_at, is_active, created_at, updated_at
    FROM coupons
"#;

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Gets a coupon by its code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Coupon> {
        let mut conn = self.pool.acquire().await?;
        self.find_by_code(&mut conn, code)
            .await?
            .ok_or_else(|| DbError::not_found("Coupon", code))
    }

    /// Reads a coupon on the caller's connection. Inactive coupons are
    /// returned too; the validator decides what they mean.
    pub async fn find_by_code(
        &self,
        conn: &mut SqliteConnection,
        code: &str,
    ) -> DbResult<Option<Coupon>> {
        debug!(code = %code, "Loading coupon");

        let coupon = sqlx::query_as::<_, Coupon>(&format!("{SELECT_COUPON} WHERE code = ?"))
            .bind(code)
            .fetch_optional(conn)
            .await?;

        Ok(coupon)
    }

    /// Inserts a new coupon under its canonical (upper-case) code.
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        let code = validate_coupon_code(&coupon.code)?;
        validate_coupon_value(coupon.kind, coupon.value)?;
        debug!(code = %code, "Inserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, kind, value, min_amount_cents, max_uses, used_count,
                expires_at, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&coupon.id)
        .bind(&code)
        .bind(coupon.kind)
        .bind(coupon.value)
        .bind(coupon.min_amount_cents)
        .bind(coupon.max_uses)
        .bind(coupon.used_count)
        .bind(coupon.expires_at)
        .bind(coupon.is_active)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &code),
            other => other,
        })?;

        Ok(())
    }

    /// Activates or deactivates a coupon.
    pub async fn set_active(&self, code: &str, is_active: bool) -> DbResult<()> {
        debug!(code = %code, is_active, "Setting coupon active flag");

        let result = sqlx::query("UPDATE coupons SET is_active = ?, updated_at = ? WHERE code = ?")
            .bind(is_active)
            .bind(Utc::now())
            .bind(code)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", code));
        }

        Ok(())
    }

    /// Moves a coupon's expiry.
    pub async fn set_expiry(&self, code: &str, expires_at: Option<DateTime<Utc>>) -> DbResult<()> {
        debug!(code = %code, "Setting coupon expiry");

        let result = sqlx::query("UPDATE coupons SET expires_at = ?, updated_at = ? WHERE code = ?")
            .bind(expires_at)
            .bind(Utc::now())
            .bind(code)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", code));
        }

        Ok(())
    }

    /// Counts one redemption, if the coupon is active, unexpired and not
    /// exhausted.
    ///
    /// ## Returns
    /// * `Ok(true)` - `used_count` was incremented
    /// * `Ok(false)` - unknown, inactive, expired or exhausted; nothing changed
    pub async fn redeem(&self, conn: &mut SqliteConnection, code: &str) -> DbResult<bool> {
        debug!(code = %code, "Redeeming coupon");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET used_count = used_count + 1, updated_at = ?1
            WHERE code = ?2
              AND is_active = 1
              AND (expires_at IS NULL OR julianday(expires_at) >= julianday(?1))
              AND (max_uses IS NULL OR used_count < max_uses)
            "#,
        )
        .bind(now)
        .bind(code)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
