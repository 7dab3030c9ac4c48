//! # Inventory Ledger
//!
//! Stock reads and checks against the `variants` table, on the caller's
//! connection so they see the same transaction as the cart write.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  check_available(conn, variant_id, requested)                           │
//! │       │                                                                 │
//! │       ├── no variant row ──────────────► NotFound                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  { ok: requested ≤ available_qty, availableQty, requestedQty }          │
//! │                                                                         │
//! │  decrement_stock(variant_id, qty)   checkout only                       │
//! │       └── one conditional UPDATE; false instead of going negative       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqliteConnection;
use storefront_core::inventory::{self, StockCheck};
use storefront_core::validation::validate_quantity;
use storefront_core::Variant;
use storefront_db::Database;
use tracing::{debug, info};

use crate::error::{CartError, CartResult};

/// Reads and checks variant stock.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    db: Database,
}

impl InventoryLedger {
    pub fn new(db: Database) -> Self {
        InventoryLedger { db }
    }

    /// Loads a variant, failing with `NotFound` if it does not exist.
    pub async fn variant(&self, conn: &mut SqliteConnection, variant_id: &str) -> CartResult<Variant> {
        self.db
            .variants()
            .find(conn, variant_id)
            .await?
            .ok_or_else(|| CartError::not_found("Variant", variant_id))
    }

    /// Checks whether `requested` units are available right now.
    pub async fn check_available(
        &self,
        conn: &mut SqliteConnection,
        variant_id: &str,
        requested: i64,
    ) -> CartResult<StockCheck> {
        let variant = self.variant(conn, variant_id).await?;
        let check = inventory::check_available(&variant, requested);

        debug!(
            variant_id = %variant_id,
            requested,
            available = check.available_qty,
            ok = check.ok,
            "Stock check"
        );

        Ok(check)
    }

    /// Takes `qty` units out of stock. Returns `false` (and changes
    /// nothing) if that would drive stock negative.
    pub async fn decrement_stock(&self, variant_id: &str, qty: i64) -> CartResult<bool> {
        validate_quantity(qty)?;

        let mut conn = self.db.pool().acquire().await?;
        let applied = self
            .db
            .variants()
            .decrement_stock(&mut conn, variant_id, qty)
            .await?;

        if applied {
            info!(variant_id = %variant_id, qty, "Stock decremented");
        } else {
            // Distinguish "unknown variant" from "not enough stock"
            self.variant(&mut conn, variant_id).await?;
            debug!(variant_id = %variant_id, qty, "Stock decrement refused");
        }

        Ok(applied)
    }
}
