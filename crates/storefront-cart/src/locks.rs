//! # Per-Cart Lock Registry
//!
//! One async mutex per user id, handed out on demand.
//!
//! ## How It Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  registry: HashMap<user_id, Weak<Mutex<()>>>                            │
//! │                                                                         │
//! │  addItem(alice) ──► acquire("alice") ──► Arc A ──► lock ──► tx ...      │
//! │  addItem(alice) ──► acquire("alice") ──► Arc A ──► waits behind first   │
//! │  getCart(bob)   ──► acquire("bob")   ──► Arc B ──► runs in parallel     │
//! │                                                                         │
//! │  The registry only holds Weak references. The Arc lives in the guards  │
//! │  and in the futures waiting for it, so a user's entry dies when the    │
//! │  last operation on that cart finishes. Dead entries are swept when     │
//! │  the map grows past PRUNE_THRESHOLD.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tokio's mutex is fair (FIFO), so queued operations on one cart run in
//! arrival order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Registry size at which dead entries are swept.
const PRUNE_THRESHOLD: usize = 1024;

/// Guard for one cart. Dropping it releases the cart.
pub type CartGuard = OwnedMutexGuard<()>;

/// Hands out one async mutex per cart owner.
#[derive(Debug, Default)]
pub struct CartLocks {
    registry: StdMutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl CartLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `user_id`'s cart.
    pub async fn acquire(&self, user_id: &str) -> CartGuard {
        let lock = self.lock_for(user_id);
        lock.lock_owned().await
    }

    /// Number of carts currently locked or waited on.
    pub fn active(&self) -> usize {
        let registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.values().filter(|w| w.strong_count() > 0).count()
    }

    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        // Never held across an await
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(lock) = registry.get(user_id).and_then(Weak::upgrade) {
            return lock;
        }

        if registry.len() >= PRUNE_THRESHOLD {
            let before = registry.len();
            registry.retain(|_, w| w.strong_count() > 0);
            debug!(
                before,
                after = registry.len(),
                "Pruned idle cart locks"
            );
        }

        let lock = Arc::new(Mutex::new(()));
        registry.insert(user_id.to_string(), Arc::downgrade(&lock));
        lock
    }

    #[cfg(test)]
    fn registry_len(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
