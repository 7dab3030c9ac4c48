//! # storefront-cart: Cart Service Façade
//!
//! Every public cart operation runs here: one per-cart lock, one storage
//! transaction, one fresh quote.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         storefront-cart                                 │
//! │                                                                         │
//! │  ┌─────────────┐   ┌──────────────────┐   ┌─────────────────────────┐  │
//! │  │  CartLocks  │──►│   CartService    │──►│   storefront-core       │  │
//! │  │ (per user)  │   │  (service.rs)    │   │  CartAggregate, quote   │  │
//! │  └─────────────┘   └────────┬─────────┘   └─────────────────────────┘  │
//! │                             │                                           │
//! │        ┌────────────────────┼───────────────────┐                       │
//! │        ▼                    ▼                   ▼                       │
//! │  ┌────────────┐   ┌──────────────────┐   ┌──────────────┐              │
//! │  │   retry    │   │ InventoryLedger  │   │ storefront-db│              │
//! │  │ (backoff)  │   │   (ledger.rs)    │   │  repositories│              │
//! │  └────────────┘   └──────────────────┘   └──────────────┘              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operations on one cart are serialized; operations on different carts
//! run concurrently and meet only in SQLite's write lock.

pub mod error;
pub mod ledger;
pub mod locks;
pub mod retry;
pub mod service;

pub use error::{CartError, CartResult};
pub use ledger::InventoryLedger;
pub use locks::{CartGuard, CartLocks};
pub use retry::CartServiceConfig;
pub use service::CartService;
