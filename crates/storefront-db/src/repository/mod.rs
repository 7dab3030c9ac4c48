//! # Repository Module
//!
//! Database repositories for the cart engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  CartService (storefront-cart)                                         │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                               │
//! │       │  db.carts().ensure_cart(&mut tx, user_id)                      │
//! │       │  db.variants().find(&mut tx, variant_id)                       │
//! │       ▼                                                                 │
//! │  VariantRepository / CouponRepository / CartRepository                 │
//! │       │                                                                 │
//! │       │  SQL, on the caller's connection                               │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Methods that take `conn: &mut SqliteConnection` run inside the        │
//! │  caller's transaction; the rest use the pool directly.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`VariantRepository`] - Catalog variants and stock
//! - [`CouponRepository`] - Coupon lookup and redemption
//! - [`CartRepository`] - Cart headers and items

pub mod cart;
pub mod coupon;
pub mod variant;

pub use cart::CartRepository;
pub use coupon::CouponRepository;
pub use variant::VariantRepository;
