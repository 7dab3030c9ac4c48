//! # Storefront API
//!
//! HTTP/JSON transport for the cart engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Storefront API                                 │
//! │                                                                         │
//! │  ┌────────────────┐  ┌──────────────────────────┐  ┌─────────────────┐ │
//! │  │  TraceLayer    │  │  routes::cart            │  │  routes::health │ │
//! │  │  (tower-http)  │─►│                          │  │                 │ │
//! │  │                │  │ • GET    /api/v1/cart    │  │ • GET /health   │ │
//! │  └────────────────┘  │ • DELETE /api/v1/cart    │  └─────────────────┘ │
//! │                      │ • POST   .../items       │                      │
//! │  ┌────────────────┐  │ • PUT    .../items/{id}  │                      │
//! │  │  AuthUser      │─►│ • DELETE .../items/{id}  │                      │
//! │  │  (Bearer JWT)  │  │ • POST   .../coupon/apply│                      │
//! │  └────────────────┘  │ • DELETE .../coupon      │                      │
//! │                      └────────────┬─────────────┘                      │
//! │                                   ▼                                     │
//! │                         storefront_cart::CartService                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - listen port (default: 8080)
//! - `DATABASE_PATH` - SQLite file (default: ./storefront.db)
//! - `DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `JWT_SECRET` - HS256 secret shared with the auth service
//! - `CART_TX_MAX_RETRIES` - busy-storage retries per operation (default: 3)

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use axum::Router;
use storefront_cart::CartService;
use storefront_db::Database;
use tower_http::trace::TraceLayer;

// Re-exports
pub use auth::{AuthUser, JwtVerifier};
pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub cart: CartService,
    pub db: Database,
    pub jwt: JwtVerifier,
}

impl AppState {
    pub fn new(db: Database, cart: CartService, jwt: JwtVerifier) -> Self {
        AppState { cart, db, jwt }
    }
}

/// Builds the full router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::cart::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
