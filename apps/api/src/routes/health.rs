//! Liveness endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::warn;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

/// Reports whether storage answers a trivial query.
async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.db.health_check().await {
        (StatusCode::OK, Json(json!({ "status": "healthy" })))
    } else {
        warn!("Health check failed: storage did not answer");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy" })),
        )
    }
}
