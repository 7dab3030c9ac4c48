//! Cart routes.
//!
//! Every route acts on the caller's own cart and answers with the
//! refreshed [`CartQuote`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use storefront_core::CartQuote;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/cart", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/items", post(add_item))
        .route(
            "/api/v1/cart/items/{item_id}",
            put(update_item_quantity).delete(remove_item),
        )
        .route("/api/v1/cart/coupon/apply", post(apply_coupon))
        .route("/api/v1/cart/coupon", delete(remove_coupon))
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub variant_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyCouponRequest {
    pub code: String,
}

// =============================================================================
// Handlers
// =============================================================================

async fn get_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<CartQuote>> {
    Ok(Json(state.cart.get_cart(&user.user_id).await?))
}

async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> ApiResult<Json<CartQuote>> {
    let Json(req) = body?;
    let quote = state
        .cart
        .add_item(&user.user_id, &req.variant_id, req.quantity)
        .await?;
    Ok(Json(quote))
}

async fn update_item_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
    body: Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> ApiResult<Json<CartQuote>> {
    let Json(req) = body?;
    let quote = state
        .cart
        .update_item_quantity(&user.user_id, &item_id, req.quantity)
        .await?;
    Ok(Json(quote))
}

async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
) -> ApiResult<Json<CartQuote>> {
    Ok(Json(state.cart.remove_item(&user.user_id, &item_id).await?))
}

async fn apply_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<ApplyCouponRequest>, JsonRejection>,
) -> ApiResult<Json<CartQuote>> {
    let Json(req) = body?;
    Ok(Json(state.cart.apply_coupon(&user.user_id, &req.code).await?))
}

async fn remove_coupon(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<CartQuote>> {
    Ok(Json(state.cart.remove_coupon(&user.user_id).await?))
}

async fn clear_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<CartQuote>> {
    Ok(Json(state.cart.clear_cart(&user.user_id).await?))
}
