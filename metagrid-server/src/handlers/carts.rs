//! Cart handlers
//!
//! Each user owns exactly one cart, created when the user first syncs.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::auth::AuthenticatedUser;
use crate::db::{CartItemsUpdate, CartResponse};
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{ensure_owner, JsonBody};

/// Get the caller's cart
#[utoipa::path(
    get,
    path = "/api/v1/carts/items/{user_id}",
    tag = "Carts",
    params(("user_id" = String, Path, description = "Owner user id (must be the caller)")),
    responses(
        (status = 200, description = "Cart", body = CartResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Cart not found or owned by another user")
    ),
    security(("bearer_token" = []))
)]
pub async fn get_cart_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(user_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let user_id = ensure_owner(&auth.user, &user_id, "Cart")?;

    let cart = state
        .store
        .find_cart(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Cart not found"))?;

    Ok(Json(CartResponse::from(cart)))
}

/// Replace the items in the caller's cart
#[utoipa::path(
    patch,
    path = "/api/v1/carts/items/{user_id}",
    tag = "Carts",
    params(("user_id" = String, Path, description = "Owner user id (must be the caller)")),
    request_body = CartItemsUpdate,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "items is not a JSON array"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Cart not found or owned by another user")
    ),
    security(("bearer_token" = []))
)]
pub async fn update_cart_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(user_id): Path<String>,
    JsonBody(update): JsonBody<CartItemsUpdate>,
) -> Result<Json<CartResponse>, ApiError> {
    let user_id = ensure_owner(&auth.user, &user_id, "Cart")?;

    let item_count = update.items.len();
    let cart = state
        .store
        .replace_cart_items(user_id, update.items)
        .await?
        .ok_or_else(|| ApiError::not_found("Cart not found"))?;

    tracing::debug!(user_id = %user_id, item_count = item_count, "Cart items replaced");
    Ok(Json(CartResponse::from(cart)))
}
