//! Subscription handlers
//!
//! Covers both the per-user saved subscriptions list and subscription
//! definitions with a notification period.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthenticatedUser;
use crate::db::{
    NewSubscription, Page, PageQuery, SavedSubscriptionsResponse, SavedSubscriptionsUpdate,
    SubscriptionPatch, SubscriptionResponse,
};
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{ensure_owner, parse_uuid, JsonBody, QueryParams};

fn subscription_not_found() -> ApiError {
    ApiError::not_found("Subscription not found")
}

/// Get the caller's saved subscriptions list
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/saved/{user_id}",
    tag = "Subscriptions",
    params(("user_id" = String, Path, description = "Owner user id (must be the caller)")),
    responses(
        (status = 200, description = "Saved subscriptions", body = SavedSubscriptionsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not found or owned by another user")
    ),
    security(("bearer_token" = []))
)]
pub async fn get_saved_subscriptions_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(user_id): Path<String>,
) -> Result<Json<SavedSubscriptionsResponse>, ApiError> {
    let user_id = ensure_owner(&auth.user, &user_id, "Saved subscriptions")?;

    let saved = state
        .store
        .find_saved_subscriptions(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Saved subscriptions not found"))?;

    Ok(Json(SavedSubscriptionsResponse::from(saved)))
}

/// Replace the caller's saved subscriptions list
#[utoipa::path(
    patch,
    path = "/api/v1/subscriptions/saved/{user_id}",
    tag = "Subscriptions",
    params(("user_id" = String, Path, description = "Owner user id (must be the caller)")),
    request_body = SavedSubscriptionsUpdate,
    responses(
        (status = 200, description = "Updated saved subscriptions", body = SavedSubscriptionsResponse),
        (status = 400, description = "subscriptions is not a JSON array"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not found or owned by another user")
    ),
    security(("bearer_token" = []))
)]
pub async fn update_saved_subscriptions_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(user_id): Path<String>,
    JsonBody(update): JsonBody<SavedSubscriptionsUpdate>,
) -> Result<Json<SavedSubscriptionsResponse>, ApiError> {
    let user_id = ensure_owner(&auth.user, &user_id, "Saved subscriptions")?;

    let saved = state
        .store
        .replace_saved_subscriptions(user_id, update.subscriptions)
        .await?
        .ok_or_else(|| ApiError::not_found("Saved subscriptions not found"))?;

    Ok(Json(SavedSubscriptionsResponse::from(saved)))
}

/// List the caller's subscriptions
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions",
    tag = "Subscriptions",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of subscriptions", body = Page<SubscriptionResponse>),
        (status = 400, description = "Invalid pagination parameters"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_token" = []))
)]
pub async fn list_subscriptions_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<Page<SubscriptionResponse>>, ApiError> {
    let params = state.page_params(&query)?;
    let page = state
        .store
        .list_subscriptions(auth.user.id, &params)
        .await?;
    Ok(Json(page.map(SubscriptionResponse::from)))
}

/// Create a subscription
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions",
    tag = "Subscriptions",
    request_body = NewSubscription,
    responses(
        (status = 201, description = "Subscription created", body = SubscriptionResponse),
        (status = 400, description = "Invalid subscription"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_token" = []))
)]
pub async fn create_subscription_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    JsonBody(input): JsonBody<NewSubscription>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), ApiError> {
    input.validate()?;

    let subscription = state.store.create_subscription(auth.user.id, input).await?;
    tracing::info!(
        user_id = %auth.user.id,
        subscription_uuid = %subscription.uuid,
        period = subscription.period.code(),
        "Subscription created"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubscriptionResponse::from(subscription)),
    ))
}

/// Get one of the caller's subscriptions
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/{uuid}",
    tag = "Subscriptions",
    params(("uuid" = String, Path, description = "Subscription uuid")),
    responses(
        (status = 200, description = "Subscription", body = SubscriptionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Subscription not found")
    ),
    security(("bearer_token" = []))
)]
pub async fn get_subscription_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(uuid): Path<String>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let uuid = parse_uuid(&uuid)?;
    let subscription = state
        .store
        .find_subscription(auth.user.id, uuid)
        .await?
        .ok_or_else(subscription_not_found)?;

    Ok(Json(SubscriptionResponse::from(subscription)))
}

/// Replace a subscription
///
/// Fields missing from the body take their defaults (`period` W, no name,
/// empty facets).
#[utoipa::path(
    put,
    path = "/api/v1/subscriptions/{uuid}",
    tag = "Subscriptions",
    params(("uuid" = String, Path, description = "Subscription uuid")),
    request_body = NewSubscription,
    responses(
        (status = 200, description = "Subscription replaced", body = SubscriptionResponse),
        (status = 400, description = "Invalid subscription"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Subscription not found")
    ),
    security(("bearer_token" = []))
)]
pub async fn replace_subscription_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(uuid): Path<String>,
    JsonBody(input): JsonBody<NewSubscription>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let uuid = parse_uuid(&uuid)?;
    input.validate()?;

    let subscription = state
        .store
        .replace_subscription(auth.user.id, uuid, input)
        .await?
        .ok_or_else(subscription_not_found)?;

    Ok(Json(SubscriptionResponse::from(subscription)))
}

/// Partially update a subscription
///
/// Only fields present in the body change.
#[utoipa::path(
    patch,
    path = "/api/v1/subscriptions/{uuid}",
    tag = "Subscriptions",
    params(("uuid" = String, Path, description = "Subscription uuid")),
    request_body = SubscriptionPatch,
    responses(
        (status = 200, description = "Subscription updated", body = SubscriptionResponse),
        (status = 400, description = "Invalid subscription"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Subscription not found")
    ),
    security(("bearer_token" = []))
)]
pub async fn patch_subscription_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(uuid): Path<String>,
    JsonBody(patch): JsonBody<SubscriptionPatch>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let uuid = parse_uuid(&uuid)?;
    patch.validate()?;

    let subscription = state
        .store
        .patch_subscription(auth.user.id, uuid, patch)
        .await?
        .ok_or_else(subscription_not_found)?;

    Ok(Json(SubscriptionResponse::from(subscription)))
}

/// Delete a subscription
#[utoipa::path(
    delete,
    path = "/api/v1/subscriptions/{uuid}",
    tag = "Subscriptions",
    params(("uuid" = String, Path, description = "Subscription uuid")),
    responses(
        (status = 204, description = "Subscription deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Subscription not found")
    ),
    security(("bearer_token" = []))
)]
pub async fn delete_subscription_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(uuid): Path<String>,
) -> Result<StatusCode, ApiError> {
    let uuid = parse_uuid(&uuid)?;
    if !state.store.delete_subscription(auth.user.id, uuid).await? {
        return Err(subscription_not_found());
    }

    tracing::info!(user_id = %auth.user.id, subscription_uuid = %uuid, "Subscription deleted");
    Ok(StatusCode::NO_CONTENT)
}
