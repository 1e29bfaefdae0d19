//! User synchronization handlers
//!
//! Users are created on first sign-in from the identity provider's token.

use axum::{extract::State, http::StatusCode, Json};
use metagrid_core::{ensure_max_length, MAX_NAME_LENGTH};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthenticatedUser, JwtClaims};
use crate::db::{SyncUser, UserResponse};
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::JsonBody;

/// Profile fields sent by the frontend; token claims fill the gaps
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SyncUserRequest {
    /// User email
    #[serde(default)]
    #[schema(example = "user@example.com")]
    pub email: Option<String>,
    /// User display name
    #[serde(default)]
    #[schema(example = "Jane Doe")]
    pub name: Option<String>,
}

/// Response for user sync
#[derive(Debug, Serialize, ToSchema)]
pub struct SyncUserResponse {
    /// Whether a new user was created (vs updated)
    pub created: bool,
    /// The user data
    pub user: UserResponse,
}

/// Response for current user
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    /// The current user data
    pub user: UserResponse,
}

fn resolve_profile(claims: JwtClaims, request: SyncUserRequest) -> Result<SyncUser, ApiError> {
    let email = request
        .email
        .or(claims.email)
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::bad_request("An email address is required to sync a user"))?;

    if !email.contains('@') {
        return Err(ApiError::bad_request(format!(
            "'{}' is not a valid email address",
            email
        )));
    }
    ensure_max_length("email", &email, MAX_NAME_LENGTH)?;

    let name = request.name.or(claims.name);
    if let Some(ref name) = name {
        ensure_max_length("name", name, MAX_NAME_LENGTH)?;
    }

    Ok(SyncUser {
        subject: claims.subject,
        email,
        name,
    })
}

/// Sync user from the identity provider
///
/// Called by the frontend after sign-in. Uses upsert semantics keyed by the
/// token subject. A new user also gets an empty cart and an empty saved
/// subscriptions list.
#[utoipa::path(
    post,
    path = "/api/v1/users/sync",
    tag = "Users",
    request_body = SyncUserRequest,
    responses(
        (status = 200, description = "Existing user updated", body = SyncUserResponse),
        (status = 201, description = "User created", body = SyncUserResponse),
        (status = 400, description = "No usable email address"),
        (status = 401, description = "Unauthorized - missing or invalid token"),
        (status = 409, description = "Email already registered to another user")
    ),
    security(
        ("bearer_token" = [])
    )
)]
pub async fn sync_user_handler(
    State(state): State<AppState>,
    claims: JwtClaims,
    JsonBody(request): JsonBody<SyncUserRequest>,
) -> Result<(StatusCode, Json<SyncUserResponse>), ApiError> {
    let profile = resolve_profile(claims, request)?;
    let (user, created) = state.store.sync_user(profile).await?;

    if created {
        tracing::info!(user_id = %user.id, "User created on first sign-in");
    }

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(SyncUserResponse {
            created,
            user: UserResponse::from(user),
        }),
    ))
}

/// Get current user profile
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Current user profile", body = CurrentUserResponse),
        (status = 401, description = "Unauthorized or user not synced")
    ),
    security(
        ("bearer_token" = [])
    )
)]
pub async fn get_current_user_handler(auth: AuthenticatedUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        user: UserResponse::from(auth.user),
    })
}
