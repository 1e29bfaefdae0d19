//! Saved search handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthenticatedUser;
use crate::db::{NewSearch, Page, PageQuery, SearchResponse};
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{parse_uuid, JsonBody, QueryParams};

/// List the caller's saved searches
#[utoipa::path(
    get,
    path = "/api/v1/carts/searches",
    tag = "Searches",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of saved searches", body = Page<SearchResponse>),
        (status = 400, description = "Invalid pagination parameters"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_token" = []))
)]
pub async fn list_searches_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<Page<SearchResponse>>, ApiError> {
    let params = state.page_params(&query)?;
    let page = state.store.list_searches(auth.user.id, &params).await?;
    Ok(Json(page.map(SearchResponse::from)))
}

/// Save a search
#[utoipa::path(
    post,
    path = "/api/v1/carts/searches",
    tag = "Searches",
    request_body = NewSearch,
    responses(
        (status = 201, description = "Search saved", body = SearchResponse),
        (status = 400, description = "Invalid search or unknown project"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_token" = []))
)]
pub async fn create_search_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    JsonBody(input): JsonBody<NewSearch>,
) -> Result<(StatusCode, Json<SearchResponse>), ApiError> {
    input.validate()?;

    if !state.store.project_exists(input.project).await? {
        return Err(ApiError::bad_request(format!(
            "Project {} does not exist",
            input.project
        )));
    }

    let search = state.store.create_search(auth.user.id, input).await?;
    tracing::info!(
        user_id = %auth.user.id,
        search_uuid = %search.uuid,
        project_id = search.project_id,
        "Search saved"
    );

    Ok((StatusCode::CREATED, Json(SearchResponse::from(search))))
}

/// Get one of the caller's saved searches
#[utoipa::path(
    get,
    path = "/api/v1/carts/searches/{uuid}",
    tag = "Searches",
    params(("uuid" = String, Path, description = "Search uuid")),
    responses(
        (status = 200, description = "Saved search", body = SearchResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Search not found")
    ),
    security(("bearer_token" = []))
)]
pub async fn get_search_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(uuid): Path<String>,
) -> Result<Json<SearchResponse>, ApiError> {
    let uuid = parse_uuid(&uuid)?;
    let search = state
        .store
        .find_search(auth.user.id, uuid)
        .await?
        .ok_or_else(|| ApiError::not_found("Search not found"))?;

    Ok(Json(SearchResponse::from(search)))
}

/// Delete one of the caller's saved searches
#[utoipa::path(
    delete,
    path = "/api/v1/carts/searches/{uuid}",
    tag = "Searches",
    params(("uuid" = String, Path, description = "Search uuid")),
    responses(
        (status = 204, description = "Search deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Search not found")
    ),
    security(("bearer_token" = []))
)]
pub async fn delete_search_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(uuid): Path<String>,
) -> Result<StatusCode, ApiError> {
    let uuid = parse_uuid(&uuid)?;
    if !state.store.delete_search(auth.user.id, uuid).await? {
        return Err(ApiError::not_found("Search not found"));
    }

    tracing::info!(user_id = %auth.user.id, search_uuid = %uuid, "Search deleted");
    Ok(StatusCode::NO_CONTENT)
}
