//! Project catalogue handlers (public, read-only)

use axum::{
    extract::{Path, State},
    Json,
};

use crate::db::{Page, PageQuery, ProjectResponse};
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::QueryParams;

/// List projects with their facets
///
/// Projects are ordered by id. Each entry carries the ESG-Search URL that
/// returns facet counts and the facet names grouped for display.
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "Projects",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of projects", body = Page<ProjectResponse>),
        (status = 400, description = "Invalid pagination parameters")
    )
)]
pub async fn list_projects_handler(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<Page<ProjectResponse>>, ApiError> {
    let params = state.page_params(&query)?;
    let page = state.store.list_projects(&params).await?;

    let base_url = state.config.esgf_search_url.as_str();
    Ok(Json(page.map(|p| ProjectResponse::new(p, base_url))))
}

/// Get one project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    params(("id" = i32, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project", body = ProjectResponse),
        (status = 404, description = "Project not found")
    )
)]
pub async fn get_project_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let not_found = || ApiError::not_found(format!("Project {} not found", id));

    let project_id: i32 = id.parse().map_err(|_| not_found())?;
    let project = state
        .store
        .find_project(project_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(ProjectResponse::new(
        project,
        &state.config.esgf_search_url,
    )))
}
