//! Project handlers: create, list, get, update, delete, publish, pause and
//! slug availability.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{
    CreateProjectRequest, ProjectResponse, SlugAvailabilityResponse, SlugQuery,
    UpdateProjectRequest,
};
use crate::api::extract::CurrentUser;
use crate::app_state::AppState;
use crate::domain::{Project, ProjectId};
use crate::error::{AppError, ErrorResponse};

fn summary(state: &AppState, project: Project) -> ProjectResponse {
    let url = state.page_service.canonical_url(&project.slug);
    ProjectResponse::summary(project, url)
}

fn detail(state: &AppState, project: Project) -> ProjectResponse {
    let url = state.page_service.canonical_url(&project.slug);
    ProjectResponse::detail(project, url)
}

/// Create a project with niche starter content.
///
/// `POST /projects`
///
/// # Errors
///
/// Returns [`AppError`] on validation failures, plan limits or slug
/// collisions.
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "Projects",
    summary = "Create a project",
    description = "Creates a landing page project. The slug is derived from the name unless given explicitly; derived slugs get a numeric suffix on collision.",
    request_body = CreateProjectRequest,
    params(("x-user-id" = Uuid, Header, description = "Acting user")),
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 403, description = "Plan limit reached or subscription inactive", body = ErrorResponse),
        (status = 409, description = "Slug already taken", body = ErrorResponse),
        (status = 422, description = "Invalid name or slug", body = ErrorResponse),
    )
)]
pub async fn create_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let project = state.project_service.create(user, req.into()).await?;
    Ok((StatusCode::CREATED, Json(detail(&state, project))))
}

/// List the caller's projects.
///
/// `GET /projects`
///
/// # Errors
///
/// Returns [`AppError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "Projects",
    summary = "List projects",
    params(("x-user-id" = Uuid, Header, description = "Acting user")),
    responses(
        (status = 200, description = "Live projects, newest first", body = Vec<ProjectResponse>),
    )
)]
pub async fn list_projects(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let projects = state.project_service.list(user).await?;
    let data: Vec<ProjectResponse> = projects.into_iter().map(|p| summary(&state, p)).collect();
    Ok(Json(data))
}

/// Project details with its template document.
///
/// `GET /projects/{id}`
///
/// # Errors
///
/// Returns [`AppError::ProjectNotFound`] for unknown or foreign projects.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    summary = "Get project",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Project details", body = ProjectResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let project = state
        .project_service
        .get(user, ProjectId::from_uuid(id))
        .await?;
    Ok(Json(detail(&state, project)))
}

/// Change name, slug, template or domain.
///
/// `PATCH /projects/{id}`
///
/// # Errors
///
/// Returns [`AppError`] when the slug is locked or taken, the template is
/// outside the niche, or the plan has no custom domains.
#[utoipa::path(
    patch,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    summary = "Update project metadata",
    request_body = UpdateProjectRequest,
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Updated project", body = ProjectResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
        (status = 409, description = "Slug taken or locked", body = ErrorResponse),
    )
)]
pub async fn update_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let project = state
        .project_service
        .update(user, ProjectId::from_uuid(id), req.into())
        .await?;
    Ok(Json(detail(&state, project)))
}

/// Soft-delete a project.
///
/// `DELETE /projects/{id}`
///
/// # Errors
///
/// Returns [`AppError::ProjectNotFound`] for unknown or foreign projects.
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    summary = "Delete project",
    description = "Soft-deletes the project. Its pages stop resolving and its slug becomes free again.",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 404, description = "Project not found", body = ErrorResponse),
    )
)]
pub async fn delete_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .project_service
        .delete(user, ProjectId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Publish and snapshot a version.
///
/// `POST /projects/{id}/publish`
///
/// # Errors
///
/// Returns [`AppError`] when pending editor changes cannot be written.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/publish",
    tag = "Projects",
    summary = "Publish project",
    description = "Flushes the open editor session, activates the project, freezes its slug and records a `publish` version.",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Published project", body = ProjectResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
        (status = 409, description = "Revision conflict", body = ErrorResponse),
    )
)]
pub async fn publish_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let project = state
        .project_service
        .publish(user, ProjectId::from_uuid(id))
        .await?;
    Ok(Json(detail(&state, project)))
}

/// Take the public pages offline.
///
/// `POST /projects/{id}/pause`
///
/// # Errors
///
/// Returns [`AppError::ProjectNotFound`] for unknown or foreign projects.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/pause",
    tag = "Projects",
    summary = "Pause project",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Paused project", body = ProjectResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
    )
)]
pub async fn pause_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let project = state
        .project_service
        .pause(user, ProjectId::from_uuid(id))
        .await?;
    Ok(Json(summary(&state, project)))
}

/// Check whether a slug can be used.
///
/// `GET /projects/slug-available`
///
/// # Errors
///
/// Returns [`AppError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/v1/projects/slug-available",
    tag = "Projects",
    summary = "Check slug availability",
    params(SlugQuery),
    responses(
        (status = 200, description = "Availability", body = SlugAvailabilityResponse),
    )
)]
pub async fn slug_available(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<SlugQuery>,
) -> Result<impl IntoResponse, AppError> {
    let check = state.project_service.slug_available(&query.slug).await?;
    Ok(Json(SlugAvailabilityResponse::from(check)))
}

/// Project routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/slug-available", get(slug_available))
        .route(
            "/projects/{id}",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/projects/{id}/publish", post(publish_project))
        .route("/projects/{id}/pause", post(pause_project))
}
