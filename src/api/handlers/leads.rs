//! Lead handlers: list, status change and CSV export.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{
    ExportQuery, LeadListResponse, LeadQuery, LeadResponse, PaginationParams,
    UpdateLeadStatusRequest,
};
use crate::api::extract::CurrentUser;
use crate::app_state::AppState;
use crate::domain::{LeadId, ProjectId};
use crate::error::{AppError, ErrorResponse};

/// Download name of the CSV export.
const EXPORT_FILE_NAME: &str = "leads.csv";

/// The caller's leads, optionally filtered.
///
/// `GET /leads`
///
/// # Errors
///
/// Returns [`AppError::ProjectNotFound`] when filtering by a project the
/// caller does not own.
#[utoipa::path(
    get,
    path = "/api/v1/leads",
    tag = "Leads",
    summary = "List leads",
    params(
        LeadQuery,
        PaginationParams,
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Paginated leads, newest first", body = LeadListResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
    )
)]
pub async fn list_leads(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LeadQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<impl IntoResponse, AppError> {
    let leads = state
        .lead_service
        .list(user, query.project_id.map(ProjectId::from_uuid), query.status)
        .await?;
    let (leads, pagination) = page.paginate(leads);
    Ok(Json(LeadListResponse {
        data: leads.into_iter().map(LeadResponse::from).collect(),
        pagination,
    }))
}

/// Move a lead to another status.
///
/// `PATCH /leads/{id}/status`
///
/// # Errors
///
/// Returns [`AppError::LeadNotFound`] for unknown or foreign leads.
#[utoipa::path(
    patch,
    path = "/api/v1/leads/{id}/status",
    tag = "Leads",
    summary = "Update lead status",
    request_body = UpdateLeadStatusRequest,
    params(
        ("id" = Uuid, Path, description = "Lead id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Updated lead", body = LeadResponse),
        (status = 404, description = "Lead not found", body = ErrorResponse),
    )
)]
pub async fn update_lead_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLeadStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let lead = state
        .lead_service
        .update_status(user, LeadId::from_uuid(id), req.status)
        .await?;
    Ok(Json(LeadResponse::from(lead)))
}

/// Download leads as CSV.
///
/// `GET /leads/export.csv`
///
/// # Errors
///
/// Returns [`AppError::ProjectNotFound`] when filtering by a project the
/// caller does not own.
#[utoipa::path(
    get,
    path = "/api/v1/leads/export.csv",
    tag = "Leads",
    summary = "Export leads as CSV",
    description = "Columns: name, email, phone, project, date (dd/mm/YYYY), status. Every cell is double-quoted.",
    params(
        ExportQuery,
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 404, description = "Project not found", body = ErrorResponse),
    )
)]
pub async fn export_leads(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let csv = state
        .lead_service
        .export_csv(user, query.project_id.map(ProjectId::from_uuid))
        .await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        csv,
    ))
}

/// Lead routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/leads", get(list_leads))
        .route("/leads/export.csv", get(export_leads))
        .route("/leads/{id}/status", patch(update_lead_status))
}
