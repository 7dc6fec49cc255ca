//! System endpoints: health check and the niche/template catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::Niche;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// Service health status.
///
/// `GET /health`
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// One template variant of a niche.
#[derive(Debug, Serialize, ToSchema)]
pub struct TemplateInfo {
    template_id: &'static str,
    description: &'static str,
}

/// A niche and its template variants.
#[derive(Debug, Serialize, ToSchema)]
pub struct NicheInfo {
    niche: Niche,
    label: &'static str,
    default_template: &'static str,
    templates: Vec<TemplateInfo>,
}

/// List niches and their templates.
///
/// `GET /config/niches`
#[utoipa::path(
    get,
    path = "/config/niches",
    tag = "System",
    summary = "List niches",
    description = "Returns every niche with its template variants; the first variant is the default.",
    responses(
        (status = 200, description = "Niche catalog", body = Vec<NicheInfo>),
    )
)]
pub async fn niches_handler() -> impl IntoResponse {
    let niches: Vec<NicheInfo> = Niche::ALL
        .into_iter()
        .map(|niche| NicheInfo {
            niche,
            label: niche.label(),
            default_template: niche.default_renderer().template_id(),
            templates: niche
                .renderers()
                .iter()
                .map(|r| TemplateInfo {
                    template_id: r.template_id(),
                    description: r.description(),
                })
                .collect(),
        })
        .collect();
    (StatusCode::OK, Json(niches))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/niches", get(niches_handler))
}
