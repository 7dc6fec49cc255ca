//! Subscription handler: plan, usage and the project-creation gate.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::SubscriptionResponse;
use crate::api::extract::CurrentUser;
use crate::app_state::AppState;
use crate::error::AppError;

/// Effective plan and usage of the caller.
///
/// `GET /subscription`
///
/// # Errors
///
/// Returns [`AppError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/v1/subscription",
    tag = "Subscription",
    summary = "Get subscription",
    description = "Users without a subscription are on the free plan.",
    params(("x-user-id" = Uuid, Header, description = "Acting user")),
    responses(
        (status = 200, description = "Plan and usage", body = SubscriptionResponse),
    )
)]
pub async fn get_subscription(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let entitlement = state.project_service.entitlement(user).await?;
    let live = state.project_service.live_count(user).await?;
    Ok(Json(SubscriptionResponse::new(entitlement, live)))
}

/// Subscription routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/subscription", get(get_subscription))
}
