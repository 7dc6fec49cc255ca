//! Lead DTOs for listing, status changes and export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common_dto::PaginationMeta;
use crate::domain::{Lead, LeadStatus};

/// Query of `GET /leads`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeadQuery {
    /// Restrict to one project.
    #[serde(default)]
    pub project_id: Option<Uuid>,
    /// Restrict to one status.
    #[serde(default)]
    #[param(value_type = Option<LeadStatus>)]
    pub status: Option<LeadStatus>,
}

/// Query of `GET /leads/export.csv`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// Restrict to one project.
    #[serde(default)]
    pub project_id: Option<Uuid>,
}

/// A captured lead.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeadResponse {
    /// Lead id.
    pub id: Uuid,
    /// Project the form belongs to.
    pub project_id: Uuid,
    /// Submitted fields, exactly as captured.
    #[schema(value_type = Object)]
    pub data: Value,
    /// Follow-up status (`new` when never set).
    pub status: LeadStatus,
    /// Page the lead was captured on.
    pub source_url: String,
    /// Capture time.
    pub created_at: DateTime<Utc>,
}

impl From<Lead> for LeadResponse {
    fn from(lead: Lead) -> Self {
        let status = lead.status();
        Self {
            id: lead.id.into(),
            project_id: lead.project_id.into(),
            data: Value::Object(lead.data),
            status,
            source_url: lead.source_url,
            created_at: lead.created_at,
        }
    }
}

/// Paginated lead list.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeadListResponse {
    /// Leads of the current page, newest first.
    pub data: Vec<LeadResponse>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Request body for `PATCH /leads/{id}/status`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLeadStatusRequest {
    /// New status.
    pub status: LeadStatus,
}
