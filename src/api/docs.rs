//! OpenAPI document for the REST API.

use utoipa::OpenApi;

use crate::api::{dto, handlers};
use crate::domain::{CollectionKind, LeadStatus, Niche, Plan, ProjectStatus, SubscriptionStatus};
use crate::editor::{EditorTab, SyncStatus};
use crate::error::{ErrorBody, ErrorResponse};
use crate::render::Device;

/// Generated OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "landkit",
        description = "Landing page builder: projects, editor, leads and subscription.",
    ),
    paths(
        // --- System ---
        handlers::system::health_handler,
        handlers::system::niches_handler,

        // --- Projects ---
        handlers::projects::create_project,
        handlers::projects::list_projects,
        handlers::projects::get_project,
        handlers::projects::update_project,
        handlers::projects::delete_project,
        handlers::projects::publish_project,
        handlers::projects::pause_project,
        handlers::projects::slug_available,

        // --- Editor ---
        handlers::editor::open_editor,
        handlers::editor::get_editor,
        handlers::editor::close_editor,
        handlers::editor::update_tab,
        handlers::editor::add_item,
        handlers::editor::update_item,
        handlers::editor::remove_item,
        handlers::editor::undo,
        handlers::editor::redo,
        handlers::editor::save,
        handlers::editor::preview,
        handlers::editor::list_versions,
        handlers::editor::restore_version,
        handlers::editor::upload_image,

        // --- Leads ---
        handlers::leads::list_leads,
        handlers::leads::update_lead_status,
        handlers::leads::export_leads,

        // --- Subscription ---
        handlers::subscription::get_subscription,
    ),
    components(
        schemas(
            ErrorResponse,
            ErrorBody,
            Niche,
            ProjectStatus,
            LeadStatus,
            SubscriptionStatus,
            Plan,
            CollectionKind,
            EditorTab,
            SyncStatus,
            Device,
            handlers::system::HealthResponse,
            handlers::system::NicheInfo,
            handlers::system::TemplateInfo,
            dto::CreateProjectRequest,
            dto::UpdateProjectRequest,
            dto::ProjectResponse,
            dto::SlugAvailabilityResponse,
            dto::SessionResponse,
            dto::CollectionResponse,
            dto::SaveRequest,
            dto::SaveResponse,
            dto::VersionResponse,
            dto::ImageUploadResponse,
            dto::LeadResponse,
            dto::LeadListResponse,
            dto::PaginationMeta,
            dto::UpdateLeadStatusRequest,
            dto::SubscriptionResponse,
            dto::UsageDto,
        )
    ),
    tags(
        (name = "System", description = "Health and catalog"),
        (name = "Projects", description = "Project lifecycle"),
        (name = "Editor", description = "Editor sessions, versions and uploads"),
        (name = "Leads", description = "Captured leads"),
        (name = "Subscription", description = "Plan and usage"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_public_api() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/projects"));
        assert!(doc.paths.paths.contains_key("/api/v1/leads/export.csv"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
