//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::domain::EventBus;
use crate::editor::AutosavePolicy;
use crate::persistence::ProjectStore;
use crate::persistence::media::MediaStorage;
use crate::service::{EditorService, LeadService, PageService, ProjectService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Project, lead and version storage.
    pub store: Arc<dyn ProjectStore>,
    /// Project lifecycle.
    pub project_service: Arc<ProjectService>,
    /// Editor sessions.
    pub editor_service: Arc<EditorService>,
    /// Lead capture and management.
    pub lead_service: Arc<LeadService>,
    /// Public page rendering.
    pub page_service: Arc<PageService>,
    /// Uploaded images.
    pub media: Arc<MediaStorage>,
    /// Domain event bus.
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires every service on top of `store`.
    #[must_use]
    pub fn new(config: AppConfig, store: Arc<dyn ProjectStore>) -> Self {
        let event_bus = EventBus::new(config.event_bus_capacity);
        let page_service = Arc::new(PageService::new(
            Arc::clone(&store),
            &config.public_base_url,
        ));
        let editor_service = Arc::new(EditorService::new(
            Arc::clone(&store),
            Arc::clone(&page_service),
            event_bus.clone(),
            AutosavePolicy::from_config(&config),
            config.editor_history_limit,
        ));
        let project_service = Arc::new(ProjectService::new(
            Arc::clone(&store),
            Arc::clone(&editor_service),
            event_bus.clone(),
        ));
        let lead_service = Arc::new(LeadService::new(Arc::clone(&store), event_bus.clone()));
        let media = Arc::new(MediaStorage::from_config(&config));
        Self {
            config: Arc::new(config),
            store,
            project_service,
            editor_service,
            lead_service,
            page_service,
            media,
            event_bus,
        }
    }
}
