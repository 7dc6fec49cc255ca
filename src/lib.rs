//! # landkit
//!
//! Multi-tenant landing page builder: a REST API for the editor and the
//! dashboard, plus server-rendered public funnel pages with lead capture.
//!
//! ## Architecture
//!
//! ```text
//! Owners (REST, x-user-id)          Visitors (HTML)
//!     │                                  │
//!     ├── REST Handlers (api/)           ├── Public pages (public/)
//!     │                                  │
//!     ├── ProjectService / EditorService / LeadService / PageService (service/)
//!     ├── Editor sessions + autosave (editor/)
//!     ├── askama renderers (render/)
//!     ├── TemplateData, funnel, plans, EventBus (domain/)
//!     │
//!     └── ProjectStore: memory or PostgreSQL (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod editor;
pub mod error;
pub mod persistence;
pub mod public;
pub mod render;
pub mod service;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::services::ServeDir;

use app_state::AppState;

/// Extra room on top of the media limit for multipart framing.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Every route of the service: REST API, public pages and uploaded media.
///
/// Cross-cutting layers (tracing, CORS, timeouts) are added by the binary.
pub fn router(state: AppState) -> Router {
    let body_limit = state.media.max_bytes().saturating_add(MULTIPART_OVERHEAD);
    let media_prefix = state.media.url_prefix().to_string();
    let media_root = state.media.root().clone();

    let mut router = Router::new()
        .merge(api::build_router())
        .merge(public::routes());
    if media_prefix.len() > 1 && media_prefix.starts_with('/') {
        router = router.nest_service(&media_prefix, ServeDir::new(media_root));
    }
    router
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
