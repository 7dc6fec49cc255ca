//! Service layer: business logic orchestration.
//!
//! Handlers only talk to these services. Each one owns an
//! `Arc<dyn ProjectStore>` and publishes a [`crate::domain::ProjectEvent`]
//! through the [`crate::domain::EventBus`] after every durable change.

pub mod editor_service;
pub mod event_log;
pub mod lead_service;
pub mod page_service;
pub mod project_service;

pub use editor_service::EditorService;
pub use lead_service::LeadService;
pub use page_service::PageService;
pub use project_service::ProjectService;
