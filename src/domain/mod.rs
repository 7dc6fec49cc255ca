//! Domain layer: entities, the template document, funnel rules and the
//! event system.
//!
//! Everything here is pure or in-memory. Storage, HTTP and rendering live
//! in their own layers and depend on this one, never the other way round.

pub mod collection;
pub mod event_bus;
pub mod funnel;
pub mod ids;
pub mod lead;
pub mod niche;
pub mod plan;
pub mod project;
pub mod project_event;
pub mod template_data;
pub mod version;

pub use collection::{CollectionChange, CollectionKind, CollectionOp};
pub use event_bus::EventBus;
pub use funnel::{FunnelContext, FunnelStage};
pub use ids::{LeadId, ProjectId, UserId};
pub use lead::{Lead, LeadStatus};
pub use niche::{Niche, RendererKind};
pub use plan::{Entitlement, Plan, Subscription, SubscriptionStatus};
pub use project::{Project, ProjectStatus};
pub use project_event::{ProjectEvent, SaveTrigger};
pub use template_data::TemplateData;
pub use version::ProjectVersion;
