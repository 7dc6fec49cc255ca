//! Domain events emitted by project, editor and lead operations.
//!
//! Every durable change publishes a [`ProjectEvent`] through the
//! [`super::EventBus`]. The event-log task persists them to the
//! `project_events` table when PostgreSQL is enabled.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{LeadId, LeadStatus, ProjectId};

/// What triggered a template write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveTrigger {
    /// Debounced background flush.
    Autosave,
    /// Explicit "save now".
    Manual,
    /// Flush performed by publish.
    Publish,
    /// Flush performed when the session closed.
    Close,
}

/// Domain event emitted after every durable mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ProjectEvent {
    /// A project was created.
    ProjectCreated {
        /// Project identifier.
        project_id: ProjectId,
        /// Public slug.
        slug: String,
        /// Niche string (e.g. `"event"`).
        niche: String,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Name, slug, template or domain changed.
    ProjectUpdated {
        /// Project identifier.
        project_id: ProjectId,
        /// Slug after the change.
        slug: String,
        /// Update timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Template data was written to the store.
    TemplateSaved {
        /// Project identifier.
        project_id: ProjectId,
        /// Store revision after the write.
        revision: i64,
        /// What caused the write.
        trigger: SaveTrigger,
        /// Write timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A version snapshot was appended.
    VersionCreated {
        /// Project identifier.
        project_id: ProjectId,
        /// Version number.
        version_number: i32,
        /// Optional label.
        label: Option<String>,
        /// Snapshot timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The project was published.
    ProjectPublished {
        /// Project identifier.
        project_id: ProjectId,
        /// Public slug, frozen from now on.
        slug: String,
        /// Publish timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Public pages were paused.
    ProjectPaused {
        /// Project identifier.
        project_id: ProjectId,
        /// Pause timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The project was soft-deleted.
    ProjectDeleted {
        /// Project identifier.
        project_id: ProjectId,
        /// Deletion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A visitor submitted the lead form.
    LeadCaptured {
        /// Project identifier.
        project_id: ProjectId,
        /// New lead.
        lead_id: LeadId,
        /// Capture timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The owner moved a lead to another status.
    LeadStatusChanged {
        /// Project identifier.
        project_id: ProjectId,
        /// Lead identifier.
        lead_id: LeadId,
        /// New status.
        status: LeadStatus,
        /// Change timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl ProjectEvent {
    /// Returns the project ID associated with this event.
    #[must_use]
    pub fn project_id(&self) -> ProjectId {
        match self {
            Self::ProjectCreated { project_id, .. }
            | Self::ProjectUpdated { project_id, .. }
            | Self::TemplateSaved { project_id, .. }
            | Self::VersionCreated { project_id, .. }
            | Self::ProjectPublished { project_id, .. }
            | Self::ProjectPaused { project_id, .. }
            | Self::ProjectDeleted { project_id, .. }
            | Self::LeadCaptured { project_id, .. }
            | Self::LeadStatusChanged { project_id, .. } => *project_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::ProjectCreated { .. } => "project_created",
            Self::ProjectUpdated { .. } => "project_updated",
            Self::TemplateSaved { .. } => "template_saved",
            Self::VersionCreated { .. } => "version_created",
            Self::ProjectPublished { .. } => "project_published",
            Self::ProjectPaused { .. } => "project_paused",
            Self::ProjectDeleted { .. } => "project_deleted",
            Self::LeadCaptured { .. } => "lead_captured",
            Self::LeadStatusChanged { .. } => "lead_status_changed",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn template_saved_serializes_with_tag() {
        let event = ProjectEvent::TemplateSaved {
            project_id: ProjectId::new(),
            revision: 7,
            trigger: SaveTrigger::Autosave,
            timestamp: Utc::now(),
        };
        let Ok(json) = serde_json::to_value(&event) else {
            panic!("serialization failed");
        };
        assert_eq!(json["event_type"], "template_saved");
        assert_eq!(json["trigger"], "autosave");
        assert_eq!(json["revision"], 7);
    }

    #[test]
    fn project_id_accessor() {
        let id = ProjectId::new();
        let event = ProjectEvent::LeadCaptured {
            project_id: id,
            lead_id: LeadId::new(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.project_id(), id);
        assert_eq!(event.event_type_str(), "lead_captured");
    }
}
