//! Append-only template snapshots.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::ids::ProjectId;

/// Label given to versions created by publish.
pub const PUBLISH_LABEL: &str = "publish";

/// A frozen copy of a project's template document.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectVersion {
    /// Row id.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: ProjectId,
    /// 1, 2, 3, ... per project.
    pub version_number: i32,
    /// Snapshot as written; merged over defaults on restore.
    pub template_data: Value,
    /// Optional label (`publish` for publish snapshots).
    pub label: Option<String>,
    /// Snapshot time.
    pub created_at: DateTime<Utc>,
}

impl ProjectVersion {
    /// Creates a snapshot. The store assigns `version_number`.
    #[must_use]
    pub fn new(project_id: ProjectId, template_data: Value, label: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            project_id,
            version_number: 0,
            template_data,
            label,
            created_at: Utc::now(),
        }
    }
}
