//! Editor DTOs: session state, saves, versions and uploads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::ProjectVersion;
use crate::editor::{SessionSnapshot, SyncStatus};
use crate::persistence::media::StoredMedia;
use crate::render::Device;

/// State of an editor session.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    /// Project being edited.
    pub project_id: Uuid,
    /// Project display name.
    pub name: String,
    /// Public slug.
    pub slug: String,
    /// Template variant.
    pub template_id: String,
    /// Visible document.
    #[schema(value_type = Object)]
    pub template_data: Value,
    /// Autosave state.
    pub sync: SyncStatus,
    /// Unsaved edits exist.
    pub dirty: bool,
    /// Undo available.
    pub can_undo: bool,
    /// Redo available.
    pub can_redo: bool,
    /// Local edit counter.
    pub local_revision: u64,
    /// Stored revision the next write is based on.
    pub store_revision: i64,
    /// Last successful write.
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Partial update behind the latest undoable change.
    #[schema(value_type = Option<Object>)]
    pub last_patch: Option<Value>,
    /// When that change was made.
    pub last_edited_at: Option<DateTime<Utc>>,
}

impl From<SessionSnapshot> for SessionResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            project_id: snapshot.project_id.into(),
            name: snapshot.name,
            slug: snapshot.slug,
            template_id: snapshot.template_id,
            template_data: snapshot.template_data.to_value(),
            sync: snapshot.sync,
            dirty: snapshot.dirty,
            can_undo: snapshot.can_undo,
            can_redo: snapshot.can_redo,
            local_revision: snapshot.local_revision,
            store_revision: snapshot.store_revision,
            last_saved_at: snapshot.last_saved_at,
            last_patch: snapshot.last_patch,
            last_edited_at: snapshot.last_edited_at,
        }
    }
}

/// Response of a collection command.
#[derive(Debug, Serialize, ToSchema)]
pub struct CollectionResponse {
    /// Id of the added, updated or removed item.
    pub item_id: String,
    /// Session state after the command.
    pub session: SessionResponse,
}

/// Request body for `POST .../editor/save`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SaveRequest {
    /// Version label.
    #[serde(default)]
    pub label: Option<String>,
}

/// A stored version.
#[derive(Debug, Serialize, ToSchema)]
pub struct VersionResponse {
    /// 1, 2, 3, ... per project.
    pub version_number: i32,
    /// Optional label.
    pub label: Option<String>,
    /// Snapshot time.
    pub created_at: DateTime<Utc>,
}

impl From<ProjectVersion> for VersionResponse {
    fn from(version: ProjectVersion) -> Self {
        Self {
            version_number: version.version_number,
            label: version.label,
            created_at: version.created_at,
        }
    }
}

/// Response of `POST .../editor/save`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SaveResponse {
    /// Session after the write.
    pub session: SessionResponse,
    /// Version created from the saved document.
    pub version: VersionResponse,
}

/// Query of `GET .../editor/preview`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PreviewQuery {
    /// Frame size; desktop when absent.
    #[serde(default)]
    #[param(value_type = Option<Device>)]
    pub device: Device,
}

/// Response of `POST .../images`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ImageUploadResponse {
    /// Public URL to put into an image field.
    pub url: String,
    /// Size in bytes.
    pub size: usize,
    /// MIME type.
    pub content_type: String,
}

impl From<StoredMedia> for ImageUploadResponse {
    fn from(media: StoredMedia) -> Self {
        Self {
            url: media.url,
            size: media.size,
            content_type: media.content_type,
        }
    }
}
