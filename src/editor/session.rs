//! One user's open editor on one project.
//!
//! The session separates what the user sees (`current`, with a local
//! revision counter) from what the store durably holds (`saved`, with the
//! store revision). Write failures never touch `current`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::history::{History, HistoryEntry};
use crate::domain::{Project, ProjectId, TemplateData, UserId};
use crate::error::AppError;

/// Relationship between the visible document and the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    /// Everything visible is stored.
    Saved,
    /// Edits wait for the debounce window.
    Pending,
    /// A write is in flight.
    Saving,
    /// The last write failed; edits are kept and retried.
    Failed {
        /// Last error message.
        error: String,
    },
    /// The stored project moved on; autosave stopped.
    Conflict {
        /// Conflict description.
        error: String,
    },
}

/// Read-only view of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Project being edited.
    pub project_id: ProjectId,
    /// Project display name.
    pub name: String,
    /// Public slug.
    pub slug: String,
    /// Template variant the preview renders with.
    pub template_id: String,
    /// Visible document.
    pub template_data: TemplateData,
    /// Sync state.
    pub sync: SyncStatus,
    /// Unsaved edits exist.
    pub dirty: bool,
    /// Undo available.
    pub can_undo: bool,
    /// Redo available.
    pub can_redo: bool,
    /// Local edit counter.
    pub local_revision: u64,
    /// Store revision the next write is based on.
    pub store_revision: i64,
    /// Time of the last successful write.
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Partial update behind the change currently in effect.
    pub last_patch: Option<Value>,
    /// When that change was applied.
    pub last_edited_at: Option<DateTime<Utc>>,
}

/// Data handed to a store write.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    /// Document to write.
    pub data: TemplateData,
    /// Local revision the document corresponds to.
    pub local_revision: u64,
    /// Expected store revision.
    pub store_revision: i64,
}

/// Editor state for one project.
#[derive(Debug)]
pub struct EditorSession {
    project_id: ProjectId,
    owner_id: UserId,
    name: String,
    slug: String,
    template_id: String,
    current: TemplateData,
    local_revision: u64,
    flushed_revision: u64,
    saved: TemplateData,
    store_revision: i64,
    history: History,
    sync: SyncStatus,
    last_saved_at: Option<DateTime<Utc>>,
}

impl EditorSession {
    /// Opens a session on the project's stored document.
    #[must_use]
    pub fn new(project: &Project, history_limit: usize) -> Self {
        let data = project.template();
        Self {
            project_id: project.id,
            owner_id: project.owner_id,
            name: project.name.clone(),
            slug: project.slug.clone(),
            template_id: project.template_id.clone(),
            current: data.clone(),
            local_revision: 0,
            flushed_revision: 0,
            saved: data,
            store_revision: project.revision,
            history: History::new(history_limit),
            sync: SyncStatus::Saved,
            last_saved_at: None,
        }
    }

    /// Project id.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Owner id.
    #[must_use]
    pub const fn owner_id(&self) -> UserId {
        self.owner_id
    }

    /// Refreshes metadata after a project update outside the editor.
    pub fn refresh_meta(&mut self, project: &Project) {
        self.name.clone_from(&project.name);
        self.slug.clone_from(&project.slug);
        self.template_id.clone_from(&project.template_id);
    }

    /// Visible document.
    #[must_use]
    pub const fn current(&self) -> &TemplateData {
        &self.current
    }

    /// Last stored document.
    #[must_use]
    pub const fn saved(&self) -> &TemplateData {
        &self.saved
    }

    /// Whether edits have not reached the store yet.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.local_revision != self.flushed_revision
    }

    /// Sync state.
    #[must_use]
    pub const fn sync(&self) -> &SyncStatus {
        &self.sync
    }

    /// The single entry point for edits: deep-merges `partial` into the
    /// visible document and records it for undo.
    ///
    /// Returns `false` when the update changed nothing.
    ///
    /// # Errors
    ///
    /// [`AppError::InvalidRequest`] when the merged document does not
    /// match the schema; the session is left untouched.
    pub fn apply(&mut self, partial: &Value) -> Result<bool, AppError> {
        let next = self.current.with_patch(partial)?;
        if next == self.current {
            return Ok(false);
        }
        let before = std::mem::replace(&mut self.current, next);
        self.history.record(HistoryEntry {
            patch: partial.clone(),
            before,
            after: self.current.clone(),
            at: Utc::now(),
        });
        self.touch();
        Ok(true)
    }

    /// Steps back one change. Returns `false` when there is nothing to
    /// undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(doc) => {
                self.current = doc;
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Re-applies an undone change. Returns `false` when there is nothing
    /// to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(doc) => {
                self.current = doc;
                self.touch();
                true
            }
            None => false,
        }
    }

    fn touch(&mut self) {
        self.local_revision += 1;
        if !matches!(self.sync, SyncStatus::Conflict { .. }) {
            self.sync = SyncStatus::Pending;
        }
    }

    /// Captures what a write should send and marks the session as saving.
    /// `None` when nothing is dirty.
    pub fn begin_write(&mut self) -> Option<PendingWrite> {
        if !self.is_dirty() {
            return None;
        }
        self.sync = SyncStatus::Saving;
        Some(self.pending_write())
    }

    /// The current document as a write, dirty or not.
    #[must_use]
    pub fn pending_write(&self) -> PendingWrite {
        PendingWrite {
            data: self.current.clone(),
            local_revision: self.local_revision,
            store_revision: self.store_revision,
        }
    }

    /// Records a successful write.
    pub fn write_succeeded(&mut self, write: PendingWrite, new_store_revision: i64) {
        self.flushed_revision = write.local_revision;
        self.store_revision = new_store_revision;
        self.saved = write.data;
        self.last_saved_at = Some(Utc::now());
        self.sync = if self.is_dirty() {
            SyncStatus::Pending
        } else {
            SyncStatus::Saved
        };
    }

    /// Records a failed write. Visible state is untouched.
    pub fn write_failed(&mut self, error: &AppError) {
        self.sync = match error {
            AppError::RevisionConflict { .. } => SyncStatus::Conflict {
                error: error.to_string(),
            },
            _ => SyncStatus::Failed {
                error: error.to_string(),
            },
        };
    }

    /// Read-only view.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            project_id: self.project_id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            template_id: self.template_id.clone(),
            template_data: self.current.clone(),
            sync: self.sync.clone(),
            dirty: self.is_dirty(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            local_revision: self.local_revision,
            store_revision: self.store_revision,
            last_saved_at: self.last_saved_at,
            last_patch: self.history.last_change().map(|entry| entry.patch.clone()),
            last_edited_at: self.history.last_change().map(|entry| entry.at),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{Niche, RendererKind};

    fn session() -> EditorSession {
        let project = Project::new(
            UserId::new(),
            "Webinar X".into(),
            "webinar-x".into(),
            Niche::Event,
            RendererKind::Event,
            &TemplateData::default(),
        );
        EditorSession::new(&project, 50)
    }

    #[test]
    fn apply_marks_dirty_and_is_undoable() {
        let mut s = session();
        assert!(!s.is_dirty());
        let Ok(true) = s.apply(&json!({ "headline": "Novo" })) else {
            panic!("apply should change the document");
        };
        assert!(s.is_dirty());
        assert_eq!(s.sync(), &SyncStatus::Pending);
        assert_eq!(s.current().headline, "Novo");

        let snapshot = s.snapshot();
        assert_eq!(snapshot.last_patch, Some(json!({ "headline": "Novo" })));
        assert!(snapshot.last_edited_at.is_some());

        assert!(s.undo());
        assert_eq!(s.current().headline, TemplateData::default().headline);
        assert_eq!(s.snapshot().last_patch, None);
        assert!(s.redo());
        assert_eq!(s.current().headline, "Novo");
    }

    #[test]
    fn no_op_update_is_not_recorded() {
        let mut s = session();
        let headline = s.current().headline.clone();
        let Ok(false) = s.apply(&json!({ "headline": headline })) else {
            panic!("expected no-op");
        };
        assert!(!s.is_dirty());
        assert!(!s.snapshot().can_undo);
    }

    #[test]
    fn failed_write_keeps_visible_state() {
        let mut s = session();
        let Ok(_) = s.apply(&json!({ "headline": "Keep me" })) else {
            panic!("apply failed");
        };
        let Some(_write) = s.begin_write() else {
            panic!("session should be dirty");
        };
        s.write_failed(&AppError::PersistenceError("db down".into()));
        assert_eq!(s.current().headline, "Keep me");
        assert!(s.is_dirty());
        assert!(matches!(s.sync(), SyncStatus::Failed { .. }));
    }

    #[test]
    fn edits_during_write_stay_dirty() {
        let mut s = session();
        let Ok(_) = s.apply(&json!({ "headline": "one" })) else {
            panic!("apply failed");
        };
        let Some(write) = s.begin_write() else {
            panic!("session should be dirty");
        };
        let Ok(_) = s.apply(&json!({ "headline": "two" })) else {
            panic!("apply failed");
        };
        s.write_succeeded(write, 1);
        assert!(s.is_dirty());
        assert_eq!(s.saved().headline, "one");
        assert_eq!(s.sync(), &SyncStatus::Pending);
    }

    #[test]
    fn rejected_update_leaves_session_untouched() {
        let mut s = session();
        assert!(s.apply(&json!({ "faqs": "nope" })).is_err());
        assert!(!s.is_dirty());
    }
}
