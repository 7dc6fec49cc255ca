//! Editor service: the registry of open editor sessions.
//!
//! Each open project gets one [`EditorSession`] behind a
//! [`tokio::sync::Mutex`], a [`Flusher`] and a background autosave task.
//! Every command resolves the session, checks ownership, applies the
//! change through [`EditorSession::apply`] (or undo/redo) and nudges the
//! autosave task.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;

use super::PageService;
use crate::domain::{
    CollectionKind, CollectionOp, EventBus, Project, ProjectEvent, ProjectId, ProjectVersion,
    SaveTrigger, TemplateData, UserId,
};
use crate::editor::autosave;
use crate::editor::{AutosavePolicy, EditorSession, EditorTab, Flusher, SessionSnapshot};
use crate::error::AppError;
use crate::persistence::ProjectStore;
use crate::render::Device;

/// One open session and its autosave machinery.
#[derive(Debug)]
struct EditorHandle {
    session: Arc<Mutex<EditorSession>>,
    flusher: Flusher,
    changes: watch::Sender<u64>,
    task: JoinHandle<()>,
}

impl EditorHandle {
    fn notify(&self) {
        self.changes.send_modify(|n| *n = n.wrapping_add(1));
    }
}

/// Result of a collection command.
#[derive(Debug, Clone)]
pub struct CollectionResult {
    /// Session state after the command.
    pub snapshot: SessionSnapshot,
    /// Id of the added, updated or removed item.
    pub item_id: String,
}

/// Coordinates editor sessions, autosave and version snapshots.
#[derive(Debug)]
pub struct EditorService {
    store: Arc<dyn ProjectStore>,
    pages: Arc<PageService>,
    event_bus: EventBus,
    policy: AutosavePolicy,
    history_limit: usize,
    sessions: RwLock<HashMap<ProjectId, Arc<EditorHandle>>>,
}

impl EditorService {
    /// Creates a new `EditorService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ProjectStore>,
        pages: Arc<PageService>,
        event_bus: EventBus,
        policy: AutosavePolicy,
        history_limit: usize,
    ) -> Self {
        Self {
            store,
            pages,
            event_bus,
            policy,
            history_limit,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn owned_project(&self, user: UserId, id: ProjectId) -> Result<Project, AppError> {
        let project = self.store.get_project(id).await?;
        project.ensure_owner(user)?;
        Ok(project)
    }

    async fn handle(&self, user: UserId, id: ProjectId) -> Result<Arc<EditorHandle>, AppError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(&id)
            .map(Arc::clone)
            .ok_or(AppError::SessionNotFound(*id.as_uuid()))?;
        if handle.session.lock().await.owner_id() != user {
            return Err(AppError::ProjectNotFound(*id.as_uuid()));
        }
        Ok(handle)
    }

    /// Opens (or rejoins) the editor on a project.
    ///
    /// # Errors
    ///
    /// [`AppError::ProjectNotFound`] for unknown or foreign projects.
    pub async fn open(&self, user: UserId, id: ProjectId) -> Result<SessionSnapshot, AppError> {
        let project = self.owned_project(user, id).await?;
        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(&id) {
            let mut session = handle.session.lock().await;
            session.refresh_meta(&project);
            return Ok(session.snapshot());
        }

        let session = Arc::new(Mutex::new(EditorSession::new(&project, self.history_limit)));
        let flusher = Flusher::new(
            Arc::clone(&session),
            id,
            Arc::clone(&self.store),
            self.event_bus.clone(),
        );
        let (changes, rx) = watch::channel(0u64);
        let task = autosave::spawn(flusher.clone(), rx, self.policy);
        let snapshot = session.lock().await.snapshot();
        sessions.insert(
            id,
            Arc::new(EditorHandle {
                session,
                flusher,
                changes,
                task,
            }),
        );
        drop(sessions);

        tracing::info!(project_id = %id, revision = project.revision, "editor session opened");
        Ok(snapshot)
    }

    /// Current state of an open session.
    ///
    /// # Errors
    ///
    /// [`AppError::SessionNotFound`] when no session is open.
    pub async fn snapshot(&self, user: UserId, id: ProjectId) -> Result<SessionSnapshot, AppError> {
        let handle = self.handle(user, id).await?;
        let snapshot = handle.session.lock().await.snapshot();
        Ok(snapshot)
    }

    /// Closes a session, flushing pending edits first.
    ///
    /// The session is removed even when the final write fails; the
    /// returned snapshot then reports the failure.
    ///
    /// # Errors
    ///
    /// [`AppError::SessionNotFound`] when no session is open.
    pub async fn close(&self, user: UserId, id: ProjectId) -> Result<SessionSnapshot, AppError> {
        let handle = self.handle(user, id).await?;
        self.sessions.write().await.remove(&id);
        if let Err(err) = handle.flusher.flush(SaveTrigger::Close).await {
            tracing::warn!(project_id = %id, error = %err, "final flush on close failed");
        }
        handle.task.abort();
        let snapshot = handle.session.lock().await.snapshot();
        tracing::info!(project_id = %id, dirty = snapshot.dirty, "editor session closed");
        Ok(snapshot)
    }

    /// Drops a session without writing (the project is gone).
    pub async fn discard(&self, id: ProjectId) {
        if let Some(handle) = self.sessions.write().await.remove(&id) {
            handle.task.abort();
            tracing::debug!(project_id = %id, "editor session discarded");
        }
    }

    /// Refreshes the cached project name and slug of an open session.
    pub async fn refresh_meta(&self, project: &Project) {
        let handle = self.sessions.read().await.get(&project.id).map(Arc::clone);
        if let Some(handle) = handle {
            handle.session.lock().await.refresh_meta(project);
        }
    }

    /// Writes pending edits of an open session now. No-op without a
    /// session.
    ///
    /// # Errors
    ///
    /// Propagates the store error of the write.
    pub async fn flush_if_open(&self, id: ProjectId, trigger: SaveTrigger) -> Result<(), AppError> {
        let handle = self.sessions.read().await.get(&id).map(Arc::clone);
        if let Some(handle) = handle {
            handle.flusher.flush(trigger).await?;
        }
        Ok(())
    }

    async fn apply(
        &self,
        handle: &EditorHandle,
        partial: &Value,
    ) -> Result<SessionSnapshot, AppError> {
        let mut session = handle.session.lock().await;
        if session.apply(partial)? {
            handle.notify();
        }
        Ok(session.snapshot())
    }

    /// Applies a partial update from one editor tab.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] when the update leaves the tab's slice or
    /// fails its rules; [`AppError::SessionNotFound`] without a session.
    pub async fn update_tab(
        &self,
        user: UserId,
        id: ProjectId,
        tab: EditorTab,
        partial: &Value,
    ) -> Result<SessionSnapshot, AppError> {
        let handle = self.handle(user, id).await?;
        let mut session = handle.session.lock().await;
        tab.check(partial, session.current())?;
        if session.apply(partial)? {
            handle.notify();
        }
        tracing::debug!(project_id = %id, %tab, "tab updated");
        Ok(session.snapshot())
    }

    /// Adds, updates or removes a collection item.
    ///
    /// # Errors
    ///
    /// [`AppError::ItemNotFound`] for unknown item ids;
    /// [`AppError::InvalidRequest`] for malformed items.
    pub async fn collection(
        &self,
        user: UserId,
        id: ProjectId,
        kind: CollectionKind,
        op: CollectionOp,
    ) -> Result<CollectionResult, AppError> {
        let handle = self.handle(user, id).await?;
        let mut session = handle.session.lock().await;
        let change = session.current().collection_change(kind, &op)?;
        if session.apply(&change.partial)? {
            handle.notify();
        }
        tracing::debug!(project_id = %id, collection = %kind, item_id = %change.item_id, "collection changed");
        Ok(CollectionResult {
            snapshot: session.snapshot(),
            item_id: change.item_id,
        })
    }

    /// Steps back one change.
    ///
    /// # Errors
    ///
    /// [`AppError::SessionNotFound`] when no session is open.
    pub async fn undo(&self, user: UserId, id: ProjectId) -> Result<SessionSnapshot, AppError> {
        let handle = self.handle(user, id).await?;
        let mut session = handle.session.lock().await;
        if session.undo() {
            handle.notify();
        }
        Ok(session.snapshot())
    }

    /// Re-applies an undone change.
    ///
    /// # Errors
    ///
    /// [`AppError::SessionNotFound`] when no session is open.
    pub async fn redo(&self, user: UserId, id: ProjectId) -> Result<SessionSnapshot, AppError> {
        let handle = self.handle(user, id).await?;
        let mut session = handle.session.lock().await;
        if session.redo() {
            handle.notify();
        }
        Ok(session.snapshot())
    }

    /// Flushes immediately and records a version of the saved document.
    ///
    /// # Errors
    ///
    /// Propagates the write error; no version is created then.
    pub async fn save_now(
        &self,
        user: UserId,
        id: ProjectId,
        label: Option<String>,
    ) -> Result<(SessionSnapshot, ProjectVersion), AppError> {
        let handle = self.handle(user, id).await?;
        handle.flusher.flush(SaveTrigger::Manual).await?;
        let saved = handle.session.lock().await.saved().to_value();
        let version = self.snapshot_version(id, &saved, label).await?;
        let snapshot = handle.session.lock().await.snapshot();
        Ok((snapshot, version))
    }

    /// Appends a version and announces it.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn snapshot_version(
        &self,
        id: ProjectId,
        template_data: &Value,
        label: Option<String>,
    ) -> Result<ProjectVersion, AppError> {
        let version = self.store.insert_version(id, template_data, label).await?;
        self.event_bus.publish(ProjectEvent::VersionCreated {
            project_id: id,
            version_number: version.version_number,
            label: version.label.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(project_id = %id, version = version.version_number, "version created");
        Ok(version)
    }

    /// Versions of a project, newest first.
    ///
    /// # Errors
    ///
    /// [`AppError::ProjectNotFound`] for unknown or foreign projects.
    pub async fn versions(
        &self,
        user: UserId,
        id: ProjectId,
    ) -> Result<Vec<ProjectVersion>, AppError> {
        self.owned_project(user, id).await?;
        self.store.list_versions(id).await
    }

    /// Loads a version into the editor as one undoable change, opening
    /// the session if needed.
    ///
    /// # Errors
    ///
    /// [`AppError::VersionNotFound`] for unknown version numbers.
    pub async fn restore(
        &self,
        user: UserId,
        id: ProjectId,
        version_number: i32,
    ) -> Result<SessionSnapshot, AppError> {
        self.owned_project(user, id).await?;
        let version = self.store.get_version(id, version_number).await?;
        self.open(user, id).await?;
        let handle = self.handle(user, id).await?;
        let document = TemplateData::from_stored(&version.template_data).to_value();
        let snapshot = self.apply(&handle, &document).await?;
        tracing::info!(project_id = %id, version = version_number, "version restored");
        Ok(snapshot)
    }

    /// Renders the session's visible document, or the stored one when no
    /// session is open.
    ///
    /// # Errors
    ///
    /// [`AppError::ProjectNotFound`] for unknown or foreign projects.
    pub async fn preview(
        &self,
        user: UserId,
        id: ProjectId,
        device: Device,
    ) -> Result<String, AppError> {
        let project = self.owned_project(user, id).await?;
        let open = self.sessions.read().await.get(&id).map(Arc::clone);
        let data = match open {
            Some(handle) => handle.session.lock().await.current().clone(),
            None => project.template(),
        };
        self.pages.preview(&project, &data, device).await
    }

    /// Number of open sessions.
    pub async fn open_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}
