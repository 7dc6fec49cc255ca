//! Debounced background writer for an editor session.
//!
//! Each open session owns one autosave task. Edits bump a
//! [`tokio::sync::watch`] counter; the task waits until the counter has
//! been quiet for the debounce window, then writes the latest snapshot.
//! Failed writes are retried with exponential backoff. A revision
//! conflict or a permanent error stops retrying until the next edit.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::session::EditorSession;
use crate::config::AppConfig;
use crate::domain::{EventBus, ProjectEvent, ProjectId, SaveTrigger};
use crate::error::AppError;
use crate::persistence::ProjectStore;

/// Timing of the autosave task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosavePolicy {
    /// Quiet period after the last edit.
    pub debounce: Duration,
    /// Write attempts per flush.
    pub max_attempts: u32,
    /// First retry delay.
    pub backoff_base: Duration,
    /// Retry delay cap.
    pub backoff_max: Duration,
}

impl AutosavePolicy {
    /// Policy from `AUTOSAVE_*` settings.
    #[must_use]
    pub const fn from_config(config: &AppConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.autosave_debounce_ms),
            max_attempts: config.autosave_max_retries,
            backoff_base: Duration::from_millis(config.autosave_backoff_base_ms),
            backoff_max: Duration::from_millis(config.autosave_backoff_max_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based): base, 2×base,
    /// 4×base, ... capped at `backoff_max`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base
            .checked_mul(factor)
            .map_or(self.backoff_max, |d| d.min(self.backoff_max))
    }
}

/// Writes a session's document to the store.
///
/// Cloned into the autosave task and used directly by "save now",
/// publish and close. A shared lock serializes writes so two flushes
/// never race on the same expected revision.
#[derive(Debug, Clone)]
pub struct Flusher {
    project_id: ProjectId,
    session: Arc<Mutex<EditorSession>>,
    store: Arc<dyn ProjectStore>,
    events: EventBus,
    write_lock: Arc<Mutex<()>>,
}

impl Flusher {
    /// Creates a flusher for `session`.
    #[must_use]
    pub fn new(
        session: Arc<Mutex<EditorSession>>,
        project_id: ProjectId,
        store: Arc<dyn ProjectStore>,
        events: EventBus,
    ) -> Self {
        Self {
            project_id,
            session,
            store,
            events,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Writes pending edits, if any. Returns the new store revision when a
    /// write happened.
    ///
    /// # Errors
    ///
    /// Propagates the store error after recording it on the session.
    pub async fn flush(&self, trigger: SaveTrigger) -> Result<Option<i64>, AppError> {
        let _guard = self.write_lock.lock().await;
        let Some(write) = self.session.lock().await.begin_write() else {
            return Ok(None);
        };

        let result = self
            .store
            .save_template_data(
                self.project_id,
                &write.data.to_value(),
                write.store_revision,
            )
            .await;

        let mut session = self.session.lock().await;
        match result {
            Ok(revision) => {
                session.write_succeeded(write, revision);
                drop(session);
                tracing::debug!(project_id = %self.project_id, revision, ?trigger, "template saved");
                self.events.publish(ProjectEvent::TemplateSaved {
                    project_id: self.project_id,
                    revision,
                    trigger,
                    timestamp: Utc::now(),
                });
                Ok(Some(revision))
            }
            Err(err) => {
                session.write_failed(&err);
                Err(err)
            }
        }
    }
}

/// Spawns the autosave task. It ends when every sender of `changes` is
/// dropped.
#[must_use]
pub fn spawn(
    flusher: Flusher,
    mut changes: watch::Receiver<u64>,
    policy: AutosavePolicy,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            if !wait_quiet(&mut changes, policy.debounce).await {
                return;
            }
            flush_with_retry(&flusher, &policy).await;
        }
    })
}

/// Waits until no change arrives for `window`. Returns `false` when the
/// channel closed.
async fn wait_quiet(changes: &mut watch::Receiver<u64>, window: Duration) -> bool {
    loop {
        match tokio::time::timeout(window, changes.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return false,
            Err(_) => return true,
        }
    }
}

async fn flush_with_retry(flusher: &Flusher, policy: &AutosavePolicy) {
    let project_id = flusher.project_id;
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match flusher.flush(SaveTrigger::Autosave).await {
            Ok(_) => return,
            Err(err @ AppError::RevisionConflict { .. }) => {
                tracing::warn!(%project_id, error = %err, "autosave stopped on conflict");
                return;
            }
            Err(err) if err.is_permanent() => {
                tracing::warn!(%project_id, error = %err, "autosave failed permanently");
                return;
            }
            Err(err) if attempt >= policy.max_attempts => {
                tracing::warn!(%project_id, attempt, error = %err, "autosave giving up until next edit");
                return;
            }
            Err(err) => {
                let delay = policy.backoff_delay(attempt);
                tracing::warn!(%project_id, attempt, ?delay, error = %err, "autosave failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{Niche, Project, RendererKind, TemplateData, UserId};
    use crate::editor::SyncStatus;
    use crate::persistence::memory::MemoryStore;

    fn policy() -> AutosavePolicy {
        AutosavePolicy::from_config(&AppConfig::default())
    }

    async fn setup() -> (Arc<MemoryStore>, Flusher, Arc<Mutex<EditorSession>>, ProjectId) {
        let store = Arc::new(MemoryStore::new());
        let project = Project::new(
            UserId::new(),
            "Autosave".into(),
            "autosave".into(),
            Niche::Product,
            RendererKind::Product,
            &TemplateData::default(),
        );
        let Ok(()) = store.insert_project(&project).await else {
            panic!("insert failed");
        };
        let session = Arc::new(Mutex::new(EditorSession::new(&project, 50)));
        let dyn_store: Arc<dyn ProjectStore> = Arc::clone(&store) as Arc<dyn ProjectStore>;
        let flusher = Flusher::new(Arc::clone(&session), project.id, dyn_store, EventBus::new(16));
        (store, flusher, session, project.id)
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = policy();
        assert_eq!(p.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(p.backoff_delay(2), Duration::from_millis(1_000));
        assert_eq!(p.backoff_delay(3), Duration::from_millis(2_000));
        assert_eq!(p.backoff_delay(10), Duration::from_secs(30));
        assert_eq!(p.backoff_delay(40), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn edits_are_written_after_quiet_period() {
        let (store, flusher, session, id) = setup().await;
        let (tx, rx) = watch::channel(0u64);
        let task = spawn(flusher, rx, policy());

        for headline in ["a", "ab", "abc"] {
            let Ok(_) = session.lock().await.apply(&json!({ "headline": headline })) else {
                panic!("apply failed");
            };
            tx.send_modify(|n| *n += 1);
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        let Ok(before) = store.get_project(id).await else {
            panic!("project missing");
        };
        assert_eq!(before.revision, 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let Ok(after) = store.get_project(id).await else {
            panic!("project missing");
        };
        assert_eq!(after.revision, 1);
        assert_eq!(after.template().headline, "abc");
        assert_eq!(session.lock().await.sync(), &SyncStatus::Saved);

        drop(tx);
        let _ = task.await;
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let (store, flusher, session, id) = setup().await;
        store.fail_next_template_writes(2);
        let (tx, rx) = watch::channel(0u64);
        let task = spawn(flusher, rx, policy());

        let Ok(_) = session.lock().await.apply(&json!({ "headline": "retry me" })) else {
            panic!("apply failed");
        };
        tx.send_modify(|n| *n += 1);

        tokio::time::sleep(Duration::from_millis(1_600)).await;
        assert!(matches!(
            session.lock().await.sync(),
            SyncStatus::Failed { .. }
        ));
        assert_eq!(session.lock().await.current().headline, "retry me");

        tokio::time::sleep(Duration::from_secs(5)).await;
        let Ok(project) = store.get_project(id).await else {
            panic!("project missing");
        };
        assert_eq!(project.template().headline, "retry me");
        assert!(!session.lock().await.is_dirty());

        drop(tx);
        let _ = task.await;
    }

    #[tokio::test(start_paused = true)]
    async fn conflict_stops_retrying() {
        let (store, flusher, session, id) = setup().await;
        // Someone else writes first.
        let Ok(_) = store.save_template_data(id, &json!({ "headline": "theirs" }), 0).await else {
            panic!("external write failed");
        };
        let (tx, rx) = watch::channel(0u64);
        let task = spawn(flusher, rx, policy());

        let Ok(_) = session.lock().await.apply(&json!({ "headline": "mine" })) else {
            panic!("apply failed");
        };
        tx.send_modify(|n| *n += 1);
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(matches!(
            session.lock().await.sync(),
            SyncStatus::Conflict { .. }
        ));
        let Ok(project) = store.get_project(id).await else {
            panic!("project missing");
        };
        assert_eq!(project.revision, 1);
        assert_eq!(project.template().headline, "theirs");

        drop(tx);
        let _ = task.await;
    }
}
