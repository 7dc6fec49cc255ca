//! In-memory [`ProjectStore`].
//!
//! All tables sit behind one [`tokio::sync::RwLock`]. Good enough for
//! local runs and tests; nothing survives a restart.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{LeadFilter, ProjectStore};
use crate::domain::{
    Lead, LeadId, LeadStatus, Project, ProjectEvent, ProjectId, ProjectVersion, Subscription,
    UserId,
};
use crate::error::AppError;

/// Most recent events kept in memory; older ones are dropped.
pub const RECENT_EVENTS_CAP: usize = 256;

#[derive(Debug, Default)]
struct Tables {
    projects: HashMap<ProjectId, Project>,
    leads: Vec<Lead>,
    versions: HashMap<ProjectId, Vec<ProjectVersion>>,
    subscriptions: HashMap<UserId, Subscription>,
    events: VecDeque<ProjectEvent>,
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    #[cfg(test)]
    fail_template_writes: std::sync::atomic::AtomicU32,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscription for `subscription.user_id`.
    pub async fn put_subscription(&self, subscription: Subscription) {
        self.tables
            .write()
            .await
            .subscriptions
            .insert(subscription.user_id, subscription);
    }

    /// The most recent events (at most [`RECENT_EVENTS_CAP`]), oldest first.
    pub async fn events(&self) -> Vec<ProjectEvent> {
        self.tables.read().await.events.iter().cloned().collect()
    }

    /// Makes the next `count` template writes fail with a persistence
    /// error.
    #[cfg(test)]
    pub fn fail_next_template_writes(&self, count: u32) {
        self.fail_template_writes
            .store(count, std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(test)]
    fn injected_failure(&self) -> Option<AppError> {
        use std::sync::atomic::Ordering;
        self.fail_template_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()
            .map(|_| AppError::PersistenceError("injected write failure".to_string()))
    }

    #[cfg(not(test))]
    #[allow(clippy::unused_self)]
    fn injected_failure(&self) -> Option<AppError> {
        None
    }
}

fn slug_in_use(tables: &Tables, slug: &str, exclude: Option<ProjectId>) -> bool {
    tables
        .projects
        .values()
        .any(|p| p.is_live() && p.slug == slug && Some(p.id) != exclude)
}

fn live_mut(tables: &mut Tables, id: ProjectId) -> Result<&mut Project, AppError> {
    tables
        .projects
        .get_mut(&id)
        .filter(|p| p.is_live())
        .ok_or(AppError::ProjectNotFound(*id.as_uuid()))
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn insert_project(&self, project: &Project) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if slug_in_use(&tables, &project.slug, None) {
            return Err(AppError::SlugTaken(project.slug.clone()));
        }
        tables.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn get_project(&self, id: ProjectId) -> Result<Project, AppError> {
        let tables = self.tables.read().await;
        tables
            .projects
            .get(&id)
            .filter(|p| p.is_live())
            .cloned()
            .ok_or(AppError::ProjectNotFound(*id.as_uuid()))
    }

    async fn find_project_by_slug(&self, slug: &str) -> Result<Option<Project>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .values()
            .find(|p| p.is_live() && p.slug == slug)
            .cloned())
    }

    async fn list_projects(&self, owner_id: UserId) -> Result<Vec<Project>, AppError> {
        let tables = self.tables.read().await;
        let mut projects: Vec<Project> = tables
            .projects
            .values()
            .filter(|p| p.is_live() && p.owner_id == owner_id)
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn count_projects(&self, owner_id: UserId) -> Result<u64, AppError> {
        let tables = self.tables.read().await;
        let count = tables
            .projects
            .values()
            .filter(|p| p.is_live() && p.owner_id == owner_id)
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn update_project_meta(&self, project: &Project) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if slug_in_use(&tables, &project.slug, Some(project.id)) {
            return Err(AppError::SlugTaken(project.slug.clone()));
        }
        let stored = live_mut(&mut tables, project.id)?;
        stored.name.clone_from(&project.name);
        stored.slug.clone_from(&project.slug);
        stored.template_id.clone_from(&project.template_id);
        stored.status = project.status;
        stored.custom_domain.clone_from(&project.custom_domain);
        stored.published_at = project.published_at;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn save_template_data(
        &self,
        id: ProjectId,
        template_data: &Value,
        expected_revision: i64,
    ) -> Result<i64, AppError> {
        if let Some(err) = self.injected_failure() {
            return Err(err);
        }
        let mut tables = self.tables.write().await;
        let stored = live_mut(&mut tables, id)?;
        if stored.revision != expected_revision {
            return Err(AppError::RevisionConflict {
                expected: expected_revision,
                actual: stored.revision,
            });
        }
        stored.template_data = template_data.clone();
        stored.revision += 1;
        stored.updated_at = Utc::now();
        Ok(stored.revision)
    }

    async fn soft_delete_project(&self, id: ProjectId) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let stored = live_mut(&mut tables, id)?;
        stored.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn slug_exists(&self, slug: &str, exclude: Option<ProjectId>) -> Result<bool, AppError> {
        let tables = self.tables.read().await;
        Ok(slug_in_use(&tables, slug, exclude))
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<(), AppError> {
        self.tables.write().await.leads.push(lead.clone());
        Ok(())
    }

    async fn get_lead(&self, id: LeadId) -> Result<Lead, AppError> {
        let tables = self.tables.read().await;
        tables
            .leads
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or(AppError::LeadNotFound(*id.as_uuid()))
    }

    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError> {
        let tables = self.tables.read().await;
        let mut leads: Vec<Lead> = tables
            .leads
            .iter()
            .filter(|l| l.user_id == filter.owner_id)
            .filter(|l| filter.project_id.is_none_or(|p| l.project_id == p))
            .filter(|l| filter.status.is_none_or(|s| l.status() == s))
            .cloned()
            .collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }

    async fn update_lead_status(&self, id: LeadId, status: LeadStatus) -> Result<Lead, AppError> {
        let mut tables = self.tables.write().await;
        let lead = tables
            .leads
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(AppError::LeadNotFound(*id.as_uuid()))?;
        lead.set_status(status);
        Ok(lead.clone())
    }

    async fn insert_version(
        &self,
        project_id: ProjectId,
        template_data: &Value,
        label: Option<String>,
    ) -> Result<ProjectVersion, AppError> {
        let mut tables = self.tables.write().await;
        let versions = tables.versions.entry(project_id).or_default();
        let mut version = ProjectVersion::new(project_id, template_data.clone(), label);
        version.version_number = versions
            .last()
            .map_or(1, |last| last.version_number.saturating_add(1));
        versions.push(version.clone());
        Ok(version)
    }

    async fn list_versions(&self, project_id: ProjectId) -> Result<Vec<ProjectVersion>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .versions
            .get(&project_id)
            .map(|v| v.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_version(
        &self,
        project_id: ProjectId,
        version_number: i32,
    ) -> Result<ProjectVersion, AppError> {
        let tables = self.tables.read().await;
        tables
            .versions
            .get(&project_id)
            .and_then(|v| v.iter().find(|v| v.version_number == version_number))
            .cloned()
            .ok_or(AppError::VersionNotFound {
                project_id: *project_id.as_uuid(),
                version: version_number,
            })
    }

    async fn get_subscription(&self, user_id: UserId) -> Result<Option<Subscription>, AppError> {
        Ok(self.tables.read().await.subscriptions.get(&user_id).cloned())
    }

    async fn save_event(&self, event: &ProjectEvent) -> Result<(), AppError> {
        tracing::info!(
            project_id = %event.project_id(),
            event_type = event.event_type_str(),
            "project event"
        );
        let mut tables = self.tables.write().await;
        if tables.events.len() >= RECENT_EVENTS_CAP {
            tables.events.pop_front();
        }
        tables.events.push_back(event.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::{Map, json};

    use super::*;
    use crate::domain::{Niche, RendererKind, TemplateData};

    fn project(owner: UserId, slug: &str) -> Project {
        Project::new(
            owner,
            slug.to_string(),
            slug.to_string(),
            Niche::Product,
            RendererKind::Product,
            &TemplateData::default(),
        )
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected_until_deleted() {
        let store = MemoryStore::new();
        let owner = UserId::new();
        let first = project(owner, "promo");
        let Ok(()) = store.insert_project(&first).await else {
            panic!("insert failed");
        };
        assert!(matches!(
            store.insert_project(&project(owner, "promo")).await,
            Err(AppError::SlugTaken(_))
        ));

        let Ok(()) = store.soft_delete_project(first.id).await else {
            panic!("delete failed");
        };
        assert!(store.insert_project(&project(owner, "promo")).await.is_ok());
        assert!(matches!(
            store.get_project(first.id).await,
            Err(AppError::ProjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn stale_revision_conflicts() {
        let store = MemoryStore::new();
        let p = project(UserId::new(), "rev");
        let Ok(()) = store.insert_project(&p).await else {
            panic!("insert failed");
        };
        let Ok(rev) = store.save_template_data(p.id, &json!({"headline": "a"}), 0).await else {
            panic!("first write failed");
        };
        assert_eq!(rev, 1);
        let Err(AppError::RevisionConflict { expected, actual }) =
            store.save_template_data(p.id, &json!({}), 0).await
        else {
            panic!("expected conflict");
        };
        assert_eq!((expected, actual), (0, 1));
    }

    #[tokio::test]
    async fn versions_number_sequentially() {
        let store = MemoryStore::new();
        let id = ProjectId::new();
        for _ in 0..3 {
            let Ok(_) = store.insert_version(id, &json!({}), None).await else {
                panic!("insert version failed");
            };
        }
        let Ok(versions) = store.list_versions(id).await else {
            panic!("list failed");
        };
        let numbers: Vec<i32> = versions.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, vec![3, 2, 1]);
        assert!(store.get_version(id, 4).await.is_err());
    }

    #[tokio::test]
    async fn lead_status_filter_treats_absent_as_new() {
        let store = MemoryStore::new();
        let owner = UserId::new();
        let project_id = ProjectId::new();
        let fresh = Lead::new(project_id, owner, Map::new(), String::new());
        let mut handled = Lead::new(project_id, owner, Map::new(), String::new());
        handled.set_status(LeadStatus::Contacted);
        for lead in [&fresh, &handled] {
            let Ok(()) = store.insert_lead(lead).await else {
                panic!("insert lead failed");
            };
        }

        let filter = LeadFilter {
            owner_id: owner,
            project_id: Some(project_id),
            status: Some(LeadStatus::New),
        };
        let Ok(leads) = store.list_leads(&filter).await else {
            panic!("list failed");
        };
        assert_eq!(leads.len(), 1);
        assert_eq!(leads.first().map(|l| l.id), Some(fresh.id));

        let other_owner = LeadFilter {
            owner_id: UserId::new(),
            project_id: None,
            status: None,
        };
        let Ok(none) = store.list_leads(&other_owner).await else {
            panic!("list failed");
        };
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn event_log_keeps_only_recent_events() {
        let store = MemoryStore::new();
        let first = ProjectId::new();
        let last = ProjectId::new();
        for n in 0..RECENT_EVENTS_CAP + 10 {
            let project_id = match n {
                0 => first,
                n if n == RECENT_EVENTS_CAP + 9 => last,
                _ => ProjectId::new(),
            };
            let event = ProjectEvent::ProjectPaused {
                project_id,
                timestamp: Utc::now(),
            };
            let Ok(()) = store.save_event(&event).await else {
                panic!("save event failed");
            };
        }

        let events = store.events().await;
        assert_eq!(events.len(), RECENT_EVENTS_CAP);
        assert!(events.iter().all(|e| e.project_id() != first));
        assert_eq!(events.last().map(ProjectEvent::project_id), Some(last));
    }
}
