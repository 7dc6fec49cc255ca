//! Project service: lifecycle of projects and plan gating.

use std::sync::Arc;

use chrono::Utc;

use super::EditorService;
use crate::domain::project::{MAX_SLUG_LEN, slugify, validate_slug};
use crate::domain::{
    Entitlement, EventBus, Niche, Project, ProjectEvent, ProjectId, ProjectStatus, RendererKind,
    SaveTrigger, TemplateData, UserId,
};
use crate::domain::version::PUBLISH_LABEL;
use crate::error::AppError;
use crate::persistence::ProjectStore;

/// Slug used when a name has no slug-able characters.
const FALLBACK_SLUG: &str = "pagina";

/// Highest numeric suffix tried when deriving a free slug.
const MAX_SLUG_SUFFIX: u32 = 100;

/// Input of [`ProjectService::create`].
#[derive(Debug, Clone)]
pub struct NewProject {
    /// Display name.
    pub name: String,
    /// Niche.
    pub niche: Niche,
    /// Template variant; the niche default when absent or unknown.
    pub template_id: Option<String>,
    /// Explicit slug; derived from the name when absent.
    pub slug: Option<String>,
}

/// Metadata changes. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    /// New name.
    pub name: Option<String>,
    /// New slug; rejected once published.
    pub slug: Option<String>,
    /// New template variant within the niche.
    pub template_id: Option<String>,
    /// New custom domain; `Some(None)` clears it.
    pub custom_domain: Option<Option<String>>,
}

/// Outcome of a slug availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugAvailability {
    /// Checked slug.
    pub slug: String,
    /// Free to use.
    pub available: bool,
    /// Why it is not available.
    pub reason: Option<String>,
}

/// Orchestrates project creation, updates, publishing and deletion.
#[derive(Debug, Clone)]
pub struct ProjectService {
    store: Arc<dyn ProjectStore>,
    editor: Arc<EditorService>,
    event_bus: EventBus,
}

impl ProjectService {
    /// Creates a new `ProjectService`.
    #[must_use]
    pub fn new(store: Arc<dyn ProjectStore>, editor: Arc<EditorService>, event_bus: EventBus) -> Self {
        Self {
            store,
            editor,
            event_bus,
        }
    }

    /// What `user` is entitled to.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn entitlement(&self, user: UserId) -> Result<Entitlement, AppError> {
        let subscription = self.store.get_subscription(user).await?;
        Ok(Entitlement::from_subscription(subscription))
    }

    /// Number of live projects of `user`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn live_count(&self, user: UserId) -> Result<u64, AppError> {
        self.store.count_projects(user).await
    }

    /// Creates a project with niche starter content.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] for a blank name or bad slug,
    /// [`AppError::PlanLimitReached`] / [`AppError::Forbidden`] when the
    /// plan does not allow another project, [`AppError::SlugTaken`] when an
    /// explicit slug is in use.
    pub async fn create(&self, user: UserId, input: NewProject) -> Result<Project, AppError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("name", "name must not be empty"));
        }

        let entitlement = self.entitlement(user).await?;
        if !entitlement.in_good_standing() {
            return Err(AppError::Forbidden("subscription is not active".to_string()));
        }
        let live = self.live_count(user).await?;
        if !entitlement.can_create_project(live) {
            return Err(AppError::PlanLimitReached {
                limit: entitlement.plan.max_projects,
            });
        }

        let slug = match input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(explicit) => {
                validate_slug(explicit)?;
                if self.store.slug_exists(explicit, None).await? {
                    return Err(AppError::SlugTaken(explicit.to_string()));
                }
                explicit.to_string()
            }
            None => self.derive_slug(&name).await?,
        };

        let renderer = RendererKind::resolve(input.niche, input.template_id.as_deref().unwrap_or(""));
        let data = TemplateData::starter(input.niche, &name);
        let project = Project::new(user, name, slug, input.niche, renderer, &data);
        self.store.insert_project(&project).await?;

        self.event_bus.publish(ProjectEvent::ProjectCreated {
            project_id: project.id,
            slug: project.slug.clone(),
            niche: project.niche.to_string(),
            timestamp: Utc::now(),
        });
        tracing::info!(project_id = %project.id, slug = %project.slug, niche = %project.niche, "project created");
        Ok(project)
    }

    /// First free slug among `base`, `base-2`, `base-3`, ...
    async fn derive_slug(&self, name: &str) -> Result<String, AppError> {
        let mut base = slugify(name);
        if base.is_empty() || validate_slug(&base).is_err() {
            base = if base.is_empty() {
                FALLBACK_SLUG.to_string()
            } else {
                format!("{base}-{FALLBACK_SLUG}")
            };
        }
        if !self.store.slug_exists(&base, None).await? {
            return Ok(base);
        }
        for n in 2..=MAX_SLUG_SUFFIX {
            let suffix = format!("-{n}");
            let mut candidate = base.clone();
            candidate.truncate(MAX_SLUG_LEN - suffix.len());
            let candidate = format!("{}{suffix}", candidate.trim_end_matches('-'));
            if !self.store.slug_exists(&candidate, None).await? {
                return Ok(candidate);
            }
        }
        Err(AppError::SlugTaken(base))
    }

    /// Live projects of `user`, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list(&self, user: UserId) -> Result<Vec<Project>, AppError> {
        self.store.list_projects(user).await
    }

    /// One of `user`'s projects.
    ///
    /// # Errors
    ///
    /// [`AppError::ProjectNotFound`] for unknown, deleted or foreign
    /// projects.
    pub async fn get(&self, user: UserId, id: ProjectId) -> Result<Project, AppError> {
        let project = self.store.get_project(id).await?;
        project.ensure_owner(user)?;
        Ok(project)
    }

    /// Changes project metadata.
    ///
    /// # Errors
    ///
    /// [`AppError::SlugLocked`] when changing the slug of a published
    /// project, [`AppError::SlugTaken`], [`AppError::Validation`] and
    /// [`AppError::Forbidden`] for a custom domain the plan lacks.
    pub async fn update(
        &self,
        user: UserId,
        id: ProjectId,
        changes: ProjectChanges,
    ) -> Result<Project, AppError> {
        let mut project = self.get(user, id).await?;

        if let Some(name) = changes.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::validation("name", "name must not be empty"));
            }
            project.name = name.to_string();
        }

        if let Some(slug) = changes.slug
            && slug != project.slug
        {
            if project.is_published() {
                return Err(AppError::SlugLocked(project.slug));
            }
            validate_slug(&slug)?;
            if self.store.slug_exists(&slug, Some(id)).await? {
                return Err(AppError::SlugTaken(slug));
            }
            project.slug = slug;
        }

        if let Some(template_id) = changes.template_id {
            let variant = project
                .niche
                .renderers()
                .iter()
                .find(|r| r.template_id() == template_id)
                .ok_or_else(|| {
                    AppError::validation(
                        "templateId",
                        format!("'{template_id}' is not a {} template", project.niche),
                    )
                })?;
            project.template_id = variant.template_id().to_string();
        }

        if let Some(domain) = changes.custom_domain {
            let domain = domain.map(|d| d.trim().to_lowercase()).filter(|d| !d.is_empty());
            if domain.is_some() && !self.entitlement(user).await?.allows_custom_domain() {
                return Err(AppError::Forbidden(
                    "custom domains are not included in your plan".to_string(),
                ));
            }
            project.custom_domain = domain;
        }

        project.updated_at = Utc::now();
        self.store.update_project_meta(&project).await?;
        self.editor.refresh_meta(&project).await;

        self.event_bus.publish(ProjectEvent::ProjectUpdated {
            project_id: id,
            slug: project.slug.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(project_id = %id, slug = %project.slug, "project updated");
        Ok(project)
    }

    /// Flushes the editor, activates the project, freezes its slug and
    /// records a `publish` version.
    ///
    /// # Errors
    ///
    /// Propagates a failed flush (e.g. [`AppError::RevisionConflict`]);
    /// nothing is published then.
    pub async fn publish(&self, user: UserId, id: ProjectId) -> Result<Project, AppError> {
        self.get(user, id).await?;
        self.editor.flush_if_open(id, SaveTrigger::Publish).await?;

        let mut project = self.get(user, id).await?;
        let now = Utc::now();
        project.status = ProjectStatus::Active;
        if project.published_at.is_none() {
            project.published_at = Some(now);
        }
        project.updated_at = now;
        self.store.update_project_meta(&project).await?;
        self.editor
            .snapshot_version(id, &project.template_data, Some(PUBLISH_LABEL.to_string()))
            .await?;

        self.event_bus.publish(ProjectEvent::ProjectPublished {
            project_id: id,
            slug: project.slug.clone(),
            timestamp: now,
        });
        tracing::info!(project_id = %id, slug = %project.slug, "project published");
        Ok(project)
    }

    /// Stops serving public pages.
    ///
    /// # Errors
    ///
    /// [`AppError::ProjectNotFound`] for unknown or foreign projects.
    pub async fn pause(&self, user: UserId, id: ProjectId) -> Result<Project, AppError> {
        let mut project = self.get(user, id).await?;
        project.status = ProjectStatus::Paused;
        project.updated_at = Utc::now();
        self.store.update_project_meta(&project).await?;

        self.event_bus.publish(ProjectEvent::ProjectPaused {
            project_id: id,
            timestamp: Utc::now(),
        });
        tracing::info!(project_id = %id, "project paused");
        Ok(project)
    }

    /// Soft-deletes a project and drops its editor session.
    ///
    /// # Errors
    ///
    /// [`AppError::ProjectNotFound`] for unknown or foreign projects.
    pub async fn delete(&self, user: UserId, id: ProjectId) -> Result<(), AppError> {
        self.get(user, id).await?;
        self.editor.discard(id).await;
        self.store.soft_delete_project(id).await?;

        self.event_bus.publish(ProjectEvent::ProjectDeleted {
            project_id: id,
            timestamp: Utc::now(),
        });
        tracing::info!(project_id = %id, "project deleted");
        Ok(())
    }

    /// Whether `slug` could be used for a new project.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn slug_available(&self, slug: &str) -> Result<SlugAvailability, AppError> {
        let slug = slug.trim().to_string();
        let reason = match validate_slug(&slug) {
            Err(AppError::Validation { message, .. }) => Some(message),
            Err(other) => return Err(other),
            Ok(()) => self
                .store
                .slug_exists(&slug, None)
                .await?
                .then(|| "slug already taken".to_string()),
        };
        Ok(SlugAvailability {
            available: reason.is_none(),
            slug,
            reason,
        })
    }
}
