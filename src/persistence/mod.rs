//! Persistence layer: the [`ProjectStore`] abstraction and its backends.
//!
//! Two implementations exist: [`memory::MemoryStore`] (default, used by
//! tests and local runs) and [`postgres::PostgresStore`] (enabled with
//! `PERSISTENCE_ENABLED=true`). Services only see `Arc<dyn ProjectStore>`.
//! [`media::MediaStorage`] stores uploaded images on the local disk.

pub mod media;
pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{
    Lead, LeadId, LeadStatus, Project, ProjectEvent, ProjectId, ProjectVersion, Subscription,
    UserId,
};
use crate::error::AppError;

/// Lead list filter. Leads are always scoped to one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadFilter {
    /// Owner of the projects.
    pub owner_id: UserId,
    /// Restrict to one project.
    pub project_id: Option<ProjectId>,
    /// Restrict to one status (absent status counts as `new`).
    pub status: Option<LeadStatus>,
}

/// Durable storage for projects, leads, versions and subscriptions.
///
/// Every method that looks up a project ignores soft-deleted rows.
#[async_trait]
pub trait ProjectStore: Send + Sync + std::fmt::Debug {
    /// Inserts a new project.
    ///
    /// # Errors
    ///
    /// [`AppError::SlugTaken`] when a live project already uses the slug.
    async fn insert_project(&self, project: &Project) -> Result<(), AppError>;

    /// Loads a live project.
    ///
    /// # Errors
    ///
    /// [`AppError::ProjectNotFound`] when absent or deleted.
    async fn get_project(&self, id: ProjectId) -> Result<Project, AppError>;

    /// Exact slug lookup among live projects.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    async fn find_project_by_slug(&self, slug: &str) -> Result<Option<Project>, AppError>;

    /// Live projects of an owner, newest first.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    async fn list_projects(&self, owner_id: UserId) -> Result<Vec<Project>, AppError>;

    /// Number of live projects of an owner.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    async fn count_projects(&self, owner_id: UserId) -> Result<u64, AppError>;

    /// Writes project metadata (name, slug, template, status, domain,
    /// publish time). Template data and revision are left untouched.
    ///
    /// # Errors
    ///
    /// [`AppError::ProjectNotFound`] or [`AppError::SlugTaken`].
    async fn update_project_meta(&self, project: &Project) -> Result<(), AppError>;

    /// Writes template data if the stored revision still equals
    /// `expected_revision`, returning the new revision.
    ///
    /// # Errors
    ///
    /// [`AppError::RevisionConflict`] on a stale revision,
    /// [`AppError::ProjectNotFound`] when absent or deleted.
    async fn save_template_data(
        &self,
        id: ProjectId,
        template_data: &Value,
        expected_revision: i64,
    ) -> Result<i64, AppError>;

    /// Marks a project deleted.
    ///
    /// # Errors
    ///
    /// [`AppError::ProjectNotFound`] when absent or already deleted.
    async fn soft_delete_project(&self, id: ProjectId) -> Result<(), AppError>;

    /// Whether a live project other than `exclude` uses `slug`.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    async fn slug_exists(&self, slug: &str, exclude: Option<ProjectId>) -> Result<bool, AppError>;

    /// Stores a captured lead.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    async fn insert_lead(&self, lead: &Lead) -> Result<(), AppError>;

    /// Loads a lead.
    ///
    /// # Errors
    ///
    /// [`AppError::LeadNotFound`] when absent.
    async fn get_lead(&self, id: LeadId) -> Result<Lead, AppError>;

    /// Leads matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError>;

    /// Sets a lead's status, returning the updated lead.
    ///
    /// # Errors
    ///
    /// [`AppError::LeadNotFound`] when absent.
    async fn update_lead_status(&self, id: LeadId, status: LeadStatus) -> Result<Lead, AppError>;

    /// Appends a version snapshot with the next version number.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    async fn insert_version(
        &self,
        project_id: ProjectId,
        template_data: &Value,
        label: Option<String>,
    ) -> Result<ProjectVersion, AppError>;

    /// Versions of a project, newest first.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    async fn list_versions(&self, project_id: ProjectId) -> Result<Vec<ProjectVersion>, AppError>;

    /// Loads one version.
    ///
    /// # Errors
    ///
    /// [`AppError::VersionNotFound`] when absent.
    async fn get_version(
        &self,
        project_id: ProjectId,
        version_number: i32,
    ) -> Result<ProjectVersion, AppError>;

    /// The user's subscription, if any.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    async fn get_subscription(&self, user_id: UserId) -> Result<Option<Subscription>, AppError>;

    /// Appends a domain event to the event log.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    async fn save_event(&self, event: &ProjectEvent) -> Result<(), AppError>;
}
