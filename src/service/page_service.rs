//! Public page service: slug resolution and page rendering.

use std::sync::Arc;

use crate::domain::funnel::{self, StageLinks};
use crate::domain::{Entitlement, FunnelContext, FunnelStage, Project, TemplateData, UserId};
use crate::error::AppError;
use crate::persistence::ProjectStore;
use crate::render::{self, Device, FormState, PageContext};

/// Resolves slugs to projects and renders their pages.
#[derive(Debug, Clone)]
pub struct PageService {
    store: Arc<dyn ProjectStore>,
    base_url: String,
}

impl PageService {
    /// Creates a new `PageService`. `base_url` prefixes canonical URLs.
    #[must_use]
    pub fn new(store: Arc<dyn ProjectStore>, base_url: &str) -> Self {
        Self {
            store,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URL of a landing page.
    #[must_use]
    pub fn canonical_url(&self, slug: &str) -> String {
        format!("{}{}", self.base_url, funnel::landing_path(slug))
    }

    /// The project served at `slug`, if it is live and active.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn resolve(&self, slug: &str) -> Result<Option<Project>, AppError> {
        let project = self.store.find_project_by_slug(slug).await?;
        Ok(project.filter(Project::is_public))
    }

    /// Whether pages of `owner` carry the branding footer.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn shows_branding(&self, owner: UserId) -> Result<bool, AppError> {
        let subscription = self.store.get_subscription(owner).await?;
        Ok(!Entitlement::from_subscription(subscription).removes_branding())
    }

    async fn context<'a>(
        &self,
        project: &'a Project,
        noindex: bool,
    ) -> Result<PageContext<'a>, AppError> {
        Ok(PageContext {
            name: &project.name,
            slug: &project.slug,
            renderer: project.renderer(),
            canonical_url: if noindex {
                String::new()
            } else {
                self.canonical_url(&project.slug)
            },
            branding: self.shows_branding(project.owner_id).await?,
            noindex,
        })
    }

    /// Renders the landing page of `project`.
    ///
    /// # Errors
    ///
    /// Propagates store and template failures.
    pub async fn landing(&self, project: &Project, form: &FormState) -> Result<String, AppError> {
        let ctx = self.context(project, false).await?;
        render::landing(&project.template(), &ctx, form)
    }

    /// Renders a funnel stage, or `None` when the stage is disabled.
    ///
    /// # Errors
    ///
    /// Propagates store and template failures.
    pub async fn stage(
        &self,
        project: &Project,
        stage: FunnelStage,
        visitor: &FunnelContext,
    ) -> Result<Option<String>, AppError> {
        let data = project.template();
        if !stage.is_enabled(&data) {
            return Ok(None);
        }
        let links: StageLinks = funnel::stage_links(&project.slug, &data, stage, visitor);
        let ctx = self.context(project, false).await?;
        render::stage(&data, &ctx, stage, &links, visitor).map(Some)
    }

    /// Renders `data` as `project` would look, wrapped in a device frame.
    ///
    /// # Errors
    ///
    /// Propagates store and template failures.
    pub async fn preview(
        &self,
        project: &Project,
        data: &TemplateData,
        device: Device,
    ) -> Result<String, AppError> {
        let ctx = self.context(project, true).await?;
        let page = render::landing(data, &ctx, &FormState::default())?;
        render::preview(&project.name, device, &page)
    }
}
