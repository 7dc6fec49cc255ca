//! Project DTOs for create, update, get and list operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::{Niche, Project, ProjectStatus};
use crate::service::project_service::{NewProject, ProjectChanges, SlugAvailability};

/// Request body for `POST /projects`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    /// Display name; also the source of the derived slug.
    pub name: String,
    /// Business category.
    pub niche: Niche,
    /// Template variant within the niche.
    #[serde(default)]
    pub template_id: Option<String>,
    /// Explicit slug instead of the derived one.
    #[serde(default)]
    pub slug: Option<String>,
}

impl From<CreateProjectRequest> for NewProject {
    fn from(req: CreateProjectRequest) -> Self {
        Self {
            name: req.name,
            niche: req.niche,
            template_id: req.template_id,
            slug: req.slug,
        }
    }
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Request body for `PATCH /projects/{id}`. Absent fields stay as they are.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProjectRequest {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New slug; rejected once the project was published.
    #[serde(default)]
    pub slug: Option<String>,
    /// New template variant.
    #[serde(default)]
    pub template_id: Option<String>,
    /// New custom domain; `null` removes it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub custom_domain: Option<Option<String>>,
}

impl From<UpdateProjectRequest> for ProjectChanges {
    fn from(req: UpdateProjectRequest) -> Self {
        Self {
            name: req.name,
            slug: req.slug,
            template_id: req.template_id,
            custom_domain: req.custom_domain,
        }
    }
}

/// A project as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectResponse {
    /// Project id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Public path key.
    pub slug: String,
    /// Business category.
    pub niche: Niche,
    /// Template variant.
    pub template_id: String,
    /// Publication status.
    pub status: ProjectStatus,
    /// Custom domain.
    pub custom_domain: Option<String>,
    /// Absolute URL of the landing page.
    pub public_url: String,
    /// Template data revision.
    pub revision: i64,
    /// First publish time.
    pub published_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Full template document, on single-project responses only.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub template_data: Option<Value>,
}

impl ProjectResponse {
    /// Summary view without the template document.
    #[must_use]
    pub fn summary(project: Project, public_url: String) -> Self {
        Self {
            id: project.id.into(),
            name: project.name,
            slug: project.slug,
            niche: project.niche,
            template_id: project.template_id,
            status: project.status,
            custom_domain: project.custom_domain,
            public_url,
            revision: project.revision,
            published_at: project.published_at,
            created_at: project.created_at,
            updated_at: project.updated_at,
            template_data: None,
        }
    }

    /// Detail view with the template document merged over defaults.
    #[must_use]
    pub fn detail(project: Project, public_url: String) -> Self {
        let template_data = project.template().to_value();
        Self {
            template_data: Some(template_data),
            ..Self::summary(project, public_url)
        }
    }
}

/// Query of `GET /projects/slug-available`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SlugQuery {
    /// Slug to check.
    pub slug: String,
}

/// Response of `GET /projects/slug-available`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SlugAvailabilityResponse {
    /// Checked slug.
    pub slug: String,
    /// Free to use.
    pub available: bool,
    /// Why it is not available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<SlugAvailability> for SlugAvailabilityResponse {
    fn from(check: SlugAvailability) -> Self {
        Self {
            slug: check.slug,
            available: check.available,
            reason: check.reason,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn custom_domain_null_differs_from_absent() {
        let Ok(absent) = serde_json::from_str::<UpdateProjectRequest>(r#"{"name":"X"}"#) else {
            panic!("parse failed");
        };
        assert_eq!(absent.custom_domain, None);

        let Ok(cleared) = serde_json::from_str::<UpdateProjectRequest>(r#"{"custom_domain":null}"#)
        else {
            panic!("parse failed");
        };
        assert_eq!(cleared.custom_domain, Some(None));

        let Ok(set) =
            serde_json::from_str::<UpdateProjectRequest>(r#"{"custom_domain":"lp.exemplo.com"}"#)
        else {
            panic!("parse failed");
        };
        assert_eq!(set.custom_domain, Some(Some("lp.exemplo.com".to_string())));
    }
}
