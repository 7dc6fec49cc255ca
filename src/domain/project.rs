//! Project entity and slug rules.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::ids::{ProjectId, UserId};
use super::niche::{Niche, RendererKind};
use super::template_data::TemplateData;
use crate::error::AppError;

/// Maximum slug length.
pub const MAX_SLUG_LEN: usize = 60;

/// Slugs that would shadow service routes under the legacy `/{slug}`
/// alias.
pub const RESERVED_SLUGS: [&str; 8] = [
    "api",
    "p",
    "health",
    "media",
    "swagger-ui",
    "api-docs",
    "config",
    "static",
];

/// Whether the public pages of a project are served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Pages are public.
    #[default]
    Active,
    /// Pages render not-found.
    Paused,
}

impl ProjectStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            other => Err(AppError::validation(
                "status",
                format!("unknown status '{other}'"),
            )),
        }
    }
}

/// A landing page and its funnel, owned by one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// Project id.
    pub id: ProjectId,
    /// Owning user.
    pub owner_id: UserId,
    /// Display name.
    pub name: String,
    /// Public path key.
    pub slug: String,
    /// Business category.
    pub niche: Niche,
    /// Renderer variant id.
    pub template_id: String,
    /// Publication status.
    pub status: ProjectStatus,
    /// Stored template document, possibly from an older schema.
    pub template_data: Value,
    /// Custom domain, when the plan allows one.
    pub custom_domain: Option<String>,
    /// Incremented on every durable template-data write.
    pub revision: i64,
    /// First publish time. The slug is frozen once set.
    pub published_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Project {
    /// Builds a new, unpublished, active project at revision 0.
    #[must_use]
    pub fn new(
        owner_id: UserId,
        name: String,
        slug: String,
        niche: Niche,
        renderer: RendererKind,
        template_data: &TemplateData,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            owner_id,
            name,
            slug,
            niche,
            template_id: renderer.template_id().to_string(),
            status: ProjectStatus::Active,
            template_data: template_data.to_value(),
            custom_domain: None,
            revision: 0,
            published_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Renderer chosen by niche and template id.
    #[must_use]
    pub fn renderer(&self) -> RendererKind {
        RendererKind::resolve(self.niche, &self.template_id)
    }

    /// The stored document merged over today's defaults.
    #[must_use]
    pub fn template(&self) -> TemplateData {
        TemplateData::from_stored(&self.template_data)
    }

    /// Not soft-deleted.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Live and active: public pages are served.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.is_live() && self.status == ProjectStatus::Active
    }

    /// Has been published at least once.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// Returns `Ok` when `user` owns the project.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ProjectNotFound`] for a foreign project so that
    /// ids of other tenants cannot be probed.
    pub fn ensure_owner(&self, user: UserId) -> Result<(), AppError> {
        if self.owner_id == user && self.is_live() {
            Ok(())
        } else {
            Err(AppError::ProjectNotFound(*self.id.as_uuid()))
        }
    }
}

/// Derives a slug from a display name.
///
/// Lowercases, folds Latin accents, collapses every run of other
/// characters into one `-`, trims dashes and caps the length at
/// [`MAX_SLUG_LEN`].
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
    }
    slug.trim_end_matches('-').to_string()
}

const fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Checks a user-supplied slug.
///
/// # Errors
///
/// Returns [`AppError::Validation`] on `slug` when the value is empty, too
/// long, reserved, or not of the form `[a-z0-9]+(-[a-z0-9]+)*`.
pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    let invalid = |message: &str| Err(AppError::validation("slug", message));
    if slug.is_empty() {
        return invalid("slug must not be empty");
    }
    if slug.len() > MAX_SLUG_LEN {
        return invalid("slug is too long");
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return invalid("slug may only contain a-z, 0-9 and '-'");
    }
    if slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
        return invalid("slug has misplaced dashes");
    }
    if RESERVED_SLUGS.contains(&slug) {
        return invalid("slug is reserved");
    }
    Ok(())
}
