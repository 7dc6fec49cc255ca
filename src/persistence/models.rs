//! Row shapes read from PostgreSQL and their conversion to domain types.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::{
    Lead, LeadId, Plan, Project, ProjectId, ProjectVersion, Subscription, SubscriptionStatus,
    UserId,
};
use crate::error::AppError;

/// Column list matching [`ProjectRow`].
pub const PROJECT_COLUMNS: &str = "id, owner_id, name, slug, niche, template_id, status, \
     template_data, custom_domain, revision, published_at, created_at, updated_at, deleted_at";

/// A `projects` row.
pub type ProjectRow = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    String,
    String,
    Value,
    Option<String>,
    i64,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

/// Column list matching [`LeadRow`].
pub const LEAD_COLUMNS: &str = "id, project_id, user_id, data, source_url, created_at";

/// A `leads_captured` row.
pub type LeadRow = (Uuid, Uuid, Uuid, Value, Option<String>, DateTime<Utc>);

/// Column list matching [`VersionRow`].
pub const VERSION_COLUMNS: &str =
    "id, project_id, version_number, template_data, label, created_at";

/// A `project_versions` row.
pub type VersionRow = (Uuid, Uuid, i32, Value, Option<String>, DateTime<Utc>);

/// A `subscriptions` row joined with its `plans` row.
pub type SubscriptionRow = (
    Uuid,
    String,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Option<String>,
    Option<String>,
    String,
    String,
    i32,
    i32,
    bool,
    bool,
    bool,
    bool,
);

fn corrupt(what: &str, detail: impl std::fmt::Display) -> AppError {
    AppError::PersistenceError(format!("corrupt {what} row: {detail}"))
}

/// Converts a project row.
///
/// # Errors
///
/// Returns [`AppError::PersistenceError`] for unknown niche or status
/// strings.
pub fn project_from_row(row: ProjectRow) -> Result<Project, AppError> {
    let (
        id,
        owner_id,
        name,
        slug,
        niche,
        template_id,
        status,
        template_data,
        custom_domain,
        revision,
        published_at,
        created_at,
        updated_at,
        deleted_at,
    ) = row;
    Ok(Project {
        id: ProjectId::from_uuid(id),
        owner_id: UserId::from_uuid(owner_id),
        name,
        slug,
        niche: niche.parse().map_err(|e| corrupt("project", e))?,
        template_id,
        status: status.parse().map_err(|e| corrupt("project", e))?,
        template_data,
        custom_domain,
        revision,
        published_at,
        created_at,
        updated_at,
        deleted_at,
    })
}

/// Converts a lead row. A non-object `data` column reads as empty.
#[must_use]
pub fn lead_from_row(row: LeadRow) -> Lead {
    let (id, project_id, user_id, data, source_url, created_at) = row;
    let data = match data {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Lead {
        id: LeadId::from_uuid(id),
        project_id: ProjectId::from_uuid(project_id),
        user_id: UserId::from_uuid(user_id),
        data,
        source_url: source_url.unwrap_or_default(),
        created_at,
    }
}

/// Converts a version row.
#[must_use]
pub fn version_from_row(row: VersionRow) -> ProjectVersion {
    let (id, project_id, version_number, template_data, label, created_at) = row;
    ProjectVersion {
        id,
        project_id: ProjectId::from_uuid(project_id),
        version_number,
        template_data,
        label,
        created_at,
    }
}

/// Converts a subscription row.
///
/// # Errors
///
/// Returns [`AppError::PersistenceError`] for an unknown status.
pub fn subscription_from_row(row: SubscriptionRow) -> Result<Subscription, AppError> {
    let (
        user_id,
        status,
        current_period_start,
        current_period_end,
        external_customer_id,
        external_subscription_id,
        plan_id,
        plan_name,
        max_projects,
        max_page_views,
        custom_domain,
        webhooks,
        remove_branding,
        priority_support,
    ) = row;
    let status = SubscriptionStatus::parse(&status).ok_or_else(|| corrupt("subscription", status))?;
    Ok(Subscription {
        user_id: UserId::from_uuid(user_id),
        plan: Plan {
            id: plan_id,
            name: plan_name,
            max_projects: u32::try_from(max_projects).unwrap_or(0),
            max_page_views: u32::try_from(max_page_views).unwrap_or(0),
            custom_domain,
            webhooks,
            remove_branding,
            priority_support,
        },
        status,
        current_period_start,
        current_period_end,
        external_customer_id,
        external_subscription_id,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{Niche, ProjectStatus};

    #[test]
    fn project_row_converts() {
        let now = Utc::now();
        let row: ProjectRow = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Webinar X".into(),
            "webinar-x".into(),
            "event".into(),
            "event_default".into(),
            "paused".into(),
            json!({}),
            None,
            3,
            None,
            now,
            now,
            None,
        );
        let Ok(project) = project_from_row(row) else {
            panic!("conversion failed");
        };
        assert_eq!(project.niche, Niche::Event);
        assert_eq!(project.status, ProjectStatus::Paused);
        assert_eq!(project.revision, 3);
    }

    #[test]
    fn unknown_niche_is_a_persistence_error() {
        let now = Utc::now();
        let row: ProjectRow = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            String::new(),
            String::new(),
            "restaurant".into(),
            String::new(),
            "active".into(),
            json!({}),
            None,
            0,
            None,
            now,
            now,
            None,
        );
        assert!(matches!(
            project_from_row(row),
            Err(AppError::PersistenceError(_))
        ));
    }

    #[test]
    fn lead_with_non_object_data_reads_empty() {
        let row: LeadRow = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            json!("garbage"),
            None,
            Utc::now(),
        );
        let lead = lead_from_row(row);
        assert!(lead.data.is_empty());
        assert!(lead.source_url.is_empty());
    }
}
