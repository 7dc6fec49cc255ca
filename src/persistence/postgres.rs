//! PostgreSQL implementation of [`ProjectStore`].

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::models::{
    LEAD_COLUMNS, LeadRow, PROJECT_COLUMNS, ProjectRow, SubscriptionRow, VERSION_COLUMNS,
    VersionRow, lead_from_row, project_from_row, subscription_from_row, version_from_row,
};
use super::{LeadFilter, ProjectStore};
use crate::config::AppConfig;
use crate::domain::{
    Lead, LeadId, LeadStatus, Project, ProjectEvent, ProjectId, ProjectVersion, Subscription,
    UserId,
};
use crate::error::AppError;

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

fn db_error(e: sqlx::Error) -> AppError {
    AppError::PersistenceError(e.to_string())
}

fn event_payload(event: &ProjectEvent) -> Result<Value, AppError> {
    serde_json::to_value(event)
        .map_err(|e| AppError::PersistenceError(format!("event payload: {e}")))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl PostgresStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the pool settings from `config` and runs pending
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceError`] when the database is
    /// unreachable or a migration fails.
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.database_connect_timeout_secs,
            ))
            .connect(&config.database_url)
            .await
            .map_err(db_error)?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::PersistenceError(format!("migration failed: {e}")))?;
        Ok(Self::new(pool))
    }

    async fn current_revision(&self, id: ProjectId) -> Result<Option<i64>, AppError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT revision FROM projects WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }
}

#[async_trait]
impl ProjectStore for PostgresStore {
    async fn insert_project(&self, project: &Project) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO projects (id, owner_id, name, slug, niche, template_id, status, \
             template_data, custom_domain, revision, published_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(project.id.as_uuid())
        .bind(project.owner_id.as_uuid())
        .bind(&project.name)
        .bind(&project.slug)
        .bind(project.niche.as_str())
        .bind(&project.template_id)
        .bind(project.status.as_str())
        .bind(&project.template_data)
        .bind(&project.custom_domain)
        .bind(project.revision)
        .bind(project.published_at)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::SlugTaken(project.slug.clone())
            } else {
                db_error(e)
            }
        })?;
        Ok(())
    }

    async fn get_project(&self, id: ProjectId) -> Result<Project, AppError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(AppError::ProjectNotFound(*id.as_uuid()))?;
        project_from_row(row)
    }

    async fn find_project_by_slug(&self, slug: &str) -> Result<Option<Project>, AppError> {
        sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE slug = $1 AND deleted_at IS NULL"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(project_from_row)
        .transpose()
    }

    async fn list_projects(&self, owner_id: UserId) -> Result<Vec<Project>, AppError> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects \
             WHERE owner_id = $1 AND deleted_at IS NULL ORDER BY created_at DESC"
        ))
        .bind(owner_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(project_from_row).collect()
    }

    async fn count_projects(&self, owner_id: UserId) -> Result<u64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM projects WHERE owner_id = $1 AND deleted_at IS NULL",
        )
        .bind(owner_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn update_project_meta(&self, project: &Project) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE projects SET name = $2, slug = $3, template_id = $4, status = $5, \
             custom_domain = $6, published_at = $7, updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(project.id.as_uuid())
        .bind(&project.name)
        .bind(&project.slug)
        .bind(&project.template_id)
        .bind(project.status.as_str())
        .bind(&project.custom_domain)
        .bind(project.published_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::SlugTaken(project.slug.clone())
            } else {
                db_error(e)
            }
        })?;
        if result.rows_affected() == 0 {
            return Err(AppError::ProjectNotFound(*project.id.as_uuid()));
        }
        Ok(())
    }

    async fn save_template_data(
        &self,
        id: ProjectId,
        template_data: &Value,
        expected_revision: i64,
    ) -> Result<i64, AppError> {
        let updated = sqlx::query_scalar::<_, i64>(
            "UPDATE projects SET template_data = $2, revision = revision + 1, updated_at = now() \
             WHERE id = $1 AND revision = $3 AND deleted_at IS NULL RETURNING revision",
        )
        .bind(id.as_uuid())
        .bind(template_data)
        .bind(expected_revision)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match updated {
            Some(revision) => Ok(revision),
            None => match self.current_revision(id).await? {
                Some(actual) => Err(AppError::RevisionConflict {
                    expected: expected_revision,
                    actual,
                }),
                None => Err(AppError::ProjectNotFound(*id.as_uuid())),
            },
        }
    }

    async fn soft_delete_project(&self, id: ProjectId) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE projects SET deleted_at = now(), updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(AppError::ProjectNotFound(*id.as_uuid()));
        }
        Ok(())
    }

    async fn slug_exists(&self, slug: &str, exclude: Option<ProjectId>) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM projects WHERE slug = $1 AND deleted_at IS NULL \
             AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude.map(Uuid::from))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO leads_captured (id, project_id, user_id, data, source_url, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(lead.id.as_uuid())
        .bind(lead.project_id.as_uuid())
        .bind(lead.user_id.as_uuid())
        .bind(Value::Object(lead.data.clone()))
        .bind(&lead.source_url)
        .bind(lead.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn get_lead(&self, id: LeadId) -> Result<Lead, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads_captured WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(AppError::LeadNotFound(*id.as_uuid()))?;
        Ok(lead_from_row(row))
    }

    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError> {
        let rows = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads_captured \
             WHERE user_id = $1 \
               AND ($2::uuid IS NULL OR project_id = $2) \
               AND ($3::text IS NULL OR COALESCE(data->>'status', 'new') = $3) \
             ORDER BY created_at DESC"
        ))
        .bind(filter.owner_id.as_uuid())
        .bind(filter.project_id.map(Uuid::from))
        .bind(filter.status.map(LeadStatus::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(lead_from_row).collect())
    }

    async fn update_lead_status(&self, id: LeadId, status: LeadStatus) -> Result<Lead, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            "UPDATE leads_captured SET data = data || jsonb_build_object('status', $2::text) \
             WHERE id = $1 RETURNING {LEAD_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(AppError::LeadNotFound(*id.as_uuid()))?;
        Ok(lead_from_row(row))
    }

    async fn insert_version(
        &self,
        project_id: ProjectId,
        template_data: &Value,
        label: Option<String>,
    ) -> Result<ProjectVersion, AppError> {
        let row = sqlx::query_as::<_, VersionRow>(&format!(
            "INSERT INTO project_versions (id, project_id, version_number, template_data, label) \
             SELECT $1, $2, COALESCE(MAX(version_number), 0) + 1, $3, $4 \
             FROM project_versions WHERE project_id = $2 \
             RETURNING {VERSION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(project_id.as_uuid())
        .bind(template_data)
        .bind(label)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(version_from_row(row))
    }

    async fn list_versions(&self, project_id: ProjectId) -> Result<Vec<ProjectVersion>, AppError> {
        let rows = sqlx::query_as::<_, VersionRow>(&format!(
            "SELECT {VERSION_COLUMNS} FROM project_versions \
             WHERE project_id = $1 ORDER BY version_number DESC"
        ))
        .bind(project_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(version_from_row).collect())
    }

    async fn get_version(
        &self,
        project_id: ProjectId,
        version_number: i32,
    ) -> Result<ProjectVersion, AppError> {
        let row = sqlx::query_as::<_, VersionRow>(&format!(
            "SELECT {VERSION_COLUMNS} FROM project_versions \
             WHERE project_id = $1 AND version_number = $2"
        ))
        .bind(project_id.as_uuid())
        .bind(version_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(AppError::VersionNotFound {
            project_id: *project_id.as_uuid(),
            version: version_number,
        })?;
        Ok(version_from_row(row))
    }

    async fn get_subscription(&self, user_id: UserId) -> Result<Option<Subscription>, AppError> {
        sqlx::query_as::<_, SubscriptionRow>(
            "SELECT s.user_id, s.status, s.current_period_start, s.current_period_end, \
             s.external_customer_id, s.external_subscription_id, \
             p.id, p.name, p.max_projects, p.max_page_views, \
             p.custom_domain, p.webhooks, p.remove_branding, p.priority_support \
             FROM subscriptions s JOIN plans p ON p.id = s.plan_id WHERE s.user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(subscription_from_row)
        .transpose()
    }

    async fn save_event(&self, event: &ProjectEvent) -> Result<(), AppError> {
        let payload = event_payload(event)?;
        sqlx::query(
            "INSERT INTO project_events (project_id, event_type, payload) VALUES ($1, $2, $3)",
        )
        .bind(event.project_id().as_uuid())
        .bind(event.event_type_str())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn event_payload_carries_type_and_project() {
        let project_id = ProjectId::new();
        let event = ProjectEvent::ProjectPaused {
            project_id,
            timestamp: Utc::now(),
        };
        let Ok(payload) = event_payload(&event) else {
            panic!("payload failed");
        };
        assert_eq!(
            payload.get("event_type").and_then(Value::as_str),
            Some("project_paused")
        );
        assert_eq!(
            payload.get("project_id").and_then(Value::as_str),
            Some(project_id.as_uuid().to_string().as_str())
        );
    }
}
