//! Lead service: capture from public forms, owner-side listing, status
//! changes and CSV export.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::domain::funnel::capture_redirect;
use crate::domain::lead::capture_record;
use crate::domain::{EventBus, Lead, LeadId, LeadStatus, Project, ProjectEvent, ProjectId, UserId};
use crate::error::AppError;
use crate::persistence::{LeadFilter, ProjectStore};

/// CSV column names, in order.
pub const CSV_HEADER: [&str; 6] = ["name", "email", "phone", "project", "date", "status"];

/// A stored lead and where the visitor goes next.
#[derive(Debug, Clone)]
pub struct Capture {
    /// The stored lead.
    pub lead: Lead,
    /// `303` target.
    pub redirect: String,
}

/// Orchestrates lead capture and management.
#[derive(Debug, Clone)]
pub struct LeadService {
    store: Arc<dyn ProjectStore>,
    event_bus: EventBus,
}

impl LeadService {
    /// Creates a new `LeadService`.
    #[must_use]
    pub fn new(store: Arc<dyn ProjectStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Stores a lead submitted on `project`'s landing page.
    ///
    /// `source_url` is the page the form was posted from.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] when a required field is missing or
    /// invalid; nothing is stored then.
    pub async fn capture(
        &self,
        project: &Project,
        form: &HashMap<String, String>,
        source_url: String,
    ) -> Result<Capture, AppError> {
        let data = project.template();
        let record = capture_record(&data, form)?;
        let redirect = capture_redirect(&project.slug, &data, &record);
        let lead = Lead::new(project.id, project.owner_id, record, source_url);
        self.store.insert_lead(&lead).await?;

        self.event_bus.publish(ProjectEvent::LeadCaptured {
            project_id: project.id,
            lead_id: lead.id,
            timestamp: Utc::now(),
        });
        tracing::info!(project_id = %project.id, lead_id = %lead.id, slug = %project.slug, "lead captured");
        Ok(Capture { lead, redirect })
    }

    /// Leads of `user`, optionally narrowed to one project and status.
    ///
    /// # Errors
    ///
    /// [`AppError::ProjectNotFound`] when `project_id` is not `user`'s.
    pub async fn list(
        &self,
        user: UserId,
        project_id: Option<ProjectId>,
        status: Option<LeadStatus>,
    ) -> Result<Vec<Lead>, AppError> {
        if let Some(id) = project_id {
            self.store.get_project(id).await?.ensure_owner(user)?;
        }
        self.store
            .list_leads(&LeadFilter {
                owner_id: user,
                project_id,
                status,
            })
            .await
    }

    /// Moves a lead to another status.
    ///
    /// # Errors
    ///
    /// [`AppError::LeadNotFound`] for unknown or foreign leads.
    pub async fn update_status(
        &self,
        user: UserId,
        id: LeadId,
        status: LeadStatus,
    ) -> Result<Lead, AppError> {
        let lead = self.store.get_lead(id).await?;
        if lead.user_id != user {
            return Err(AppError::LeadNotFound(*id.as_uuid()));
        }
        let lead = self.store.update_lead_status(id, status).await?;

        self.event_bus.publish(ProjectEvent::LeadStatusChanged {
            project_id: lead.project_id,
            lead_id: id,
            status,
            timestamp: Utc::now(),
        });
        tracing::info!(lead_id = %id, status = status.as_str(), "lead status changed");
        Ok(lead)
    }

    /// CSV export of `user`'s leads, optionally for one project.
    ///
    /// # Errors
    ///
    /// [`AppError::ProjectNotFound`] when `project_id` is not `user`'s.
    pub async fn export_csv(
        &self,
        user: UserId,
        project_id: Option<ProjectId>,
    ) -> Result<String, AppError> {
        let leads = self.list(user, project_id, None).await?;
        let names: HashMap<ProjectId, String> = self
            .store
            .list_projects(user)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();
        Ok(leads_to_csv(&leads, &names))
    }
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// Renders leads as CSV: a header row plus one row per lead in input
/// order, every cell double-quoted, rows separated by `\n`.
///
/// `project_names` maps project ids to display names; unknown projects
/// leave the cell empty. Dates are `dd/mm/YYYY` (UTC).
#[must_use]
pub fn leads_to_csv(leads: &[Lead], project_names: &HashMap<ProjectId, String>) -> String {
    let mut out = CSV_HEADER.map(quote).join(",");
    for lead in leads {
        let row = [
            lead.name().unwrap_or_default(),
            lead.email().unwrap_or_default(),
            lead.phone().unwrap_or_default(),
            project_names
                .get(&lead.project_id)
                .map_or("", String::as_str),
            &lead.created_at.format("%d/%m/%Y").to_string(),
            lead.status().as_str(),
        ]
        .map(quote)
        .join(",");
        out.push('\n');
        out.push_str(&row);
    }
    out
}
