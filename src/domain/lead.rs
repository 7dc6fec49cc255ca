//! Captured leads.
//!
//! A lead's `data` is a sparse JSON map holding only the fields the
//! visitor actually filled in. The optional `status` key lives in the same
//! map and reads as [`LeadStatus::New`] when absent.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::ids::{LeadId, ProjectId, UserId};
use super::template_data::{FormField, TemplateData};
use crate::error::AppError;

/// Form key of the LGPD consent checkbox.
pub const CONSENT_FIELD: &str = "consent";

/// Follow-up state of a lead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    /// Not yet handled.
    #[default]
    New,
    /// Reached out.
    Contacted,
    /// Became a customer.
    Converted,
    /// Not a fit.
    Discarded,
}

impl LeadStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Converted => "converted",
            Self::Discarded => "discarded",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "converted" => Ok(Self::Converted),
            "discarded" => Ok(Self::Discarded),
            other => Err(AppError::validation(
                "status",
                format!("unknown lead status '{other}'"),
            )),
        }
    }
}

/// A form submission stored for the project owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Lead {
    /// Lead id.
    pub id: LeadId,
    /// Project the form belongs to.
    pub project_id: ProjectId,
    /// Project owner at capture time.
    pub user_id: UserId,
    /// Submitted fields plus the optional `status`.
    pub data: Map<String, Value>,
    /// Page the lead was captured on.
    pub source_url: String,
    /// Capture time.
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Creates a lead captured now.
    #[must_use]
    pub fn new(
        project_id: ProjectId,
        user_id: UserId,
        data: Map<String, Value>,
        source_url: String,
    ) -> Self {
        Self {
            id: LeadId::new(),
            project_id,
            user_id,
            data,
            source_url,
            created_at: Utc::now(),
        }
    }

    /// Current status; absent or unreadable values read as `new`.
    #[must_use]
    pub fn status(&self) -> LeadStatus {
        self.field("status")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Sets the status. The only mutation a lead supports.
    pub fn set_status(&mut self, status: LeadStatus) {
        self.data
            .insert("status".to_string(), Value::String(status.as_str().to_string()));
    }

    /// String value of a data key.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Contact name (`fullName`, or legacy `name`).
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.field(FormField::FullName.key())
            .or_else(|| self.field("name"))
    }

    /// Contact e-mail.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.field(FormField::Email.key())
    }

    /// Phone, falling back to WhatsApp.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.field(FormField::Phone.key())
            .filter(|p| !p.is_empty())
            .or_else(|| self.field(FormField::Whatsapp.key()))
    }
}

/// Builds the sparse lead record from a submitted form.
///
/// Only fields enabled in `formFields` are read; values are trimmed and
/// empty ones dropped. Unknown form keys are ignored.
///
/// # Errors
///
/// Returns [`AppError::Validation`] when a required field is missing, the
/// e-mail has no `@`, or the LGPD consent box is required and unchecked.
pub fn capture_record(
    template: &TemplateData,
    form: &HashMap<String, String>,
) -> Result<Map<String, Value>, AppError> {
    let mut record = Map::new();
    for field in template.form_fields.enabled() {
        let value = form.get(field.key()).map(|v| v.trim()).unwrap_or_default();
        if value.is_empty() {
            if field.is_required() {
                return Err(AppError::validation(
                    field.key(),
                    format!("{} é obrigatório", field.label()),
                ));
            }
            continue;
        }
        record.insert(field.key().to_string(), Value::String(value.to_string()));
    }

    if record
        .get(FormField::Email.key())
        .and_then(Value::as_str)
        .is_some_and(|email| !email.contains('@'))
    {
        return Err(AppError::validation(
            FormField::Email.key(),
            "Informe um e-mail válido",
        ));
    }

    if template.lgpd.consent_checkbox
        && form
            .get(CONSENT_FIELD)
            .is_none_or(|v| v.trim().is_empty())
    {
        return Err(AppError::validation(
            CONSENT_FIELD,
            "É necessário aceitar os termos",
        ));
    }

    Ok(record)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn record_holds_only_enabled_non_empty_fields() {
        let mut template = TemplateData::default();
        template.form_fields.phone = true;
        let Ok(record) = capture_record(
            &template,
            &form(&[
                ("fullName", "  Ana "),
                ("email", "a@x.com"),
                ("phone", "   "),
                ("company", "ACME"),
            ]),
        ) else {
            panic!("capture failed");
        };
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("fullName"), Some(&Value::String("Ana".into())));
        assert!(!record.contains_key("phone"));
        assert!(!record.contains_key("company"));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let template = TemplateData::default();
        let Err(AppError::Validation { field, .. }) =
            capture_record(&template, &form(&[("email", "a@x.com")]))
        else {
            panic!("expected validation error");
        };
        assert_eq!(field, "fullName");
    }

    #[test]
    fn email_needs_at_sign() {
        let template = TemplateData::default();
        assert!(capture_record(&template, &form(&[("fullName", "Ana"), ("email", "ana")])).is_err());
    }

    #[test]
    fn consent_required_when_enabled() {
        let mut template = TemplateData::default();
        template.lgpd.consent_checkbox = true;
        let base = [("fullName", "Ana"), ("email", "a@x.com")];
        assert!(capture_record(&template, &form(&base)).is_err());

        let Ok(record) = capture_record(
            &template,
            &form(&[("fullName", "Ana"), ("email", "a@x.com"), ("consent", "on")]),
        ) else {
            panic!("consent given");
        };
        assert!(!record.contains_key(CONSENT_FIELD));
    }

    #[test]
    fn status_defaults_to_new() {
        let mut lead = Lead::new(ProjectId::new(), UserId::new(), Map::new(), String::new());
        assert_eq!(lead.status(), LeadStatus::New);
        lead.set_status(LeadStatus::Converted);
        assert_eq!(lead.status(), LeadStatus::Converted);
    }

    #[test]
    fn phone_falls_back_to_whatsapp() {
        let mut data = Map::new();
        data.insert("whatsapp".into(), Value::String("11 99999-0000".into()));
        let lead = Lead::new(ProjectId::new(), UserId::new(), data, String::new());
        assert_eq!(lead.phone(), Some("11 99999-0000"));
    }
}
