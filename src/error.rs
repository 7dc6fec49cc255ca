//! Service error types with HTTP status code mapping.
//!
//! [`AppError`] is the central error type for the REST API. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Public funnel pages never surface these as JSON; they render HTML views
//! instead (see [`crate::public`]).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2101,
///     "message": "slug already taken: webinar-x",
///     "field": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`AppError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Offending field for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                     |
/// |-----------|---------------------|---------------------------------|
/// | 1000–1999 | Validation          | 400 Bad Request / 422           |
/// | 2000–2099 | Not Found           | 404 Not Found                   |
/// | 2100–2199 | Conflict            | 409 Conflict                    |
/// | 2200–2299 | Access              | 401 Unauthorized / 403 Forbidden |
/// | 3000–3999 | Server              | 500 Internal Server Error       |
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed request (bad JSON shape, unknown enum value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A field failed local validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Offending field (camelCase JSON path).
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Project with the given ID was not found (or was deleted).
    #[error("project not found: {0}")]
    ProjectNotFound(uuid::Uuid),

    /// Lead with the given ID was not found.
    #[error("lead not found: {0}")]
    LeadNotFound(uuid::Uuid),

    /// Version number does not exist for the project.
    #[error("version {version} not found for project {project_id}")]
    VersionNotFound {
        /// Project the version was looked up in.
        project_id: uuid::Uuid,
        /// Requested version number.
        version: i32,
    },

    /// No editor session is open for the project.
    #[error("no editor session open for project {0}")]
    SessionNotFound(uuid::Uuid),

    /// Collection item with the given id was not found.
    #[error("item {id} not found in {collection}")]
    ItemNotFound {
        /// Collection name.
        collection: String,
        /// Requested item id.
        id: String,
    },

    /// Another live project already uses the slug.
    #[error("slug already taken: {0}")]
    SlugTaken(String),

    /// The project was written by someone else since it was loaded.
    #[error("revision conflict: expected {expected}, found {actual}")]
    RevisionConflict {
        /// Revision the writer based its change on.
        expected: i64,
        /// Revision currently stored.
        actual: i64,
    },

    /// The slug can no longer change because the project was published.
    #[error("slug is locked after publish: {0}")]
    SlugLocked(String),

    /// The user's plan does not allow another project.
    #[error("plan limit reached: at most {limit} projects")]
    PlanLimitReached {
        /// Maximum number of live projects for the plan.
        limit: u32,
    },

    /// The caller may not access or change the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No authenticated user on the request.
    #[error("missing or invalid user identity")]
    Unauthorized,

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a [`AppError::Validation`] error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Validation { .. } => 1002,
            Self::ProjectNotFound(_) => 2001,
            Self::LeadNotFound(_) => 2002,
            Self::VersionNotFound { .. } => 2003,
            Self::SessionNotFound(_) => 2004,
            Self::ItemNotFound { .. } => 2005,
            Self::SlugTaken(_) => 2101,
            Self::RevisionConflict { .. } => 2102,
            Self::SlugLocked(_) => 2103,
            Self::PlanLimitReached { .. } => 2201,
            Self::Forbidden(_) => 2202,
            Self::Unauthorized => 2203,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ProjectNotFound(_)
            | Self::LeadNotFound(_)
            | Self::VersionNotFound { .. }
            | Self::SessionNotFound(_)
            | Self::ItemNotFound { .. } => StatusCode::NOT_FOUND,
            Self::SlugTaken(_) | Self::RevisionConflict { .. } | Self::SlugLocked(_) => {
                StatusCode::CONFLICT
            }
            Self::PlanLimitReached { .. } | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for errors that a retry cannot fix.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        !matches!(self, Self::PersistenceError(_) | Self::Internal(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let field = match &self {
            Self::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                field,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_variants_map_to_409() {
        assert_eq!(
            AppError::SlugTaken("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::RevisionConflict {
                expected: 1,
                actual: 2
            }
            .status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn validation_is_unprocessable() {
        let err = AppError::validation("styles.primaryColor", "expected #rrggbb");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_code(), 1002);
        assert!(err.to_string().contains("styles.primaryColor"));
    }

    #[test]
    fn only_server_errors_are_retryable() {
        assert!(!AppError::PersistenceError("down".into()).is_permanent());
        assert!(AppError::ProjectNotFound(uuid::Uuid::new_v4()).is_permanent());
    }
}
