//! Request extractors shared by the REST handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::UserId;
use crate::error::AppError;

/// Header carrying the authenticated user id, set by the auth proxy.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request acts for.
///
/// Rejects with [`AppError::Unauthorized`] when the header is missing or
/// not a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        let id = uuid::Uuid::parse_str(raw.trim()).map_err(|_| AppError::Unauthorized)?;
        Ok(Self(UserId::from_uuid(id)))
    }
}
