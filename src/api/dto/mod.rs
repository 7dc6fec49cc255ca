//! Data Transfer Objects for REST request/response serialization.
//!
//! Identifiers are exposed as plain UUIDs; template documents and lead
//! data travel as free-form JSON objects.

pub mod common_dto;
pub mod editor_dto;
pub mod lead_dto;
pub mod project_dto;
pub mod subscription_dto;

pub use common_dto::*;
pub use editor_dto::*;
pub use lead_dto::*;
pub use project_dto::*;
pub use subscription_dto::*;
