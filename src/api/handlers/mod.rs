//! REST endpoint handlers organized by resource.

pub mod editor;
pub mod leads;
pub mod projects;
pub mod subscription;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(projects::routes())
        .merge(editor::routes())
        .merge(leads::routes())
        .merge(subscription::routes())
}
