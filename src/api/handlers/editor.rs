//! Editor handlers: session lifecycle, tab and collection edits,
//! undo/redo, manual save, preview, versions and image uploads.

use axum::body::Bytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::Value;
use uuid::Uuid;

use crate::api::dto::{
    CollectionResponse, ImageUploadResponse, PreviewQuery, SaveRequest, SaveResponse,
    SessionResponse, VersionResponse,
};
use crate::api::extract::CurrentUser;
use crate::app_state::AppState;
use crate::domain::{CollectionKind, CollectionOp, ProjectId};
use crate::editor::EditorTab;
use crate::error::{AppError, ErrorResponse};
use crate::service::editor_service::CollectionResult;

fn collection_response(result: CollectionResult) -> Json<CollectionResponse> {
    Json(CollectionResponse {
        item_id: result.item_id,
        session: result.snapshot.into(),
    })
}

/// Open (or rejoin) the editor.
///
/// `POST /projects/{id}/editor`
///
/// # Errors
///
/// Returns [`AppError::ProjectNotFound`] for unknown or foreign projects.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/editor",
    tag = "Editor",
    summary = "Open editor session",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Session state", body = SessionResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
    )
)]
pub async fn open_editor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state
        .editor_service
        .open(user, ProjectId::from_uuid(id))
        .await?;
    Ok(Json(SessionResponse::from(snapshot)))
}

/// Current session state.
///
/// `GET /projects/{id}/editor`
///
/// # Errors
///
/// Returns [`AppError::SessionNotFound`] when no session is open.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/editor",
    tag = "Editor",
    summary = "Get editor session",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Session state", body = SessionResponse),
        (status = 404, description = "No open session", body = ErrorResponse),
    )
)]
pub async fn get_editor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state
        .editor_service
        .snapshot(user, ProjectId::from_uuid(id))
        .await?;
    Ok(Json(SessionResponse::from(snapshot)))
}

/// Flush pending edits and close.
///
/// `DELETE /projects/{id}/editor`
///
/// # Errors
///
/// Returns [`AppError::SessionNotFound`] when no session is open.
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}/editor",
    tag = "Editor",
    summary = "Close editor session",
    description = "Writes pending edits best-effort and closes the session. A failed final write shows up in the returned sync state.",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Final session state", body = SessionResponse),
        (status = 404, description = "No open session", body = ErrorResponse),
    )
)]
pub async fn close_editor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state
        .editor_service
        .close(user, ProjectId::from_uuid(id))
        .await?;
    Ok(Json(SessionResponse::from(snapshot)))
}

/// Partial update from a tab.
///
/// `PATCH /projects/{id}/editor/tabs/{tab}`
///
/// # Errors
///
/// Returns [`AppError::Validation`] when the update leaves the tab or
/// breaks its rules.
#[utoipa::path(
    patch,
    path = "/api/v1/projects/{id}/editor/tabs/{tab}",
    tag = "Editor",
    summary = "Update from an editor tab",
    description = "Deep-merges a partial template document. Only keys owned by the tab are accepted.",
    request_body(content = Object, description = "Partial template document"),
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("tab" = EditorTab, Path, description = "Editor tab"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Session state", body = SessionResponse),
        (status = 404, description = "No open session", body = ErrorResponse),
        (status = 422, description = "Invalid update", body = ErrorResponse),
    )
)]
pub async fn update_tab(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, tab)): Path<(Uuid, EditorTab)>,
    Json(partial): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state
        .editor_service
        .update_tab(user, ProjectId::from_uuid(id), tab, &partial)
        .await?;
    Ok(Json(SessionResponse::from(snapshot)))
}

/// Append an item.
///
/// `POST /projects/{id}/editor/collections/{collection}`
///
/// # Errors
///
/// Returns [`AppError::InvalidRequest`] for malformed items.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/editor/collections/{collection}",
    tag = "Editor",
    summary = "Add collection item",
    request_body(content = Object, description = "New item; the id is assigned by the server"),
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("collection" = CollectionKind, Path, description = "Collection"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 201, description = "Item added", body = CollectionResponse),
        (status = 404, description = "No open session", body = ErrorResponse),
    )
)]
pub async fn add_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, kind)): Path<(Uuid, CollectionKind)>,
    Json(item): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .editor_service
        .collection(user, ProjectId::from_uuid(id), kind, CollectionOp::Add(item))
        .await?;
    Ok((StatusCode::CREATED, collection_response(result)))
}

/// Merge a patch into one item.
///
/// `PATCH /projects/{id}/editor/collections/{collection}/{item_id}`
///
/// # Errors
///
/// Returns [`AppError::ItemNotFound`] for unknown item ids.
#[utoipa::path(
    patch,
    path = "/api/v1/projects/{id}/editor/collections/{collection}/{item_id}",
    tag = "Editor",
    summary = "Update collection item",
    request_body(content = Object, description = "Merge patch for the item"),
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("collection" = CollectionKind, Path, description = "Collection"),
        ("item_id" = String, Path, description = "Item id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Item updated", body = CollectionResponse),
        (status = 404, description = "Unknown item or no open session", body = ErrorResponse),
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, kind, item_id)): Path<(Uuid, CollectionKind, String)>,
    Json(patch): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .editor_service
        .collection(
            user,
            ProjectId::from_uuid(id),
            kind,
            CollectionOp::Update { id: item_id, patch },
        )
        .await?;
    Ok(collection_response(result))
}

/// Remove one item.
///
/// `DELETE /projects/{id}/editor/collections/{collection}/{item_id}`
///
/// # Errors
///
/// Returns [`AppError::ItemNotFound`] for unknown item ids.
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}/editor/collections/{collection}/{item_id}",
    tag = "Editor",
    summary = "Remove collection item",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("collection" = CollectionKind, Path, description = "Collection"),
        ("item_id" = String, Path, description = "Item id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Item removed", body = CollectionResponse),
        (status = 404, description = "Unknown item or no open session", body = ErrorResponse),
    )
)]
pub async fn remove_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, kind, item_id)): Path<(Uuid, CollectionKind, String)>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .editor_service
        .collection(
            user,
            ProjectId::from_uuid(id),
            kind,
            CollectionOp::Remove { id: item_id },
        )
        .await?;
    Ok(collection_response(result))
}

/// `POST /projects/{id}/editor/undo`
///
/// # Errors
///
/// Returns [`AppError::SessionNotFound`] when no session is open.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/editor/undo",
    tag = "Editor",
    summary = "Undo last change",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Session state", body = SessionResponse),
        (status = 404, description = "No open session", body = ErrorResponse),
    )
)]
pub async fn undo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state
        .editor_service
        .undo(user, ProjectId::from_uuid(id))
        .await?;
    Ok(Json(SessionResponse::from(snapshot)))
}

/// `POST /projects/{id}/editor/redo`
///
/// # Errors
///
/// Returns [`AppError::SessionNotFound`] when no session is open.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/editor/redo",
    tag = "Editor",
    summary = "Redo undone change",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Session state", body = SessionResponse),
        (status = 404, description = "No open session", body = ErrorResponse),
    )
)]
pub async fn redo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state
        .editor_service
        .redo(user, ProjectId::from_uuid(id))
        .await?;
    Ok(Json(SessionResponse::from(snapshot)))
}

/// Write now and record a version.
///
/// `POST /projects/{id}/editor/save`
///
/// # Errors
///
/// Returns the write error; no version is created then.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/editor/save",
    tag = "Editor",
    summary = "Save and snapshot",
    request_body = SaveRequest,
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Saved", body = SaveResponse),
        (status = 404, description = "No open session", body = ErrorResponse),
        (status = 409, description = "Revision conflict", body = ErrorResponse),
    )
)]
pub async fn save(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let req: SaveRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SaveRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::InvalidRequest(format!("invalid save request: {e}")))?
    };
    let label = req.label.filter(|l| !l.trim().is_empty());
    let (snapshot, version) = state
        .editor_service
        .save_now(user, ProjectId::from_uuid(id), label)
        .await?;
    Ok(Json(SaveResponse {
        session: snapshot.into(),
        version: version.into(),
    }))
}

/// Render the visible document.
///
/// `GET /projects/{id}/editor/preview`
///
/// # Errors
///
/// Returns [`AppError::ProjectNotFound`] for unknown or foreign projects.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/editor/preview",
    tag = "Editor",
    summary = "Preview page",
    description = "Renders the open session's document (or the stored one) inside a desktop or mobile frame.",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        PreviewQuery,
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Preview HTML", content_type = "text/html", body = String),
        (status = 404, description = "Project not found", body = ErrorResponse),
    )
)]
pub async fn preview(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<PreviewQuery>,
) -> Result<impl IntoResponse, AppError> {
    let html = state
        .editor_service
        .preview(user, ProjectId::from_uuid(id), query.device)
        .await?;
    Ok(Html(html))
}

/// Version history, newest first.
///
/// `GET /projects/{id}/versions`
///
/// # Errors
///
/// Returns [`AppError::ProjectNotFound`] for unknown or foreign projects.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/versions",
    tag = "Editor",
    summary = "List versions",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Versions", body = Vec<VersionResponse>),
        (status = 404, description = "Project not found", body = ErrorResponse),
    )
)]
pub async fn list_versions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let versions = state
        .editor_service
        .versions(user, ProjectId::from_uuid(id))
        .await?;
    let data: Vec<VersionResponse> = versions.into_iter().map(Into::into).collect();
    Ok(Json(data))
}

/// Load a version into the editor as one undoable change.
///
/// `POST /projects/{id}/versions/{n}/restore`
///
/// # Errors
///
/// Returns [`AppError::VersionNotFound`] for unknown version numbers.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/versions/{n}/restore",
    tag = "Editor",
    summary = "Restore version",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("n" = i32, Path, description = "Version number"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Session state", body = SessionResponse),
        (status = 404, description = "Unknown project or version", body = ErrorResponse),
    )
)]
pub async fn restore_version(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, n)): Path<(Uuid, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state
        .editor_service
        .restore(user, ProjectId::from_uuid(id), n)
        .await?;
    Ok(Json(SessionResponse::from(snapshot)))
}

/// Upload an image (`file` field).
///
/// `POST /projects/{id}/images`
///
/// # Errors
///
/// Returns [`AppError::Validation`] for missing, empty, oversized or
/// non-image files.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/images",
    tag = "Editor",
    summary = "Upload image",
    description = "Stores a PNG, JPEG, WebP or GIF image and returns the URL to use in image fields.",
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Multipart form with a `file` field"),
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("x-user-id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 201, description = "Image stored", body = ImageUploadResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
        (status = 422, description = "Invalid file", body = ErrorResponse),
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let project = state
        .project_service
        .get(user, ProjectId::from_uuid(id))
        .await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("failed to read multipart field: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(format!("failed to read upload: {e}")))?;
        let stored = state
            .media
            .store_image(project.id, &content_type, &bytes)
            .await?;
        tracing::info!(project_id = %project.id, url = %stored.url, "image uploaded");
        return Ok((StatusCode::CREATED, Json(ImageUploadResponse::from(stored))));
    }
    Err(AppError::validation("file", "no file uploaded"))
}

/// Editor routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{id}/editor",
            post(open_editor).get(get_editor).delete(close_editor),
        )
        .route("/projects/{id}/editor/tabs/{tab}", patch(update_tab))
        .route(
            "/projects/{id}/editor/collections/{collection}",
            post(add_item),
        )
        .route(
            "/projects/{id}/editor/collections/{collection}/{item_id}",
            patch(update_item).delete(remove_item),
        )
        .route("/projects/{id}/editor/undo", post(undo))
        .route("/projects/{id}/editor/redo", post(redo))
        .route("/projects/{id}/editor/save", post(save))
        .route("/projects/{id}/editor/preview", get(preview))
        .route("/projects/{id}/versions", get(list_versions))
        .route("/projects/{id}/versions/{n}/restore", post(restore_version))
        .route("/projects/{id}/images", post(upload_image))
}
