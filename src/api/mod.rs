//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1` and act for the user in
//! the `x-user-id` header. System endpoints live at the root.

pub mod docs;
pub mod dto;
pub mod extract;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
        )
    };

    router
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::api::extract::USER_ID_HEADER;
    use crate::config::AppConfig;
    use crate::persistence::ProjectStore;
    use crate::persistence::memory::MemoryStore;

    fn app() -> Router {
        let store: Arc<dyn ProjectStore> = Arc::new(MemoryStore::new());
        build_router()
            .merge(crate::public::routes())
            .with_state(AppState::new(AppConfig::default(), store))
    }

    fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let Ok(request) = builder.body(body) else {
            panic!("bad request");
        };
        request
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        let Ok(response) = app.clone().oneshot(req).await else {
            panic!("request failed");
        };
        response
    }

    async fn json_body(response: Response) -> Value {
        let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        let Ok(value) = serde_json::from_slice(&bytes) else {
            panic!("not json: {}", String::from_utf8_lossy(&bytes));
        };
        value
    }

    async fn text_body(response: Response) -> String {
        let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }

    const USER: &str = "6f1c2a3e-9d4b-4a7e-8c1f-2b3d4e5f6a7b";

    #[tokio::test]
    async fn missing_user_header_is_unauthorized() {
        let app = app();
        let response = send(&app, request("GET", "/api/v1/projects", None, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"]["code"], 2203);

        let bad = send(&app, request("GET", "/api/v1/projects", Some("nope"), None)).await;
        assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_and_catalog() {
        let app = app();
        let health = send(&app, request("GET", "/health", None, None)).await;
        assert_eq!(health.status(), StatusCode::OK);
        assert_eq!(json_body(health).await["status"], "healthy");

        let niches = json_body(send(&app, request("GET", "/config/niches", None, None)).await).await;
        let Some(list) = niches.as_array() else {
            panic!("expected array");
        };
        assert_eq!(list.len(), 4);
        let Some(product) = list.iter().find(|n| n["niche"] == "product") else {
            panic!("product niche missing");
        };
        assert_eq!(product["default_template"], "product_default");
        assert_eq!(product["templates"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn webinar_flow_through_the_api() {
        let app = app();
        let created = send(
            &app,
            request(
                "POST",
                "/api/v1/projects",
                Some(USER),
                Some(json!({ "name": "Webinar X", "niche": "event" })),
            ),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let project = json_body(created).await;
        assert_eq!(project["slug"], "webinar-x");
        assert_eq!(project["template_id"], "event_default");
        assert_eq!(project["public_url"], "http://localhost:3000/p/webinar-x");

        let page = send(&app, request("GET", "/p/webinar-x", None, None)).await;
        assert_eq!(page.status(), StatusCode::OK);
        assert!(text_body(page).await.contains("data-renderer=\"event_default\""));

        let Ok(form) = Request::post("/p/webinar-x/leads")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::REFERER, "https://lp.exemplo.com/p/webinar-x")
            .body(Body::from("fullName=Ana&email=a%40x.com"))
        else {
            panic!("bad request");
        };
        let submitted = send(&app, form).await;
        assert_eq!(submitted.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            submitted
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/p/webinar-x/obrigado?name=Ana&email=a%40x.com")
        );

        let leads = json_body(send(&app, request("GET", "/api/v1/leads", Some(USER), None)).await).await;
        assert_eq!(leads["pagination"]["total"], 1);
        let lead = &leads["data"][0];
        assert_eq!(lead["data"], json!({ "fullName": "Ana", "email": "a@x.com" }));
        assert_eq!(lead["status"], "new");
        assert_eq!(lead["source_url"], "https://lp.exemplo.com/p/webinar-x");

        let csv = send(
            &app,
            request("GET", "/api/v1/leads/export.csv", Some(USER), None),
        )
        .await;
        assert_eq!(csv.status(), StatusCode::OK);
        assert_eq!(
            csv.headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/csv; charset=utf-8")
        );
        let csv = text_body(csv).await;
        assert!(csv.starts_with("\"name\",\"email\",\"phone\",\"project\",\"date\",\"status\""));
        assert!(csv.contains("\"Ana\",\"a@x.com\",\"\",\"Webinar X\","));

        let other = send(
            &app,
            request(
                "GET",
                "/api/v1/leads",
                Some("00000000-0000-4000-8000-000000000001"),
                None,
            ),
        )
        .await;
        assert_eq!(json_body(other).await["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn free_plan_allows_one_project() {
        let app = app();
        let first = send(
            &app,
            request(
                "POST",
                "/api/v1/projects",
                Some(USER),
                Some(json!({ "name": "Loja", "niche": "product" })),
            ),
        )
        .await;
        assert_eq!(first.status(), StatusCode::CREATED);

        let sub = json_body(send(&app, request("GET", "/api/v1/subscription", Some(USER), None)).await).await;
        assert_eq!(sub["plan"]["id"], "free");
        assert_eq!(sub["usage"]["projects"], 1);
        assert_eq!(sub["can_create_project"], false);

        let second = send(
            &app,
            request(
                "POST",
                "/api/v1/projects",
                Some(USER),
                Some(json!({ "name": "Outra", "niche": "service" })),
            ),
        )
        .await;
        assert_eq!(second.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(second).await["error"]["code"], 2201);
    }

    #[tokio::test]
    async fn editor_edits_undo_and_preview() {
        let app = app();
        let project = json_body(
            send(
                &app,
                request(
                    "POST",
                    "/api/v1/projects",
                    Some(USER),
                    Some(json!({ "name": "Curso Rust", "niche": "course" })),
                ),
            )
            .await,
        )
        .await;
        let Some(id) = project["id"].as_str() else {
            panic!("no id");
        };
        let base = format!("/api/v1/projects/{id}/editor");

        let opened = send(&app, request("POST", &base, Some(USER), None)).await;
        assert_eq!(opened.status(), StatusCode::OK);

        let edited = send(
            &app,
            request(
                "PATCH",
                &format!("{base}/tabs/content"),
                Some(USER),
                Some(json!({ "headline": "Aprenda Rust" })),
            ),
        )
        .await;
        assert_eq!(edited.status(), StatusCode::OK);
        let session = json_body(edited).await;
        assert_eq!(session["template_data"]["headline"], "Aprenda Rust");
        assert_eq!(session["can_undo"], true);

        let wrong_tab = send(
            &app,
            request(
                "PATCH",
                &format!("{base}/tabs/styles"),
                Some(USER),
                Some(json!({ "headline": "x" })),
            ),
        )
        .await;
        assert_eq!(wrong_tab.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let added = send(
            &app,
            request(
                "POST",
                &format!("{base}/collections/faqs"),
                Some(USER),
                Some(json!({ "question": "Tem certificado?", "answer": "Sim" })),
            ),
        )
        .await;
        assert_eq!(added.status(), StatusCode::CREATED);
        let added = json_body(added).await;
        let Some(item_id) = added["item_id"].as_str() else {
            panic!("no item id");
        };
        let removed = send(
            &app,
            request(
                "DELETE",
                &format!("{base}/collections/faqs/{item_id}"),
                Some(USER),
                None,
            ),
        )
        .await;
        assert_eq!(removed.status(), StatusCode::OK);

        let preview = send(
            &app,
            request("GET", &format!("{base}/preview?device=mobile"), Some(USER), None),
        )
        .await;
        assert_eq!(preview.status(), StatusCode::OK);
        assert!(text_body(preview).await.contains("390px"));

        let undone = json_body(send(&app, request("POST", &format!("{base}/undo"), Some(USER), None)).await).await;
        assert_eq!(undone["can_redo"], true);

        let saved = send(&app, request("POST", &format!("{base}/save"), Some(USER), None)).await;
        assert_eq!(saved.status(), StatusCode::OK);
        let saved = json_body(saved).await;
        assert_eq!(saved["version"]["version_number"], 1);
        assert_eq!(saved["session"]["dirty"], false);

        let versions = json_body(
            send(
                &app,
                request("GET", &format!("/api/v1/projects/{id}/versions"), Some(USER), None),
            )
            .await,
        )
        .await;
        assert_eq!(versions.as_array().map(Vec::len), Some(1));

        let closed = send(&app, request("DELETE", &base, Some(USER), None)).await;
        assert_eq!(closed.status(), StatusCode::OK);
        let gone = send(&app, request("GET", &base, Some(USER), None)).await;
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(gone).await["error"]["code"], 2004);
    }

    #[tokio::test]
    async fn published_slug_is_locked() {
        let app = app();
        let project = json_body(
            send(
                &app,
                request(
                    "POST",
                    "/api/v1/projects",
                    Some(USER),
                    Some(json!({ "name": "Agência", "niche": "service", "slug": "agencia-top" })),
                ),
            )
            .await,
        )
        .await;
        let Some(id) = project["id"].as_str() else {
            panic!("no id");
        };
        let published = send(
            &app,
            request("POST", &format!("/api/v1/projects/{id}/publish"), Some(USER), None),
        )
        .await;
        assert_eq!(published.status(), StatusCode::OK);

        let renamed = send(
            &app,
            request(
                "PATCH",
                &format!("/api/v1/projects/{id}"),
                Some(USER),
                Some(json!({ "slug": "outra" })),
            ),
        )
        .await;
        assert_eq!(renamed.status(), StatusCode::CONFLICT);

        let check = json_body(
            send(
                &app,
                request(
                    "GET",
                    "/api/v1/projects/slug-available?slug=agencia-top",
                    Some(USER),
                    None,
                ),
            )
            .await,
        )
        .await;
        assert_eq!(check["available"], false);

        let paused = send(
            &app,
            request("POST", &format!("/api/v1/projects/{id}/pause"), Some(USER), None),
        )
        .await;
        assert_eq!(paused.status(), StatusCode::OK);
        let page = send(&app, request("GET", "/p/agencia-top", None, None)).await;
        assert_eq!(page.status(), StatusCode::NOT_FOUND);
    }
}
