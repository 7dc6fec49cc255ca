//! Public funnel pages served to visitors.
//!
//! Every handler here answers with HTML. Unknown, paused or disabled pages
//! render the 404 view; store and template failures render the generic
//! error page and are logged. JSON errors never reach a visitor.

use std::collections::HashMap;

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::app_state::AppState;
use crate::domain::{FunnelContext, FunnelStage, Project};
use crate::error::AppError;
use crate::render::{self, FormState};

/// Query string of the landing page.
#[derive(Debug, Default, Deserialize)]
struct LandingQuery {
    /// `1` after a capture that had nowhere else to go.
    #[serde(default)]
    enviado: Option<String>,
}

/// Parses a query string leniently; malformed input reads as empty.
fn lenient_query<T: DeserializeOwned + Default>(raw: Option<&str>) -> T {
    serde_urlencoded::from_str(raw.unwrap_or_default()).unwrap_or_default()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Html(render::not_found())).into_response()
}

fn failure(slug: &str, err: &AppError) -> Response {
    tracing::error!(%slug, code = err.error_code(), error = %err, "public page failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Html(render::error_page())).into_response()
}

/// Looks up the live project at `slug`, or the response to send instead.
async fn resolve(state: &AppState, slug: &str) -> Result<Project, Response> {
    match state.page_service.resolve(slug).await {
        Ok(Some(project)) => Ok(project),
        Ok(None) => {
            tracing::debug!(%slug, "public page not found");
            Err(not_found())
        }
        Err(err) => Err(failure(slug, &err)),
    }
}

/// `GET /p/{slug}` and the legacy `GET /{slug}`.
async fn landing(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    RawQuery(raw): RawQuery,
) -> Response {
    let project = match resolve(&state, &slug).await {
        Ok(project) => project,
        Err(response) => return response,
    };
    let query: LandingQuery = lenient_query(raw.as_deref());
    let form = FormState {
        submitted: query.enviado.as_deref() == Some("1"),
        ..FormState::default()
    };
    match state.page_service.landing(&project, &form).await {
        Ok(html) => Html(html).into_response(),
        Err(err) => failure(&slug, &err),
    }
}

/// Error shown when the submitted body cannot be read as a form.
const UNREADABLE_FORM: &str = "Não foi possível ler o formulário. Tente novamente.";

/// The landing page with a rejected form, as `422`.
async fn rerender(state: &AppState, project: &Project, form: &FormState) -> Response {
    match state.page_service.landing(project, form).await {
        Ok(html) => (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response(),
        Err(err) => failure(&project.slug, &err),
    }
}

/// `POST /p/{slug}/leads`: stores the lead and sends the visitor on.
///
/// A rejected submission re-renders the landing page with the typed
/// values and the error, answering `422`. A body that is not a form
/// gets the same treatment with empty inputs.
async fn submit_lead(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Response {
    let project = match resolve(&state, &slug).await {
        Ok(project) => project,
        Err(response) => return response,
    };
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::debug!(%slug, error = %rejection, "unreadable lead form");
            let rejected = FormState::rejected(HashMap::new(), UNREADABLE_FORM.to_string());
            return rerender(&state, &project, &rejected).await;
        }
    };
    let source_url = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map_or_else(
            || state.page_service.canonical_url(&project.slug),
            str::to_string,
        );

    match state.lead_service.capture(&project, &form, source_url).await {
        Ok(capture) => Redirect::to(&capture.redirect).into_response(),
        Err(AppError::Validation { field, message }) => {
            tracing::debug!(%slug, %field, "lead rejected");
            let rejected = FormState::rejected(form, message);
            rerender(&state, &project, &rejected).await
        }
        Err(err) => failure(&slug, &err),
    }
}

async fn stage_page(state: &AppState, slug: &str, raw: Option<&str>, stage: FunnelStage) -> Response {
    let project = match resolve(state, slug).await {
        Ok(project) => project,
        Err(response) => return response,
    };
    let visitor: FunnelContext = lenient_query(raw);
    match state.page_service.stage(&project, stage, &visitor).await {
        Ok(Some(html)) => Html(html).into_response(),
        Ok(None) => not_found(),
        Err(err) => failure(slug, &err),
    }
}

/// `GET /p/{slug}/obrigado`
async fn thank_you(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    RawQuery(raw): RawQuery,
) -> Response {
    stage_page(&state, &slug, raw.as_deref(), FunnelStage::ThankYou).await
}

/// `GET /p/{slug}/upsell`
async fn upsell(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    RawQuery(raw): RawQuery,
) -> Response {
    stage_page(&state, &slug, raw.as_deref(), FunnelStage::Upsell).await
}

/// `GET /p/{slug}/downsell`
async fn downsell(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    RawQuery(raw): RawQuery,
) -> Response {
    stage_page(&state, &slug, raw.as_deref(), FunnelStage::Downsell).await
}

/// Public routes, mounted at the root.
///
/// `/{slug}` only matches paths no other route claims.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/p/{slug}", get(landing))
        .route("/p/{slug}/leads", post(submit_lead))
        .route("/p/{slug}/obrigado", get(thank_you))
        .route("/p/{slug}/upsell", get(upsell))
        .route("/p/{slug}/downsell", get(downsell))
        .route("/{slug}", get(landing))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Map, Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::domain::{Niche, ProjectStatus, RendererKind, TemplateData, UserId};
    use crate::persistence::ProjectStore;
    use crate::persistence::memory::MemoryStore;

    async fn seeded(
        name: &str,
        slug: &str,
        niche: Niche,
        template_id: &str,
        patch: &Value,
    ) -> (Router, Arc<MemoryStore>, Project) {
        let store = Arc::new(MemoryStore::new());
        let renderer = RendererKind::resolve(niche, template_id);
        let Ok(data) = TemplateData::starter(niche, name).with_patch(patch) else {
            panic!("bad patch");
        };
        let project = Project::new(
            UserId::new(),
            name.to_string(),
            slug.to_string(),
            niche,
            renderer,
            &data,
        );
        let Ok(()) = store.insert_project(&project).await else {
            panic!("insert failed");
        };
        let state = AppState::new(
            AppConfig::default(),
            Arc::clone(&store) as Arc<dyn ProjectStore>,
        );
        (routes().with_state(state), store, project)
    }

    async fn body_text(response: Response) -> String {
        let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn get(uri: &str) -> Request<Body> {
        let Ok(request) = Request::get(uri).body(Body::empty()) else {
            panic!("bad request");
        };
        request
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        let Ok(request) = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
        else {
            panic!("bad request");
        };
        request
    }

    fn is_html(response: &Response) -> bool {
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/html"))
    }

    #[tokio::test]
    async fn unknown_slug_renders_html_not_found() {
        let (app, _store, _project) =
            seeded("Webinar X", "webinar-x", Niche::Event, "", &json!({})).await;
        let Ok(response) = app.oneshot(get("/p/nao-existe")).await else {
            panic!("request failed");
        };
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("404"));
    }

    #[tokio::test]
    async fn slug_selects_renderer_for_niche_and_variant() {
        let (app, _store, _project) = seeded(
            "Oferta",
            "oferta",
            Niche::Product,
            "product_vsl",
            &json!({}),
        )
        .await;
        let Ok(response) = app.clone().oneshot(get("/p/oferta")).await else {
            panic!("request failed");
        };
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("data-renderer=\"product_vsl\""));

        let Ok(legacy) = app.oneshot(get("/oferta")).await else {
            panic!("request failed");
        };
        assert_eq!(legacy.status(), StatusCode::OK);
        assert!(body_text(legacy).await.contains("data-renderer=\"product_vsl\""));
    }

    #[tokio::test]
    async fn paused_project_is_not_found() {
        let (app, store, mut project) =
            seeded("Curso", "curso", Niche::Course, "", &json!({})).await;
        project.status = ProjectStatus::Paused;
        let Ok(()) = store.update_project_meta(&project).await else {
            panic!("update failed");
        };
        let Ok(response) = app.oneshot(get("/p/curso")).await else {
            panic!("request failed");
        };
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn webinar_capture_end_to_end() {
        let (app, store, project) =
            seeded("Webinar X", "webinar-x", Niche::Event, "", &json!({})).await;

        let Ok(page) = app.clone().oneshot(get("/p/webinar-x")).await else {
            panic!("request failed");
        };
        assert_eq!(page.status(), StatusCode::OK);
        assert!(body_text(page).await.contains("action=\"/p/webinar-x/leads\""));

        let Ok(response) = app
            .clone()
            .oneshot(post_form(
                "/p/webinar-x/leads",
                "fullName=Ana&email=a%40x.com",
            ))
            .await
        else {
            panic!("request failed");
        };
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert_eq!(location, "/p/webinar-x/obrigado?name=Ana&email=a%40x.com");

        let Ok(leads) = store
            .list_leads(&crate::persistence::LeadFilter {
                owner_id: project.owner_id,
                project_id: Some(project.id),
                status: None,
            })
            .await
        else {
            panic!("list failed");
        };
        assert_eq!(leads.len(), 1);
        let Some(lead) = leads.first() else {
            panic!("no lead");
        };
        let mut expected = Map::new();
        expected.insert("fullName".into(), json!("Ana"));
        expected.insert("email".into(), json!("a@x.com"));
        assert_eq!(lead.data, expected);
        assert!(!lead.data.contains_key("status"));
        assert_eq!(lead.status(), crate::domain::LeadStatus::New);
        assert_eq!(lead.source_url, "http://localhost:3000/p/webinar-x");

        let Ok(thanks) = app.oneshot(get(&location)).await else {
            panic!("request failed");
        };
        assert_eq!(thanks.status(), StatusCode::OK);
        assert!(body_text(thanks).await.contains("Ana,"));
    }

    #[tokio::test]
    async fn invalid_submission_rerenders_with_values() {
        let (app, store, project) =
            seeded("Webinar X", "webinar-x", Niche::Event, "", &json!({})).await;
        let Ok(response) = app
            .oneshot(post_form("/p/webinar-x/leads", "fullName=Ana&email=semarroba"))
            .await
        else {
            panic!("request failed");
        };
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("value=\"semarroba\""));
        assert!(html.contains("e-mail válido"));

        let Ok(count) = store
            .list_leads(&crate::persistence::LeadFilter {
                owner_id: project.owner_id,
                project_id: None,
                status: None,
            })
            .await
            .map(|l| l.len())
        else {
            panic!("list failed");
        };
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn disabled_stage_is_not_found() {
        let (app, _store, _project) = seeded(
            "Oferta",
            "oferta",
            Niche::Product,
            "",
            &json!({ "upsellPage": { "enabled": false } }),
        )
        .await;
        let Ok(response) = app.oneshot(get("/p/oferta/upsell")).await else {
            panic!("request failed");
        };
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_stage_query_is_ignored() {
        let (app, _store, _project) =
            seeded("Webinar X", "webinar-x", Niche::Event, "", &json!({})).await;
        let Ok(response) = app
            .oneshot(get("/p/webinar-x/obrigado?from=nowhere"))
            .await
        else {
            panic!("request failed");
        };
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn non_form_body_answers_html() {
        let (app, store, project) =
            seeded("Webinar X", "webinar-x", Niche::Event, "", &json!({})).await;
        let plain = |uri: &str| {
            let Ok(request) = Request::post(uri)
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("fullName=Ana"))
            else {
                panic!("bad request");
            };
            request
        };

        let Ok(unknown) = app.clone().oneshot(plain("/p/nao-existe/leads")).await else {
            panic!("request failed");
        };
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        assert!(is_html(&unknown));

        let Ok(known) = app.oneshot(plain("/p/webinar-x/leads")).await else {
            panic!("request failed");
        };
        assert_eq!(known.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(is_html(&known));
        assert!(body_text(known).await.contains("Tente novamente"));

        let Ok(leads) = store
            .list_leads(&crate::persistence::LeadFilter {
                owner_id: project.owner_id,
                project_id: None,
                status: None,
            })
            .await
        else {
            panic!("list failed");
        };
        assert!(leads.is_empty());
    }
}
