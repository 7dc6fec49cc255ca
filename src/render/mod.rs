//! Server-side page rendering.
//!
//! Every public page is an askama template fed by a view model from
//! [`view`]. The landing page variant is chosen by [`RendererKind`]; the
//! funnel stages share one template.

pub mod media;
pub mod pages;
pub mod view;

use askama::Template;

use crate::domain::funnel::StageLinks;
use crate::domain::{FunnelContext, FunnelStage, RendererKind, TemplateData};
use crate::error::AppError;
use pages::{
    CoursePage, ErrorPage, EventPage, NotFoundPage, PreviewPage, ProductPage, ProductVslPage,
    ServicePage, StagePage,
};
pub use view::{Device, FormState, PageChrome, PageContext};
use view::{LandingView, StageView};

const FALLBACK_ERROR_HTML: &str = "<!DOCTYPE html><html lang=\"pt-BR\"><head><meta charset=\"utf-8\"><title>Erro</title></head><body><h1>Algo deu errado</h1></body></html>";

fn render<T: Template>(template: &T) -> Result<String, AppError> {
    template.render().map_err(|e| {
        tracing::error!(error = %e, "template rendering failed");
        AppError::Internal(format!("template rendering failed: {e}"))
    })
}

/// Renders a landing page with the project's variant.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if a template fails to render.
pub fn landing(
    data: &TemplateData,
    ctx: &PageContext<'_>,
    form: &FormState,
) -> Result<String, AppError> {
    let title = if data.headline.trim().is_empty() {
        ctx.name.to_string()
    } else {
        format!("{} | {}", data.headline, ctx.name)
    };
    let chrome = PageChrome::for_project(data, ctx, &title);
    let page = LandingView::build(data, ctx, form);
    let (chrome, page) = (&chrome, &page);
    match ctx.renderer {
        RendererKind::Product => render(&ProductPage { chrome, page }),
        RendererKind::ProductVsl => render(&ProductVslPage { chrome, page }),
        RendererKind::Service => render(&ServicePage { chrome, page }),
        RendererKind::Event => render(&EventPage { chrome, page }),
        RendererKind::Course => render(&CoursePage { chrome, page }),
    }
}

/// Renders a funnel stage page.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the template fails to render.
pub fn stage(
    data: &TemplateData,
    ctx: &PageContext<'_>,
    stage: FunnelStage,
    links: &StageLinks,
    visitor: &FunnelContext,
) -> Result<String, AppError> {
    let view = StageView::build(data, stage, links, visitor);
    let chrome = PageChrome::for_project(data, ctx, &format!("{} | {}", view.headline, ctx.name));
    render(&StagePage {
        chrome: &chrome,
        stage: &view,
    })
}

/// The 404 page. Never fails.
#[must_use]
pub fn not_found() -> String {
    let chrome = PageChrome::platform("Página não encontrada");
    render(&NotFoundPage { chrome: &chrome }).unwrap_or_else(|_| FALLBACK_ERROR_HTML.to_string())
}

/// The generic error page. Never fails.
#[must_use]
pub fn error_page() -> String {
    let chrome = PageChrome::platform("Erro");
    render(&ErrorPage { chrome: &chrome }).unwrap_or_else(|_| FALLBACK_ERROR_HTML.to_string())
}

/// Wraps a rendered page in the editor's device frame.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the template fails to render.
pub fn preview(title: &str, device: Device, page_html: &str) -> Result<String, AppError> {
    render(&PreviewPage {
        title,
        device: device.as_str(),
        width: device.frame_width(),
        page_html,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::Niche;
    use crate::domain::funnel::stage_links;
    use crate::domain::template_data::{Faq, Testimonial};

    fn ctx(renderer: RendererKind) -> PageContext<'static> {
        PageContext {
            name: "Webinar X",
            slug: "webinar-x",
            renderer,
            canonical_url: "http://localhost:3000/p/webinar-x".into(),
            branding: true,
            noindex: false,
        }
    }

    fn page(data: &TemplateData, renderer: RendererKind) -> String {
        let Ok(html) = landing(data, &ctx(renderer), &FormState::default()) else {
            panic!("render failed");
        };
        html
    }

    #[test]
    fn every_variant_renders_its_marker() {
        for niche in Niche::ALL {
            for renderer in niche.renderers() {
                let data = TemplateData::starter(niche, "Webinar X");
                let html = page(&data, *renderer);
                assert!(
                    html.contains(&format!("data-renderer=\"{}\"", renderer.template_id())),
                    "{renderer:?}"
                );
                assert!(html.contains("action=\"/p/webinar-x/leads\""));
            }
        }
    }

    #[test]
    fn form_inputs_follow_enabled_fields() {
        let mut data = TemplateData::default();
        let html = page(&data, RendererKind::Event);
        assert!(html.contains("name=\"fullName\""));
        assert!(html.contains("name=\"email\""));
        assert!(!html.contains("name=\"phone\""));
        assert!(!html.contains("name=\"message\""));

        data.form_fields.phone = true;
        data.form_fields.message = true;
        let html = page(&data, RendererKind::Event);
        assert!(html.contains("name=\"phone\""));
        assert!(html.contains("<textarea"));
        assert!(!html.contains("name=\"whatsapp\""));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let mut data = TemplateData::default();
        data.faqs.clear();
        data.testimonials.clear();
        let html = page(&data, RendererKind::Product);
        assert!(!html.contains("id=\"faq\""));
        assert!(!html.contains("id=\"testimonials\""));

        data.faqs.push(Faq {
            id: "f1".into(),
            question: "Tem certificado?".into(),
            answer: "Sim".into(),
        });
        data.testimonials.push(Testimonial {
            name: "Bia".into(),
            text: "Ótimo".into(),
            rating: 5,
            ..Testimonial::default()
        });
        let html = page(&data, RendererKind::Product);
        assert!(html.contains("id=\"faq\""));
        assert!(html.contains("Tem certificado?"));
        assert!(html.contains("★★★★★"));
    }

    #[test]
    fn consent_pixels_and_branding() {
        let mut data = TemplateData::default();
        assert!(!html_has_pixels(&page(&data, RendererKind::Service)));

        data.lgpd.consent_checkbox = true;
        data.integrations.pixels.facebook_pixel_id = "123456".into();
        data.integrations.pixels.google_analytics_id = "G-ABC<script>".into();
        let html = page(&data, RendererKind::Service);
        assert!(html.contains("name=\"consent\""));
        assert!(html.contains("fbq('init','123456')"));
        assert!(html.contains("G-ABCscript"));
        assert!(!html.contains("G-ABC<script>"));
        assert!(html.contains("class=\"branding\""));

        let mut unbranded = ctx(RendererKind::Service);
        unbranded.branding = false;
        let Ok(html) = landing(&data, &unbranded, &FormState::default()) else {
            panic!("render failed");
        };
        assert!(!html.contains("class=\"branding\""));
    }

    fn html_has_pixels(html: &str) -> bool {
        html.contains("fbq(") || html.contains("gtag(") || html.contains("ttq.")
    }

    #[test]
    fn user_text_is_escaped() {
        let data = TemplateData {
            headline: "<script>alert(1)</script>".into(),
            ..TemplateData::default()
        };
        let html = page(&data, RendererKind::Product);
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn rejected_form_keeps_values_and_shows_error() {
        let data = TemplateData::default();
        let mut values = HashMap::new();
        values.insert("fullName".to_string(), "Ana".to_string());
        let state = FormState::rejected(values, "Informe seu e-mail".into());
        let Ok(html) = landing(&data, &ctx(RendererKind::Event), &state) else {
            panic!("render failed");
        };
        assert!(html.contains("value=\"Ana\""));
        assert!(html.contains("Informe seu e-mail"));
    }

    #[test]
    fn youtube_hero_is_embedded() {
        let data = TemplateData {
            video_url: "https://youtu.be/dQw4w9WgXcQ".into(),
            ..TemplateData::default()
        };
        let html = page(&data, RendererKind::ProductVsl);
        assert!(html.contains("https://www.youtube.com/embed/dQw4w9WgXcQ"));
    }

    #[test]
    fn thank_you_shows_post_lead_checkout() {
        let mut data = TemplateData::default();
        data.integrations.checkout.checkout_type =
            crate::domain::template_data::CheckoutType::PostLead;
        data.integrations.checkout.url = "https://pay.example/x".into();
        let visitor = FunnelContext {
            name: Some("Ana Souza".into()),
            ..FunnelContext::default()
        };
        let links = stage_links("webinar-x", &data, FunnelStage::ThankYou, &visitor);
        let Ok(html) = stage(
            &data,
            &ctx(RendererKind::Event),
            FunnelStage::ThankYou,
            &links,
            &visitor,
        ) else {
            panic!("render failed");
        };
        assert!(html.contains("href=\"https://pay.example/x\""));
        assert!(html.contains("Ana,"));
    }

    #[test]
    fn platform_pages_and_preview() {
        assert!(not_found().contains("404"));
        assert!(error_page().contains("Algo deu errado"));
        let Ok(html) = preview("Webinar X", Device::Mobile, "<h1>Oi</h1>") else {
            panic!("preview failed");
        };
        assert!(html.contains("390px"));
        assert!(html.contains("srcdoc=\"&lt;h1&gt;Oi"));
    }
}
