//! askama template bindings. One struct per file under `templates/`.

use askama::Template;

use super::view::{LandingView, PageChrome, StageView};

/// Classic product page.
#[derive(Debug, Template)]
#[template(path = "landing/product.html")]
pub struct ProductPage<'a> {
    /// Surrounding chrome.
    pub chrome: &'a PageChrome,
    /// Body.
    pub page: &'a LandingView,
}

/// Product page led by a video sales letter.
#[derive(Debug, Template)]
#[template(path = "landing/product_vsl.html")]
pub struct ProductVslPage<'a> {
    /// Surrounding chrome.
    pub chrome: &'a PageChrome,
    /// Body.
    pub page: &'a LandingView,
}

/// Service page.
#[derive(Debug, Template)]
#[template(path = "landing/service.html")]
pub struct ServicePage<'a> {
    /// Surrounding chrome.
    pub chrome: &'a PageChrome,
    /// Body.
    pub page: &'a LandingView,
}

/// Event page.
#[derive(Debug, Template)]
#[template(path = "landing/event.html")]
pub struct EventPage<'a> {
    /// Surrounding chrome.
    pub chrome: &'a PageChrome,
    /// Body.
    pub page: &'a LandingView,
}

/// Course page.
#[derive(Debug, Template)]
#[template(path = "landing/course.html")]
pub struct CoursePage<'a> {
    /// Surrounding chrome.
    pub chrome: &'a PageChrome,
    /// Body.
    pub page: &'a LandingView,
}

/// Thank-you, upsell or downsell page.
#[derive(Debug, Template)]
#[template(path = "funnel/stage.html")]
pub struct StagePage<'a> {
    /// Surrounding chrome.
    pub chrome: &'a PageChrome,
    /// Body.
    pub stage: &'a StageView,
}

/// Unknown or unpublished page.
#[derive(Debug, Template)]
#[template(path = "not_found.html")]
pub struct NotFoundPage<'a> {
    /// Surrounding chrome.
    pub chrome: &'a PageChrome,
}

/// Generic failure page.
#[derive(Debug, Template)]
#[template(path = "error.html")]
pub struct ErrorPage<'a> {
    /// Surrounding chrome.
    pub chrome: &'a PageChrome,
}

/// Editor preview frame.
#[derive(Debug, Template)]
#[template(path = "preview.html")]
pub struct PreviewPage<'a> {
    /// Project name.
    pub title: &'a str,
    /// `desktop` or `mobile`.
    pub device: &'static str,
    /// Frame width.
    pub width: &'static str,
    /// Rendered landing page, embedded via `srcdoc`.
    pub page_html: &'a str,
}
