//! The post-capture funnel as a small state machine.
//!
//! ```text
//! landing ──capture──▶ thank_you ──continue──▶ upsell ──accept──▶ thank_you
//!                          │                      └──decline──▶ downsell ──any──▶ thank_you
//!                          └──(upsell off)──▶ exit
//! ```
//!
//! A stage reached from upsell or downsell carries `from=` in its query
//! string, which ends the funnel at the following thank-you page instead
//! of looping back into the upsell.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::template_data::{CheckoutType, FormField, FunnelStageConfig, TemplateData};

/// A follow-up page after capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    /// Confirmation page.
    ThankYou,
    /// One-time offer.
    Upsell,
    /// Cheaper fallback offer.
    Downsell,
}

impl FunnelStage {
    /// Path segment under `/p/{slug}/`.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::ThankYou => "obrigado",
            Self::Upsell => "upsell",
            Self::Downsell => "downsell",
        }
    }

    /// Stage configuration inside the template.
    #[must_use]
    pub const fn config(self, data: &TemplateData) -> &FunnelStageConfig {
        match self {
            Self::ThankYou => &data.thank_you_page,
            Self::Upsell => &data.upsell_page,
            Self::Downsell => &data.downsell_page,
        }
    }

    /// Whether the stage is served.
    #[must_use]
    pub const fn is_enabled(self, data: &TemplateData) -> bool {
        self.config(data).enabled
    }
}

/// What the visitor clicked on a stage page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    /// Accept / continue.
    Accept,
    /// Decline.
    Decline,
}

/// Where a transition leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunnelStep {
    /// Another stage page.
    Stage(FunnelStage),
    /// Funnel finished; back to the landing page.
    Exit,
}

/// Visitor context carried between funnel pages in the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelContext {
    /// Lead name, for personalized copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Lead e-mail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Offer stage the visitor came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<FunnelStage>,
}

impl FunnelContext {
    /// Context right after capture, taken from the stored lead record.
    #[must_use]
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let get = |field: FormField| {
            record
                .get(field.key())
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Self {
            name: get(FormField::FullName),
            email: get(FormField::Email),
            from: None,
        }
    }

    /// Same visitor, arriving from `stage`.
    #[must_use]
    pub fn coming_from(&self, stage: FunnelStage) -> Self {
        Self {
            from: Some(stage),
            ..self.clone()
        }
    }

    /// URL-encoded query string without the leading `?`.
    #[must_use]
    pub fn to_query(&self) -> String {
        serde_urlencoded::to_string(self).unwrap_or_default()
    }
}

/// Pure transition function.
#[must_use]
pub fn next_step(
    data: &TemplateData,
    stage: FunnelStage,
    action: StageAction,
    from: Option<FunnelStage>,
) -> FunnelStep {
    let step = match (stage, action) {
        (FunnelStage::ThankYou, StageAction::Accept) => {
            if from.is_none() && data.upsell_page.enabled {
                FunnelStep::Stage(FunnelStage::Upsell)
            } else {
                FunnelStep::Exit
            }
        }
        (FunnelStage::ThankYou, StageAction::Decline) => FunnelStep::Exit,
        (FunnelStage::Upsell, StageAction::Accept) => FunnelStep::Stage(FunnelStage::ThankYou),
        (FunnelStage::Upsell, StageAction::Decline) => {
            if data.downsell_page.enabled {
                FunnelStep::Stage(FunnelStage::Downsell)
            } else {
                FunnelStep::Stage(FunnelStage::ThankYou)
            }
        }
        (FunnelStage::Downsell, _) => FunnelStep::Stage(FunnelStage::ThankYou),
    };
    match step {
        FunnelStep::Stage(next) if !next.is_enabled(data) => FunnelStep::Exit,
        other => other,
    }
}

/// Landing page path.
#[must_use]
pub fn landing_path(slug: &str) -> String {
    format!("/p/{slug}")
}

/// Stage page path, without query string.
#[must_use]
pub fn stage_path(slug: &str, stage: FunnelStage) -> String {
    format!("/p/{slug}/{}", stage.path_segment())
}

fn with_query(path: String, query: &str) -> String {
    if query.is_empty() {
        path
    } else {
        format!("{path}?{query}")
    }
}

fn step_url(slug: &str, step: FunnelStep, ctx: &FunnelContext) -> String {
    match step {
        FunnelStep::Stage(stage) => with_query(stage_path(slug, stage), &ctx.to_query()),
        FunnelStep::Exit => format!("{}?enviado=1", landing_path(slug)),
    }
}

/// Links shown on a stage page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageLinks {
    /// Primary button target.
    pub accept: Option<String>,
    /// Secondary link target.
    pub decline: Option<String>,
    /// Checkout button on thank-you pages of post-lead checkouts.
    pub checkout: Option<String>,
}

/// Computes the links for a stage page.
///
/// Offer stages accept into their own checkout when one is configured;
/// otherwise every link follows [`next_step`].
#[must_use]
pub fn stage_links(
    slug: &str,
    data: &TemplateData,
    stage: FunnelStage,
    ctx: &FunnelContext,
) -> StageLinks {
    match stage {
        FunnelStage::ThankYou => {
            let accept = match next_step(data, stage, StageAction::Accept, ctx.from) {
                FunnelStep::Exit => None,
                step => Some(step_url(slug, step, ctx)),
            };
            let checkout = (data.integrations.checkout.checkout_type == CheckoutType::PostLead)
                .then(|| data.checkout_url().map(str::to_string))
                .flatten();
            StageLinks {
                accept,
                decline: None,
                checkout,
            }
        }
        FunnelStage::Upsell | FunnelStage::Downsell => {
            let onward = ctx.coming_from(stage);
            let own_checkout = stage.config(data).checkout_url.trim();
            let accept = if own_checkout.is_empty() {
                step_url(slug, next_step(data, stage, StageAction::Accept, ctx.from), &onward)
            } else {
                own_checkout.to_string()
            };
            let decline =
                step_url(slug, next_step(data, stage, StageAction::Decline, ctx.from), &onward);
            StageLinks {
                accept: Some(accept),
                decline: Some(decline),
                checkout: None,
            }
        }
    }
}

/// Where a successful capture redirects.
///
/// Thank-you wins over checkout; checkout wins over returning to the
/// landing page.
#[must_use]
pub fn capture_redirect(slug: &str, data: &TemplateData, record: &Map<String, Value>) -> String {
    if data.thank_you_page.enabled {
        let ctx = FunnelContext::from_record(record);
        return with_query(stage_path(slug, FunnelStage::ThankYou), &ctx.to_query());
    }
    if let Some(url) = data.checkout_url() {
        return url.to_string();
    }
    format!("{}?enviado=1", landing_path(slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("fullName".into(), Value::String("Ana".into()));
        record.insert("email".into(), Value::String("a@x.com".into()));
        record
    }

    #[test]
    fn thank_you_wins_over_checkout() {
        let mut data = TemplateData::default();
        data.integrations.checkout.url = "https://pay.example/x".into();
        assert_eq!(
            capture_redirect("webinar-x", &data, &record()),
            "/p/webinar-x/obrigado?name=Ana&email=a%40x.com"
        );
    }

    #[test]
    fn checkout_alone_redirects_to_checkout() {
        let mut data = TemplateData::default();
        data.thank_you_page.enabled = false;
        data.integrations.checkout.url = "https://pay.example/x".into();
        assert_eq!(
            capture_redirect("s", &data, &record()),
            "https://pay.example/x"
        );
    }

    #[test]
    fn nothing_configured_returns_to_landing() {
        let mut data = TemplateData::default();
        data.thank_you_page.enabled = false;
        assert_eq!(capture_redirect("s", &data, &record()), "/p/s?enviado=1");
    }

    #[test]
    fn upsell_decline_goes_to_downsell_only_when_enabled() {
        let mut data = TemplateData::default();
        data.upsell_page.enabled = true;
        assert_eq!(
            next_step(&data, FunnelStage::Upsell, StageAction::Decline, None),
            FunnelStep::Stage(FunnelStage::ThankYou)
        );
        data.downsell_page.enabled = true;
        assert_eq!(
            next_step(&data, FunnelStage::Upsell, StageAction::Decline, None),
            FunnelStep::Stage(FunnelStage::Downsell)
        );
        assert_eq!(
            next_step(&data, FunnelStage::Downsell, StageAction::Decline, None),
            FunnelStep::Stage(FunnelStage::ThankYou)
        );
    }

    #[test]
    fn thank_you_after_offer_ends_funnel() {
        let mut data = TemplateData::default();
        data.upsell_page.enabled = true;
        assert_eq!(
            next_step(&data, FunnelStage::ThankYou, StageAction::Accept, None),
            FunnelStep::Stage(FunnelStage::Upsell)
        );
        assert_eq!(
            next_step(
                &data,
                FunnelStage::ThankYou,
                StageAction::Accept,
                Some(FunnelStage::Upsell)
            ),
            FunnelStep::Exit
        );
    }

    #[test]
    fn upsell_links_carry_origin() {
        let mut data = TemplateData::default();
        data.upsell_page.enabled = true;
        let ctx = FunnelContext {
            name: Some("Ana".into()),
            ..FunnelContext::default()
        };
        let links = stage_links("w", &data, FunnelStage::Upsell, &ctx);
        assert_eq!(
            links.accept.as_deref(),
            Some("/p/w/obrigado?name=Ana&from=upsell")
        );
        assert_eq!(links.decline, links.accept);

        data.upsell_page.checkout_url = "https://pay.example/up".into();
        let links = stage_links("w", &data, FunnelStage::Upsell, &ctx);
        assert_eq!(links.accept.as_deref(), Some("https://pay.example/up"));
    }

    #[test]
    fn post_lead_checkout_shows_on_thank_you() {
        let mut data = TemplateData::default();
        data.integrations.checkout.url = "https://pay.example/x".into();
        let ctx = FunnelContext::default();
        assert_eq!(
            stage_links("w", &data, FunnelStage::ThankYou, &ctx).checkout,
            None
        );
        data.integrations.checkout.checkout_type = CheckoutType::PostLead;
        assert_eq!(
            stage_links("w", &data, FunnelStage::ThankYou, &ctx)
                .checkout
                .as_deref(),
            Some("https://pay.example/x")
        );
    }
}
