//! Pre-computed view models handed to the templates.
//!
//! Templates only print strings and test booleans; every decision (which
//! media to show, which inputs exist, which URLs are safe to link) is
//! made here.

use std::collections::HashMap;

use super::media::Media;
use crate::domain::funnel::StageLinks;
use crate::domain::template_data::{
    Benefit, CourseModule, Faq, FormField, FunnelStageConfig, ProcessStep, ScheduleItem,
    TemplateData, is_hex_color, is_link,
};
use crate::domain::{FunnelContext, FunnelStage, RendererKind};

/// Project facts a page needs besides its template data.
#[derive(Debug, Clone)]
pub struct PageContext<'a> {
    /// Project display name.
    pub name: &'a str,
    /// Project slug.
    pub slug: &'a str,
    /// Selected variant.
    pub renderer: RendererKind,
    /// Absolute URL of the landing page.
    pub canonical_url: String,
    /// Show the "made with" footer.
    pub branding: bool,
    /// Keep the page out of search engines (previews).
    pub noindex: bool,
}

/// State of the lead form on a (re-)rendered landing page.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    /// Values to put back into the inputs.
    pub values: HashMap<String, String>,
    /// Error shown above the form.
    pub error: Option<String>,
    /// The visitor just submitted successfully.
    pub submitted: bool,
}

impl FormState {
    /// Form re-shown after a rejected submission.
    #[must_use]
    pub const fn rejected(values: HashMap<String, String>, error: String) -> Self {
        Self {
            values,
            error: Some(error),
            submitted: false,
        }
    }
}

/// Returns `url` when it is safe to put in `href`/`src`, else an empty
/// string.
#[must_use]
pub fn safe_url(url: &str) -> String {
    let url = url.trim();
    if is_link(url) {
        url.to_string()
    } else {
        String::new()
    }
}

fn safe_color(value: &str, fallback: &str) -> String {
    if is_hex_color(value) {
        value.to_string()
    } else {
        fallback.to_string()
    }
}

fn pixel_id(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect()
}

/// Tracking pixel ids, already sanitized. Empty means "not configured".
#[derive(Debug, Clone, Default)]
pub struct Pixels {
    /// Meta pixel.
    pub facebook: String,
    /// Google Analytics (gtag).
    pub google_analytics: String,
    /// Google Tag Manager container.
    pub google_tag_manager: String,
    /// TikTok pixel.
    pub tiktok: String,
}

/// Everything around the page body.
#[derive(Debug, Clone)]
pub struct PageChrome {
    /// `<title>`.
    pub title: String,
    /// Meta description.
    pub description: String,
    /// Canonical link; empty to omit.
    pub canonical_url: String,
    /// Emit `noindex`.
    pub noindex: bool,
    /// Renderer marker on `<body>`.
    pub renderer: &'static str,
    /// Google Fonts `family=` parameter.
    pub font_param: String,
    /// CSS font stack.
    pub font_stack: String,
    /// Primary color.
    pub primary_color: String,
    /// Secondary color.
    pub secondary_color: String,
    /// Logo; empty to show the project name.
    pub logo_url: String,
    /// Project name.
    pub site_name: String,
    /// Tracking pixels.
    pub pixels: Pixels,
    /// Show the LGPD cookie banner.
    pub cookie_banner: bool,
    /// Cookie banner text.
    pub cookie_text: String,
    /// Show the "made with" footer.
    pub branding: bool,
}

impl PageChrome {
    /// Chrome of a project page.
    #[must_use]
    pub fn for_project(data: &TemplateData, ctx: &PageContext<'_>, title: &str) -> Self {
        let defaults = TemplateData::default().styles;
        let pixels = &data.integrations.pixels;
        Self {
            title: title.to_string(),
            description: data.subheadline.clone(),
            canonical_url: ctx.canonical_url.clone(),
            noindex: ctx.noindex,
            renderer: ctx.renderer.template_id(),
            font_param: data.styles.font_family.google_fonts_param(),
            font_stack: data.styles.font_family.css_stack(),
            primary_color: safe_color(&data.styles.primary_color, &defaults.primary_color),
            secondary_color: safe_color(&data.styles.secondary_color, &defaults.secondary_color),
            logo_url: safe_url(&data.logo_url),
            site_name: ctx.name.to_string(),
            pixels: Pixels {
                facebook: pixel_id(&pixels.facebook_pixel_id),
                google_analytics: pixel_id(&pixels.google_analytics_id),
                google_tag_manager: pixel_id(&pixels.google_tag_manager_id),
                tiktok: pixel_id(&pixels.tiktok_pixel_id),
            },
            cookie_banner: data.lgpd.cookie_banner,
            cookie_text: data.lgpd.cookie_text.clone(),
            branding: ctx.branding,
        }
    }

    /// Chrome of the platform's own pages (404, error).
    #[must_use]
    pub fn platform(title: &str) -> Self {
        let styles = TemplateData::default().styles;
        Self {
            title: title.to_string(),
            description: String::new(),
            canonical_url: String::new(),
            noindex: true,
            renderer: "platform",
            font_param: styles.font_family.google_fonts_param(),
            font_stack: styles.font_family.css_stack(),
            primary_color: styles.primary_color,
            secondary_color: styles.secondary_color,
            logo_url: String::new(),
            site_name: String::new(),
            pixels: Pixels::default(),
            cookie_banner: false,
            cookie_text: String::new(),
            branding: false,
        }
    }
}

/// One input of the lead form.
#[derive(Debug, Clone)]
pub struct FieldView {
    /// Input name (`fullName`, `email`, ...).
    pub key: &'static str,
    /// Label.
    pub label: &'static str,
    /// `type` attribute.
    pub input_type: &'static str,
    /// Rendered as `<textarea>`.
    pub is_textarea: bool,
    /// `required` attribute.
    pub required: bool,
    /// Previous value.
    pub value: String,
}

/// The lead form.
#[derive(Debug, Clone)]
pub struct FormView {
    /// POST target.
    pub action: String,
    /// Heading.
    pub title: String,
    /// Submit label.
    pub button_text: String,
    /// Inputs, exactly the enabled form fields.
    pub fields: Vec<FieldView>,
    /// Show the consent checkbox.
    pub consent: bool,
    /// Consent label.
    pub consent_text: String,
    /// Error message; empty when none.
    pub error: String,
    /// Success notice.
    pub submitted: bool,
}

impl FormView {
    fn build(data: &TemplateData, slug: &str, state: &FormState) -> Self {
        let fields = data
            .form_fields
            .enabled()
            .into_iter()
            .map(|field| FieldView {
                key: field.key(),
                label: field.label(),
                input_type: field.input_type(),
                is_textarea: field == FormField::Message,
                required: field.is_required(),
                value: state.values.get(field.key()).cloned().unwrap_or_default(),
            })
            .collect();
        Self {
            action: format!("/p/{slug}/leads"),
            title: data.form_title.clone(),
            button_text: data.form_button_text.clone(),
            fields,
            consent: data.lgpd.consent_checkbox,
            consent_text: data.lgpd.consent_text.clone(),
            error: state.error.clone().unwrap_or_default(),
            submitted: state.submitted,
        }
    }
}

/// Testimonial card.
#[derive(Debug, Clone)]
pub struct TestimonialView {
    /// Author.
    pub name: String,
    /// Author role.
    pub role: String,
    /// Quote.
    pub text: String,
    /// Avatar; empty for none.
    pub avatar_url: String,
    /// Rating as stars.
    pub stars: String,
}

/// Speaker card.
#[derive(Debug, Clone)]
pub struct SpeakerView {
    /// Name.
    pub name: String,
    /// Role.
    pub role: String,
    /// Bio.
    pub bio: String,
    /// Photo; empty for none.
    pub image_url: String,
}

/// Case study card.
#[derive(Debug, Clone)]
pub struct CaseStudyView {
    /// Client.
    pub client: String,
    /// Problem.
    pub challenge: String,
    /// Outcome.
    pub result: String,
    /// Image; empty for none.
    pub image_url: String,
}

/// Pricing tier card.
#[derive(Debug, Clone)]
pub struct TierView {
    /// Name.
    pub name: String,
    /// Price.
    pub price: String,
    /// Billing period.
    pub period: String,
    /// Feature bullets.
    pub features: Vec<String>,
    /// Emphasized tier.
    pub highlighted: bool,
    /// Button label.
    pub cta_text: String,
    /// Button target.
    pub href: String,
}

/// Event facts.
#[derive(Debug, Clone)]
pub struct EventView {
    /// Date.
    pub date: String,
    /// Time.
    pub time: String,
    /// Venue or platform.
    pub location: String,
    /// Online event.
    pub online: bool,
}

/// Course facts.
#[derive(Debug, Clone)]
pub struct CourseView {
    /// Duration.
    pub duration: String,
    /// Level.
    pub level: String,
    /// Instructor name; empty hides the block.
    pub instructor_name: String,
    /// Instructor bio.
    pub instructor_bio: String,
    /// Instructor photo.
    pub instructor_image_url: String,
}

/// Body of a landing page.
#[derive(Debug, Clone)]
pub struct LandingView {
    /// Main headline.
    pub headline: String,
    /// Sub-headline.
    pub subheadline: String,
    /// Hero button label.
    pub cta_text: String,
    /// Hero paragraph.
    pub hero_text: String,
    /// Hero media.
    pub hero: Media,
    /// About heading.
    pub about_title: String,
    /// About copy.
    pub about_text: String,
    /// About image.
    pub about_image_url: String,
    /// Price.
    pub price: String,
    /// Crossed-out price.
    pub original_price: String,
    /// Guarantee.
    pub guarantee_text: String,
    /// Urgency banner.
    pub urgency_text: String,
    /// Footer copy.
    pub footer_text: String,
    /// Terms.
    pub terms_text: String,
    /// Privacy policy.
    pub privacy_text: String,
    /// Checkout link for price boxes; falls back to the form anchor.
    pub checkout_href: String,
    /// Benefits.
    pub benefits: Vec<Benefit>,
    /// Testimonials.
    pub testimonials: Vec<TestimonialView>,
    /// FAQ.
    pub faqs: Vec<Faq>,
    /// Speakers.
    pub speakers: Vec<SpeakerView>,
    /// Course modules.
    pub modules: Vec<CourseModule>,
    /// Event schedule.
    pub schedule: Vec<ScheduleItem>,
    /// Case studies.
    pub case_studies: Vec<CaseStudyView>,
    /// Pricing tiers.
    pub pricing: Vec<TierView>,
    /// Process steps.
    pub process_steps: Vec<ProcessStep>,
    /// Event block.
    pub event: EventView,
    /// Course block.
    pub course: CourseView,
    /// Lead form.
    pub form: FormView,
}

const FORM_ANCHOR: &str = "#lead-form";

impl LandingView {
    /// Builds the page body.
    #[must_use]
    pub fn build(data: &TemplateData, ctx: &PageContext<'_>, state: &FormState) -> Self {
        let checkout_href = data
            .checkout_url()
            .map(safe_url)
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| FORM_ANCHOR.to_string());
        Self {
            headline: data.headline.clone(),
            subheadline: data.subheadline.clone(),
            cta_text: data.cta_text.clone(),
            hero_text: data.hero_text.clone(),
            hero: Media::select(
                &data.video_url,
                &data.hero_image_url,
                data.use_image_instead_of_video,
            ),
            about_title: data.about_title.clone(),
            about_text: data.about_text.clone(),
            about_image_url: safe_url(&data.about_image_url),
            price: data.price.clone(),
            original_price: data.original_price.clone(),
            guarantee_text: data.guarantee_text.clone(),
            urgency_text: data.urgency_text.clone(),
            footer_text: data.footer_text.clone(),
            terms_text: data.lgpd.terms_text.clone(),
            privacy_text: data.lgpd.privacy_text.clone(),
            benefits: data.benefits.clone(),
            testimonials: data
                .testimonials
                .iter()
                .map(|t| TestimonialView {
                    name: t.name.clone(),
                    role: t.role.clone(),
                    text: t.text.clone(),
                    avatar_url: safe_url(&t.avatar_url),
                    stars: "★".repeat(usize::from(t.rating.min(5))),
                })
                .collect(),
            faqs: data.faqs.clone(),
            speakers: data
                .speakers
                .iter()
                .map(|s| SpeakerView {
                    name: s.name.clone(),
                    role: s.role.clone(),
                    bio: s.bio.clone(),
                    image_url: safe_url(&s.image_url),
                })
                .collect(),
            modules: data.modules.clone(),
            schedule: data.schedule_items.clone(),
            case_studies: data
                .case_studies
                .iter()
                .map(|c| CaseStudyView {
                    client: c.client.clone(),
                    challenge: c.challenge.clone(),
                    result: c.result.clone(),
                    image_url: safe_url(&c.image_url),
                })
                .collect(),
            pricing: data
                .pricing_tiers
                .iter()
                .map(|tier| {
                    let own = safe_url(&tier.checkout_url);
                    TierView {
                        name: tier.name.clone(),
                        price: tier.price.clone(),
                        period: tier.period.clone(),
                        features: tier.features.clone(),
                        highlighted: tier.highlighted,
                        cta_text: if tier.cta_text.is_empty() {
                            data.cta_text.clone()
                        } else {
                            tier.cta_text.clone()
                        },
                        href: if own.is_empty() {
                            checkout_href.clone()
                        } else {
                            own
                        },
                    }
                })
                .collect(),
            checkout_href,
            process_steps: data.process_steps.clone(),
            event: EventView {
                date: data.event_date.clone(),
                time: data.event_time.clone(),
                location: data.event_location.clone(),
                online: data.event_is_online,
            },
            course: CourseView {
                duration: data.course_duration.clone(),
                level: data.course_level.clone(),
                instructor_name: data.instructor_name.clone(),
                instructor_bio: data.instructor_bio.clone(),
                instructor_image_url: safe_url(&data.instructor_image_url),
            },
            form: FormView::build(data, ctx.slug, state),
        }
    }
}

/// Body of a funnel stage page.
#[derive(Debug, Clone)]
pub struct StageView {
    /// `thank_you`, `upsell` or `downsell`.
    pub stage: &'static str,
    /// Greeting line; empty without a name.
    pub greeting: String,
    /// Headline.
    pub headline: String,
    /// Sub-headline.
    pub subheadline: String,
    /// Body copy.
    pub description: String,
    /// Offer media.
    pub media: Media,
    /// Offer price.
    pub price: String,
    /// Crossed-out price.
    pub original_price: String,
    /// Offer benefits.
    pub benefits: Vec<Benefit>,
    /// Primary button target; empty hides it.
    pub accept_url: String,
    /// Primary button label.
    pub accept_text: String,
    /// Decline link target; empty hides it.
    pub decline_url: String,
    /// Decline link label.
    pub decline_text: String,
    /// Checkout button target; empty hides it.
    pub checkout_url: String,
    /// Checkout button label.
    pub checkout_text: String,
}

impl StageView {
    /// Builds a stage page from its config and computed links.
    #[must_use]
    pub fn build(
        data: &TemplateData,
        stage: FunnelStage,
        links: &StageLinks,
        visitor: &FunnelContext,
    ) -> Self {
        let config: &FunnelStageConfig = stage.config(data);
        let greeting = visitor
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .and_then(|n| n.split_whitespace().next())
            .map(|first| format!("{first},"))
            .unwrap_or_default();
        let link = |url: &Option<String>| url.as_deref().map(safe_url).unwrap_or_default();
        let decline_text = if config.decline_text.is_empty() {
            "Não, obrigado".to_string()
        } else {
            config.decline_text.clone()
        };
        Self {
            stage: match stage {
                FunnelStage::ThankYou => "thank_you",
                FunnelStage::Upsell => "upsell",
                FunnelStage::Downsell => "downsell",
            },
            greeting,
            headline: config.headline.clone(),
            subheadline: config.subheadline.clone(),
            description: config.description.clone(),
            media: Media::select(&config.video_url, &config.image_url, false),
            price: config.price.clone(),
            original_price: config.original_price.clone(),
            benefits: config.benefits.clone(),
            accept_url: link(&links.accept),
            accept_text: config.cta_text.clone(),
            decline_url: link(&links.decline),
            decline_text,
            checkout_url: link(&links.checkout),
            checkout_text: data.cta_text.clone(),
        }
    }
}

/// Preview frame size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    /// Full width.
    #[default]
    Desktop,
    /// Phone-sized frame.
    Mobile,
}

impl Device {
    /// Class suffix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
        }
    }

    /// Frame width as CSS.
    #[must_use]
    pub const fn frame_width(self) -> &'static str {
        match self {
            Self::Desktop => "100%",
            Self::Mobile => "390px",
        }
    }
}
