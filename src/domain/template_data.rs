//! The editable content document of a project.
//!
//! [`TemplateData`] is stored as an opaque JSON blob on the project row.
//! Older projects may carry only a subset of today's fields, so every read
//! goes through [`TemplateData::from_stored`], which deep-merges the stored
//! document over [`TemplateData::default`]. New fields therefore appear
//! automatically the next time a project loads; there are no migrations
//! for the blob itself.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::collection::{CollectionItem, ensure_item_ids};
use super::ids::new_item_id;
use super::niche::Niche;
use crate::error::AppError;

/// Schema version stamped on every normalized document.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ── Collection items ───────────────────────────────────────────────────

/// A benefit bullet (landing page or funnel stage).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Benefit {
    /// Stable item id.
    pub id: String,
    /// Short title.
    pub title: String,
    /// Supporting sentence.
    pub description: String,
    /// Optional icon name.
    pub icon: String,
}

/// A customer testimonial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Testimonial {
    /// Stable item id.
    pub id: String,
    /// Author name.
    pub name: String,
    /// Author role or city.
    pub role: String,
    /// Quote text.
    pub text: String,
    /// Author picture.
    pub avatar_url: String,
    /// Star rating from 1 to 5; 0 hides the stars.
    pub rating: u8,
}

/// A frequently asked question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Faq {
    /// Stable item id.
    pub id: String,
    /// Question.
    pub question: String,
    /// Answer.
    pub answer: String,
}

/// An event speaker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Speaker {
    /// Stable item id.
    pub id: String,
    /// Speaker name.
    pub name: String,
    /// Title / company.
    pub role: String,
    /// Short bio.
    pub bio: String,
    /// Portrait.
    pub image_url: String,
}

/// A course module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseModule {
    /// Stable item id.
    pub id: String,
    /// Module title.
    pub title: String,
    /// What the module covers.
    pub description: String,
    /// Number of lessons.
    pub lessons: u32,
}

/// An event agenda slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleItem {
    /// Stable item id.
    pub id: String,
    /// Start time as displayed (e.g. `19:00`).
    pub time: String,
    /// Slot title.
    pub title: String,
    /// Slot description.
    pub description: String,
}

/// A service case study.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaseStudy {
    /// Stable item id.
    pub id: String,
    /// Client name.
    pub client: String,
    /// Problem the client had.
    pub challenge: String,
    /// Outcome delivered.
    pub result: String,
    /// Illustration.
    pub image_url: String,
}

/// A pricing tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingTier {
    /// Stable item id.
    pub id: String,
    /// Tier name.
    pub name: String,
    /// Price as displayed.
    pub price: String,
    /// Billing period label (e.g. `/mês`).
    pub period: String,
    /// Feature lines.
    pub features: Vec<String>,
    /// Visually emphasized tier.
    pub highlighted: bool,
    /// Button label.
    pub cta_text: String,
    /// Tier-specific checkout; falls back to the page checkout.
    pub checkout_url: String,
}

/// A step of a service's working process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessStep {
    /// Stable item id.
    pub id: String,
    /// Step title.
    pub title: String,
    /// Step description.
    pub description: String,
}

macro_rules! collection_items {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CollectionItem for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn set_id(&mut self, id: String) {
                    self.id = id;
                }
            }
        )*
    };
}

collection_items!(
    Benefit,
    Testimonial,
    Faq,
    Speaker,
    CourseModule,
    ScheduleItem,
    CaseStudy,
    PricingTier,
    ProcessStep,
);

// ── Nested configuration blocks ────────────────────────────────────────

/// Font families offered by the style editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFamily {
    /// Inter.
    #[default]
    Inter,
    /// Poppins.
    Poppins,
    /// Montserrat.
    Montserrat,
    /// Roboto.
    Roboto,
    /// Open Sans.
    OpenSans,
    /// Playfair Display.
    Playfair,
}

impl FontFamily {
    /// Font family name as used by Google Fonts.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Inter => "Inter",
            Self::Poppins => "Poppins",
            Self::Montserrat => "Montserrat",
            Self::Roboto => "Roboto",
            Self::OpenSans => "Open Sans",
            Self::Playfair => "Playfair Display",
        }
    }

    /// `family=` parameter for the Google Fonts stylesheet URL.
    #[must_use]
    pub fn google_fonts_param(self) -> String {
        format!("{}:wght@400;600;700", self.display_name().replace(' ', "+"))
    }

    /// CSS `font-family` value with a generic fallback.
    #[must_use]
    pub fn css_stack(self) -> String {
        let generic = match self {
            Self::Playfair => "serif",
            _ => "sans-serif",
        };
        format!("'{}', {generic}", self.display_name())
    }
}

/// Colors and typography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Styles {
    /// Main brand color (`#rrggbb`).
    pub primary_color: String,
    /// Accent color (`#rrggbb`).
    pub secondary_color: String,
    /// Page font.
    pub font_family: FontFamily,
}

impl Default for Styles {
    fn default() -> Self {
        Self {
            primary_color: "#6366f1".to_string(),
            secondary_color: "#8b5cf6".to_string(),
            font_family: FontFamily::Inter,
        }
    }
}

/// Lead form fields that can be collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    /// Full name (always collected).
    FullName,
    /// E-mail (always collected).
    Email,
    /// Phone number.
    Phone,
    /// WhatsApp number.
    Whatsapp,
    /// Company name.
    Company,
    /// Free-form message.
    Message,
}

impl FormField {
    /// Every field, in display order.
    pub const ALL: [Self; 6] = [
        Self::FullName,
        Self::Email,
        Self::Phone,
        Self::Whatsapp,
        Self::Company,
        Self::Message,
    ];

    /// JSON key used in the form and in the lead's `data` map.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::FullName => "fullName",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Whatsapp => "whatsapp",
            Self::Company => "company",
            Self::Message => "message",
        }
    }

    /// Input label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FullName => "Nome completo",
            Self::Email => "E-mail",
            Self::Phone => "Telefone",
            Self::Whatsapp => "WhatsApp",
            Self::Company => "Empresa",
            Self::Message => "Mensagem",
        }
    }

    /// HTML input type; `textarea` renders a text area.
    #[must_use]
    pub const fn input_type(self) -> &'static str {
        match self {
            Self::FullName | Self::Company => "text",
            Self::Email => "email",
            Self::Phone | Self::Whatsapp => "tel",
            Self::Message => "textarea",
        }
    }

    /// Whether the field may never be switched off.
    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(self, Self::FullName | Self::Email)
    }
}

/// Which lead fields the public form collects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormFields {
    /// Always `true` after normalization.
    pub full_name: bool,
    /// Always `true` after normalization.
    pub email: bool,
    /// Collect phone.
    pub phone: bool,
    /// Collect WhatsApp.
    pub whatsapp: bool,
    /// Collect company.
    pub company: bool,
    /// Collect message.
    pub message: bool,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            full_name: true,
            email: true,
            phone: false,
            whatsapp: false,
            company: false,
            message: false,
        }
    }
}

impl FormFields {
    /// Returns whether `field` is collected.
    #[must_use]
    pub const fn is_enabled(&self, field: FormField) -> bool {
        match field {
            FormField::FullName => self.full_name,
            FormField::Email => self.email,
            FormField::Phone => self.phone,
            FormField::Whatsapp => self.whatsapp,
            FormField::Company => self.company,
            FormField::Message => self.message,
        }
    }

    /// Collected fields, in display order.
    #[must_use]
    pub fn enabled(&self) -> Vec<FormField> {
        FormField::ALL
            .into_iter()
            .filter(|field| self.is_enabled(*field))
            .collect()
    }
}

/// How the checkout relates to lead capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutType {
    /// The visitor pays right away; the form is a pre-checkout step.
    #[default]
    Direct,
    /// Capture the lead first, offer checkout on the thank-you page.
    PostLead,
}

/// External checkout configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutConfig {
    /// Checkout flow.
    #[serde(rename = "type")]
    pub checkout_type: CheckoutType,
    /// Payment page URL; empty when not configured.
    pub url: String,
}

/// Where captured leads are forwarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadDestination {
    /// Webhook receiving each lead as JSON.
    pub webhook_url: String,
    /// Notification e-mail.
    pub email: String,
}

/// Tracking pixel identifiers. Empty strings disable a pixel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackingPixels {
    /// Meta/Facebook pixel.
    pub facebook_pixel_id: String,
    /// Google Analytics measurement id.
    pub google_analytics_id: String,
    /// Google Tag Manager container id.
    pub google_tag_manager_id: String,
    /// TikTok pixel.
    pub tiktok_pixel_id: String,
}

/// Third-party integrations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Integrations {
    /// Checkout.
    pub checkout: CheckoutConfig,
    /// Lead forwarding.
    pub lead_destination: LeadDestination,
    /// Tracking pixels.
    pub pixels: TrackingPixels,
}

/// LGPD consent and legal texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Lgpd {
    /// Show the cookie banner.
    pub cookie_banner: bool,
    /// Banner text.
    pub cookie_text: String,
    /// Terms of use.
    pub terms_text: String,
    /// Privacy policy.
    pub privacy_text: String,
    /// Require an explicit consent checkbox on the lead form.
    pub consent_checkbox: bool,
    /// Consent checkbox label.
    pub consent_text: String,
}

impl Default for Lgpd {
    fn default() -> Self {
        Self {
            cookie_banner: true,
            cookie_text: "Usamos cookies para melhorar sua experiência. Ao continuar navegando, você concorda com nossa política de privacidade.".to_string(),
            terms_text: String::new(),
            privacy_text: String::new(),
            consent_checkbox: false,
            consent_text: "Concordo em receber comunicações e com a política de privacidade.".to_string(),
        }
    }
}

/// Configuration of one funnel follow-up stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FunnelStageConfig {
    /// Whether the stage is part of the funnel.
    pub enabled: bool,
    /// Headline.
    pub headline: String,
    /// Sub-headline.
    pub subheadline: String,
    /// Body copy.
    pub description: String,
    /// Accept button label.
    pub cta_text: String,
    /// Decline link label.
    pub decline_text: String,
    /// Offer checkout; empty when the stage has no paid offer.
    pub checkout_url: String,
    /// Offer price as displayed.
    pub price: String,
    /// Crossed-out price.
    pub original_price: String,
    /// Offer video.
    pub video_url: String,
    /// Offer image.
    pub image_url: String,
    /// Offer benefits.
    pub benefits: Vec<Benefit>,
}

impl FunnelStageConfig {
    fn thank_you() -> Self {
        Self {
            enabled: true,
            headline: "Obrigado! Seu cadastro foi confirmado.".to_string(),
            subheadline: "Enviamos os próximos passos para o seu e-mail.".to_string(),
            description: String::new(),
            cta_text: "Continuar".to_string(),
            decline_text: String::new(),
            ..Self::default()
        }
    }

    fn upsell() -> Self {
        Self {
            enabled: false,
            headline: "Espere! Temos uma oferta especial para você".to_string(),
            subheadline: "Disponível apenas nesta página.".to_string(),
            cta_text: "Sim, quero aproveitar".to_string(),
            decline_text: "Não, obrigado".to_string(),
            ..Self::default()
        }
    }

    fn downsell() -> Self {
        Self {
            enabled: false,
            headline: "Última chance: condição exclusiva".to_string(),
            subheadline: "Uma alternativa mais acessível para você começar.".to_string(),
            cta_text: "Quero esta condição".to_string(),
            decline_text: "Não, prefiro seguir sem a oferta".to_string(),
            ..Self::default()
        }
    }
}

// ── The document ───────────────────────────────────────────────────────

/// Everything the editor can change about a project's pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateData {
    /// Schema version of this document.
    pub schema_version: u32,

    /// Hero headline.
    pub headline: String,
    /// Hero sub-headline.
    pub subheadline: String,
    /// Primary call-to-action label.
    pub cta_text: String,
    /// Hero paragraph.
    pub hero_text: String,
    /// Logo image.
    pub logo_url: String,
    /// Hero image.
    pub hero_image_url: String,
    /// Hero video (YouTube, Vimeo or direct file).
    pub video_url: String,
    /// Show the hero image even when a video is configured.
    pub use_image_instead_of_video: bool,
    /// About section title.
    pub about_title: String,
    /// About section text.
    pub about_text: String,
    /// About section image.
    pub about_image_url: String,
    /// Offer price as displayed.
    pub price: String,
    /// Crossed-out price.
    pub original_price: String,
    /// Guarantee seal text.
    pub guarantee_text: String,
    /// Scarcity / urgency text.
    pub urgency_text: String,
    /// Footer text.
    pub footer_text: String,

    /// Benefits section.
    pub benefits: Vec<Benefit>,
    /// Testimonials section.
    pub testimonials: Vec<Testimonial>,
    /// FAQ section.
    pub faqs: Vec<Faq>,
    /// Event speakers.
    pub speakers: Vec<Speaker>,
    /// Course modules.
    pub modules: Vec<CourseModule>,
    /// Event agenda.
    pub schedule_items: Vec<ScheduleItem>,
    /// Service case studies.
    pub case_studies: Vec<CaseStudy>,
    /// Pricing tiers.
    pub pricing_tiers: Vec<PricingTier>,
    /// Service process steps.
    pub process_steps: Vec<ProcessStep>,

    /// Event date as displayed.
    pub event_date: String,
    /// Event time as displayed.
    pub event_time: String,
    /// Venue or streaming platform.
    pub event_location: String,
    /// Online event.
    pub event_is_online: bool,

    /// Total course duration.
    pub course_duration: String,
    /// Course level.
    pub course_level: String,
    /// Instructor name.
    pub instructor_name: String,
    /// Instructor bio.
    pub instructor_bio: String,
    /// Instructor picture.
    pub instructor_image_url: String,

    /// Colors and typography.
    pub styles: Styles,
    /// Collected lead fields.
    pub form_fields: FormFields,
    /// Form heading.
    pub form_title: String,
    /// Form submit label.
    pub form_button_text: String,
    /// Integrations.
    pub integrations: Integrations,
    /// Consent and legal texts.
    pub lgpd: Lgpd,

    /// Thank-you stage.
    pub thank_you_page: FunnelStageConfig,
    /// Upsell stage.
    pub upsell_page: FunnelStageConfig,
    /// Downsell stage.
    pub downsell_page: FunnelStageConfig,
}

impl Default for TemplateData {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            headline: "Transforme seus resultados a partir de hoje".to_string(),
            subheadline: "Descubra como dar o próximo passo com segurança.".to_string(),
            cta_text: "Quero saber mais".to_string(),
            hero_text: String::new(),
            logo_url: String::new(),
            hero_image_url: String::new(),
            video_url: String::new(),
            use_image_instead_of_video: false,
            about_title: String::new(),
            about_text: String::new(),
            about_image_url: String::new(),
            price: String::new(),
            original_price: String::new(),
            guarantee_text: String::new(),
            urgency_text: String::new(),
            footer_text: String::new(),
            benefits: Vec::new(),
            testimonials: Vec::new(),
            faqs: Vec::new(),
            speakers: Vec::new(),
            modules: Vec::new(),
            schedule_items: Vec::new(),
            case_studies: Vec::new(),
            pricing_tiers: Vec::new(),
            process_steps: Vec::new(),
            event_date: String::new(),
            event_time: String::new(),
            event_location: String::new(),
            event_is_online: true,
            course_duration: String::new(),
            course_level: String::new(),
            instructor_name: String::new(),
            instructor_bio: String::new(),
            instructor_image_url: String::new(),
            styles: Styles::default(),
            form_fields: FormFields::default(),
            form_title: "Preencha seus dados".to_string(),
            form_button_text: "Quero garantir minha vaga".to_string(),
            integrations: Integrations::default(),
            lgpd: Lgpd::default(),
            thank_you_page: FunnelStageConfig::thank_you(),
            upsell_page: FunnelStageConfig::upsell(),
            downsell_page: FunnelStageConfig::downsell(),
        }
    }
}

impl TemplateData {
    /// Builds a complete, renderer-safe document from a stored blob.
    ///
    /// The stored value is deep-merged over the defaults: objects merge
    /// key by key at every level, arrays and scalars replace, `null`
    /// keeps the default. A field whose stored value has the wrong shape
    /// is dropped (and logged) instead of failing the whole document.
    /// Non-object input yields the defaults. The result is normalized
    /// (see [`TemplateData::normalize`]).
    #[must_use]
    pub fn from_stored(stored: &Value) -> Self {
        let Some(fields) = stored.as_object() else {
            return Self::default();
        };
        let base = Self::default().to_value();

        let mut merged = base.clone();
        merge_json(&mut merged, stored);
        let mut data = match serde_json::from_value::<Self>(merged) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(error = %err, "stored template data is malformed, merging field by field");
                let mut accepted = base;
                accept_fields(&mut accepted, &[], fields);
                serde_json::from_value(accepted).unwrap_or_default()
            }
        };
        data.normalize();
        data
    }

    /// Returns a copy with `patch` deep-merged in.
    ///
    /// Unlike [`TemplateData::from_stored`] this is strict: editor input
    /// with the wrong shape is rejected rather than silently dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidRequest`] if `patch` is not an object or
    /// the merged document does not match the schema.
    pub fn with_patch(&self, patch: &Value) -> Result<Self, AppError> {
        if !patch.is_object() {
            return Err(AppError::InvalidRequest(
                "template patch must be a JSON object".to_string(),
            ));
        }
        let mut merged = self.to_value();
        merge_json(&mut merged, patch);
        let mut next: Self = serde_json::from_value(merged)
            .map_err(|e| AppError::InvalidRequest(format!("invalid template data: {e}")))?;
        next.normalize();
        Ok(next)
    }

    /// Enforces document invariants: required form fields on, every
    /// collection item carrying a unique non-empty id, current schema
    /// version.
    pub fn normalize(&mut self) {
        self.schema_version = CURRENT_SCHEMA_VERSION;
        self.form_fields.full_name = true;
        self.form_fields.email = true;

        ensure_item_ids(&mut self.benefits);
        ensure_item_ids(&mut self.testimonials);
        ensure_item_ids(&mut self.faqs);
        ensure_item_ids(&mut self.speakers);
        ensure_item_ids(&mut self.modules);
        ensure_item_ids(&mut self.schedule_items);
        ensure_item_ids(&mut self.case_studies);
        ensure_item_ids(&mut self.pricing_tiers);
        ensure_item_ids(&mut self.process_steps);
        ensure_item_ids(&mut self.thank_you_page.benefits);
        ensure_item_ids(&mut self.upsell_page.benefits);
        ensure_item_ids(&mut self.downsell_page.benefits);
    }

    /// Serializes the document to JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Configured page checkout URL, if any.
    #[must_use]
    pub fn checkout_url(&self) -> Option<&str> {
        let url = self.integrations.checkout.url.trim();
        (!url.is_empty()).then_some(url)
    }

    /// Starter content for a new project of the given niche.
    #[must_use]
    pub fn starter(niche: Niche, project_name: &str) -> Self {
        let mut data = Self {
            headline: project_name.to_string(),
            ..Self::default()
        };

        data.faqs = vec![Faq {
            id: new_item_id(),
            question: "Como recebo o acesso?".to_string(),
            answer: "Logo após a confirmação você recebe tudo por e-mail.".to_string(),
        }];

        match niche {
            Niche::Product => {
                data.subheadline = "A solução que você estava procurando.".to_string();
                data.cta_text = "Comprar agora".to_string();
                data.form_button_text = "Quero o meu".to_string();
                data.price = "R$ 97,00".to_string();
                data.guarantee_text = "Garantia incondicional de 7 dias".to_string();
                data.benefits = vec![
                    benefit("Resultado rápido", "Veja a diferença já na primeira semana."),
                    benefit("Suporte dedicado", "Tire suas dúvidas com nossa equipe."),
                    benefit("Compra segura", "Pagamento protegido e garantia total."),
                ];
            }
            Niche::Service => {
                data.subheadline = "Soluções sob medida para o seu negócio.".to_string();
                data.cta_text = "Solicitar orçamento".to_string();
                data.form_title = "Fale com um especialista".to_string();
                data.form_button_text = "Solicitar contato".to_string();
                data.form_fields.phone = true;
                data.form_fields.message = true;
                data.process_steps = vec![
                    step("Diagnóstico", "Entendemos o seu cenário e objetivos."),
                    step("Plano de ação", "Desenhamos a estratégia ideal."),
                    step("Execução", "Colocamos tudo em prática com acompanhamento."),
                ];
            }
            Niche::Event => {
                data.subheadline = "Garanta sua vaga gratuitamente.".to_string();
                data.cta_text = "Quero participar".to_string();
                data.form_title = "Inscreva-se".to_string();
                data.form_button_text = "Garantir minha vaga".to_string();
                data.event_location = "Online, ao vivo".to_string();
                data.schedule_items = vec![ScheduleItem {
                    id: new_item_id(),
                    time: "19:00".to_string(),
                    title: "Abertura".to_string(),
                    description: String::new(),
                }];
            }
            Niche::Course => {
                data.subheadline = "Aprenda no seu ritmo, com acesso vitalício.".to_string();
                data.cta_text = "Quero me matricular".to_string();
                data.form_title = "Receba a grade completa".to_string();
                data.form_button_text = "Quero me matricular".to_string();
                data.course_level = "Iniciante".to_string();
                data.modules = vec![CourseModule {
                    id: new_item_id(),
                    title: "Módulo 1: Fundamentos".to_string(),
                    description: "Os conceitos essenciais para começar.".to_string(),
                    lessons: 5,
                }];
            }
        }

        data.normalize();
        data
    }
}

fn benefit(title: &str, description: &str) -> Benefit {
    Benefit {
        id: new_item_id(),
        title: title.to_string(),
        description: description.to_string(),
        icon: String::new(),
    }
}

fn step(title: &str, description: &str) -> ProcessStep {
    ProcessStep {
        id: new_item_id(),
        title: title.to_string(),
        description: description.to_string(),
    }
}

// ── Value rules ────────────────────────────────────────────────────────

/// `#rgb` or `#rrggbb`.
#[must_use]
pub fn is_hex_color(value: &str) -> bool {
    value.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}

/// Absolute `http(s)` URL or a root-relative path (uploaded media).
#[must_use]
pub fn is_link(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(host) => !host.is_empty() && !host.contains(char::is_whitespace),
        None => value.starts_with('/') && !value.starts_with("//"),
    }
}

// ── JSON merge helpers ─────────────────────────────────────────────────

/// Deep-merges `patch` into `target`.
///
/// Objects merge key by key, recursively. Arrays and scalars replace.
/// `null` values in `patch` are ignored so they never erase a default.
pub fn merge_json(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    continue;
                }
                let both_objects =
                    value.is_object() && target.get(key).is_some_and(Value::is_object);
                if both_objects {
                    if let Some(existing) = target.get_mut(key) {
                        merge_json(existing, value);
                    }
                } else {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        (target, patch) => {
            if !patch.is_null() {
                *target = patch.clone();
            }
        }
    }
}

/// Merges `fields` (located at `prefix` inside `root`) one key at a time,
/// keeping each key only if the whole document still deserializes. A
/// rejected object is retried child by child so one bad leaf does not
/// discard its valid siblings.
fn accept_fields(root: &mut Value, prefix: &[String], fields: &Map<String, Value>) {
    for (key, value) in fields {
        if value.is_null() {
            continue;
        }
        let mut path = prefix.to_vec();
        path.push(key.clone());

        let mut candidate = root.clone();
        if let Some(slot) = slot_mut(&mut candidate, &path) {
            merge_json(slot, value);
        }
        if serde_json::from_value::<TemplateData>(candidate.clone()).is_ok() {
            *root = candidate;
            continue;
        }

        if let Some(children) = value.as_object()
            && root.pointer(&json_pointer(&path)).is_some_and(Value::is_object)
        {
            accept_fields(root, &path, children);
            continue;
        }

        tracing::warn!(field = %path.join("."), "discarding malformed template field");
    }
}

/// Returns the value at `path`, creating a `null` leaf under an existing
/// parent object when missing.
fn slot_mut<'a>(root: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    let (last, parents) = path.split_last()?;
    let mut node = root;
    for segment in parents {
        node = node.as_object_mut()?.get_mut(segment)?;
    }
    Some(
        node.as_object_mut()?
            .entry(last.clone())
            .or_insert(Value::Null),
    )
}

fn json_pointer(path: &[String]) -> String {
    path.iter().fold(String::new(), |mut acc, segment| {
        acc.push('/');
        acc.push_str(&segment.replace('~', "~0").replace('/', "~1"));
        acc
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let data = TemplateData::from_stored(&json!({}));
        assert_eq!(data, TemplateData::default());
    }

    #[test]
    fn non_object_yields_defaults() {
        assert_eq!(TemplateData::from_stored(&Value::Null), TemplateData::default());
        assert_eq!(
            TemplateData::from_stored(&json!(["not", "a", "document"])),
            TemplateData::default()
        );
    }

    #[test]
    fn top_level_fields_override_defaults() {
        let data = TemplateData::from_stored(&json!({
            "headline": "Webinar X",
            "eventIsOnline": false,
        }));
        assert_eq!(data.headline, "Webinar X");
        assert!(!data.event_is_online);
        assert_eq!(data.cta_text, TemplateData::default().cta_text);
    }

    #[test]
    fn nested_partial_keeps_sibling_defaults() {
        let data = TemplateData::from_stored(&json!({
            "styles": { "primaryColor": "#000000" },
            "integrations": { "checkout": { "url": "https://pay.example/x" } },
            "thankYouPage": { "headline": "Valeu!" },
            "lgpd": { "consentCheckbox": true },
        }));
        let defaults = TemplateData::default();

        assert_eq!(data.styles.primary_color, "#000000");
        assert_eq!(data.styles.font_family, defaults.styles.font_family);
        assert_eq!(data.styles.secondary_color, defaults.styles.secondary_color);

        assert_eq!(data.integrations.checkout.url, "https://pay.example/x");
        assert_eq!(data.integrations.checkout.checkout_type, CheckoutType::Direct);
        assert_eq!(data.integrations.pixels, defaults.integrations.pixels);

        assert_eq!(data.thank_you_page.headline, "Valeu!");
        assert!(data.thank_you_page.enabled);
        assert_eq!(data.thank_you_page.cta_text, defaults.thank_you_page.cta_text);

        assert!(data.lgpd.consent_checkbox);
        assert_eq!(data.lgpd.cookie_text, defaults.lgpd.cookie_text);
    }

    #[test]
    fn every_nested_block_merges_independently() {
        let blocks = [
            ("styles", json!({ "secondaryColor": "#111111" })),
            ("formFields", json!({ "phone": true })),
            ("integrations", json!({ "pixels": { "facebookPixelId": "123" } })),
            ("lgpd", json!({ "termsText": "Termos" })),
            ("thankYouPage", json!({ "description": "x" })),
            ("upsellPage", json!({ "enabled": true })),
            ("downsellPage", json!({ "price": "R$ 10" })),
        ];
        let defaults = TemplateData::default().to_value();
        for (key, partial) in blocks {
            let data = TemplateData::from_stored(&json!({ key: partial.clone() })).to_value();
            let Some(merged) = data.get(key).and_then(Value::as_object) else {
                panic!("{key} missing after merge");
            };
            let Some(default_block) = defaults.get(key).and_then(Value::as_object) else {
                panic!("{key} missing in defaults");
            };
            // every default key survives
            for default_key in default_block.keys() {
                assert!(merged.contains_key(default_key), "{key}.{default_key} lost");
            }
        }
    }

    #[test]
    fn required_form_fields_are_forced_on() {
        let data = TemplateData::from_stored(&json!({
            "formFields": { "fullName": false, "email": false, "whatsapp": true }
        }));
        assert!(data.form_fields.full_name);
        assert!(data.form_fields.email);
        assert!(data.form_fields.whatsapp);
    }

    #[test]
    fn malformed_field_is_dropped_without_losing_siblings() {
        let data = TemplateData::from_stored(&json!({
            "headline": "Kept",
            "benefits": "not-a-list",
            "styles": { "fontFamily": "comic_sans", "primaryColor": "#123456" },
        }));
        assert_eq!(data.headline, "Kept");
        assert!(data.benefits.is_empty());
        assert_eq!(data.styles.font_family, FontFamily::Inter);
        assert_eq!(data.styles.primary_color, "#123456");
    }

    #[test]
    fn null_values_keep_defaults() {
        let data = TemplateData::from_stored(&json!({ "ctaText": null }));
        assert_eq!(data.cta_text, TemplateData::default().cta_text);
    }

    #[test]
    fn items_without_ids_get_unique_ids() {
        let data = TemplateData::from_stored(&json!({
            "faqs": [
                { "question": "a" },
                { "id": "same", "question": "b" },
                { "id": "same", "question": "c" },
            ]
        }));
        let ids: Vec<&str> = data.faqs.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| !id.is_empty()));
        assert_eq!(ids.get(1), Some(&"same"));
        assert_ne!(ids.get(2), Some(&"same"));
        let questions: Vec<&str> = data.faqs.iter().map(|f| f.question.as_str()).collect();
        assert_eq!(questions, vec!["a", "b", "c"]);
    }

    #[test]
    fn legacy_document_is_stamped_with_current_version() {
        let data = TemplateData::from_stored(&json!({ "schemaVersion": 0, "headline": "old" }));
        assert_eq!(data.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn with_patch_rejects_wrong_shapes() {
        let data = TemplateData::default();
        assert!(data.with_patch(&json!({ "benefits": 3 })).is_err());
        assert!(data.with_patch(&json!("headline")).is_err());
    }

    #[test]
    fn with_patch_merges_nested_objects() {
        let data = TemplateData::default();
        let Ok(next) = data.with_patch(&json!({ "styles": { "fontFamily": "poppins" } })) else {
            panic!("patch should apply");
        };
        assert_eq!(next.styles.font_family, FontFamily::Poppins);
        assert_eq!(next.styles.primary_color, data.styles.primary_color);
    }

    #[test]
    fn starter_content_is_niche_specific() {
        let event = TemplateData::starter(Niche::Event, "Webinar X");
        assert_eq!(event.headline, "Webinar X");
        assert!(!event.schedule_items.is_empty());

        let service = TemplateData::starter(Niche::Service, "Agência");
        assert!(service.form_fields.phone);
        assert_eq!(service.process_steps.len(), 3);
    }

    #[test]
    fn merge_json_replaces_arrays() {
        let mut target = json!({ "a": [1, 2, 3], "b": { "c": 1, "d": 2 } });
        merge_json(&mut target, &json!({ "a": [9], "b": { "d": 5 } }));
        assert_eq!(target, json!({ "a": [9], "b": { "c": 1, "d": 5 } }));
    }

    #[test]
    fn font_family_css() {
        assert_eq!(FontFamily::OpenSans.google_fonts_param(), "Open+Sans:wght@400;600;700");
        assert_eq!(FontFamily::Playfair.css_stack(), "'Playfair Display', serif");
    }
}
