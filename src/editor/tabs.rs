//! Editor tabs: which part of the document each tab may change, and the
//! checks a tab runs before its update reaches the session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::TemplateData;
use crate::domain::template_data::{FunnelStageConfig, is_hex_color, is_link};
use crate::error::AppError;

/// A property-sheet tab of the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EditorTab {
    /// Copy and content collections.
    Content,
    /// Static images.
    Images,
    /// Hero video.
    Video,
    /// Colors and font.
    Styles,
    /// Lead form.
    Form,
    /// Checkout, lead forwarding and pixels.
    Integrations,
    /// Consent and legal texts.
    Lgpd,
    /// Thank-you stage.
    ThankYou,
    /// Upsell stage.
    Upsell,
    /// Downsell stage.
    Downsell,
}

impl EditorTab {
    /// Every tab, in display order.
    pub const ALL: [Self; 10] = [
        Self::Content,
        Self::Images,
        Self::Video,
        Self::Styles,
        Self::Form,
        Self::Integrations,
        Self::Lgpd,
        Self::ThankYou,
        Self::Upsell,
        Self::Downsell,
    ];

    /// Route segment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Images => "images",
            Self::Video => "video",
            Self::Styles => "styles",
            Self::Form => "form",
            Self::Integrations => "integrations",
            Self::Lgpd => "lgpd",
            Self::ThankYou => "thank_you",
            Self::Upsell => "upsell",
            Self::Downsell => "downsell",
        }
    }

    /// Top-level document keys this tab owns.
    #[must_use]
    pub const fn owned_keys(self) -> &'static [&'static str] {
        match self {
            Self::Content => &[
                "headline",
                "subheadline",
                "ctaText",
                "heroText",
                "aboutTitle",
                "aboutText",
                "price",
                "originalPrice",
                "guaranteeText",
                "urgencyText",
                "footerText",
                "benefits",
                "testimonials",
                "faqs",
                "speakers",
                "modules",
                "scheduleItems",
                "caseStudies",
                "pricingTiers",
                "processSteps",
                "eventDate",
                "eventTime",
                "eventLocation",
                "eventIsOnline",
                "courseDuration",
                "courseLevel",
                "instructorName",
                "instructorBio",
            ],
            Self::Images => &[
                "logoUrl",
                "heroImageUrl",
                "aboutImageUrl",
                "instructorImageUrl",
            ],
            Self::Video => &["videoUrl", "useImageInsteadOfVideo"],
            Self::Styles => &["styles"],
            Self::Form => &["formFields", "formTitle", "formButtonText"],
            Self::Integrations => &["integrations"],
            Self::Lgpd => &["lgpd"],
            Self::ThankYou => &["thankYouPage"],
            Self::Upsell => &["upsellPage"],
            Self::Downsell => &["downsellPage"],
        }
    }

    /// Checks a partial update against this tab.
    ///
    /// Returns the document as it would look after the update.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] for keys outside the tab or values that
    /// fail the tab's rules; [`AppError::InvalidRequest`] for shape errors.
    pub fn check(self, partial: &Value, current: &TemplateData) -> Result<TemplateData, AppError> {
        let Some(fields) = partial.as_object() else {
            return Err(AppError::InvalidRequest(
                "tab update must be a JSON object".to_string(),
            ));
        };
        if let Some(foreign) = fields.keys().find(|k| !self.owned_keys().contains(&k.as_str())) {
            return Err(AppError::validation(
                foreign.clone(),
                format!("not editable from the {self} tab"),
            ));
        }

        if self == Self::Form {
            for required in ["fullName", "email"] {
                if partial.pointer(&format!("/formFields/{required}")) == Some(&Value::Bool(false))
                {
                    return Err(AppError::validation(
                        format!("formFields.{required}"),
                        "this field is always collected",
                    ));
                }
            }
        }

        let next = current.with_patch(partial)?;
        self.validate(partial, &next)?;
        Ok(next)
    }

    /// Runs the tab's rules on the fields `partial` touches, reading their
    /// merged values from `data`.
    fn validate(self, partial: &Value, data: &TemplateData) -> Result<(), AppError> {
        match self {
            Self::Styles => {
                check_color(partial, "styles.primaryColor", &data.styles.primary_color)?;
                check_color(partial, "styles.secondaryColor", &data.styles.secondary_color)
            }
            Self::Images => {
                check_url(partial, "logoUrl", &data.logo_url)?;
                check_url(partial, "heroImageUrl", &data.hero_image_url)?;
                check_url(partial, "aboutImageUrl", &data.about_image_url)?;
                check_url(partial, "instructorImageUrl", &data.instructor_image_url)
            }
            Self::Video => check_url(partial, "videoUrl", &data.video_url),
            Self::Integrations => {
                let integrations = &data.integrations;
                check_url(partial, "integrations.checkout.url", &integrations.checkout.url)?;
                check_url(
                    partial,
                    "integrations.leadDestination.webhookUrl",
                    &integrations.lead_destination.webhook_url,
                )?;
                let email = integrations.lead_destination.email.trim();
                if touched(partial, "integrations.leadDestination.email")
                    && !email.is_empty()
                    && !email.contains('@')
                {
                    return Err(AppError::validation(
                        "integrations.leadDestination.email",
                        "invalid e-mail address",
                    ));
                }
                Ok(())
            }
            Self::ThankYou => check_stage(partial, "thankYouPage", &data.thank_you_page, false),
            Self::Upsell => check_stage(partial, "upsellPage", &data.upsell_page, true),
            Self::Downsell => check_stage(partial, "downsellPage", &data.downsell_page, true),
            Self::Content | Self::Form | Self::Lgpd => Ok(()),
        }
    }
}

impl fmt::Display for EditorTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditorTab {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tab| tab.as_str() == s)
            .ok_or_else(|| AppError::InvalidRequest(format!("unknown editor tab '{s}'")))
    }
}

/// Whether the dotted `field` path is present in `partial`.
fn touched(partial: &Value, field: &str) -> bool {
    partial
        .pointer(&format!("/{}", field.replace('.', "/")))
        .is_some()
}

fn check_color(partial: &Value, field: &str, value: &str) -> Result<(), AppError> {
    if !touched(partial, field) || is_hex_color(value) {
        Ok(())
    } else {
        Err(AppError::validation(field, "expected #rgb or #rrggbb"))
    }
}

fn check_url(partial: &Value, field: &str, value: &str) -> Result<(), AppError> {
    let value = value.trim();
    if !touched(partial, field) || value.is_empty() || is_link(value) {
        Ok(())
    } else {
        Err(AppError::validation(field, "expected an http(s) URL"))
    }
}

fn check_stage(
    partial: &Value,
    key: &str,
    stage: &FunnelStageConfig,
    offer: bool,
) -> Result<(), AppError> {
    let gated = touched(partial, &format!("{key}.enabled"))
        || touched(partial, &format!("{key}.headline"));
    if offer && gated && stage.enabled && stage.headline.trim().is_empty() {
        return Err(AppError::validation(
            format!("{key}.headline"),
            "an enabled offer needs a headline",
        ));
    }
    check_url(partial, &format!("{key}.checkoutUrl"), &stage.checkout_url)?;
    check_url(partial, &format!("{key}.videoUrl"), &stage.video_url)?;
    check_url(partial, &format!("{key}.imageUrl"), &stage.image_url)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn keys_outside_tab_are_rejected() {
        let data = TemplateData::default();
        let Err(AppError::Validation { field, .. }) =
            EditorTab::Styles.check(&json!({ "headline": "x" }), &data)
        else {
            panic!("expected validation error");
        };
        assert_eq!(field, "headline");
    }

    #[test]
    fn every_top_level_key_belongs_to_exactly_one_tab() {
        let Some(keys) = TemplateData::default().to_value().as_object().cloned() else {
            panic!("defaults are not an object");
        };
        for key in keys.keys().filter(|k| *k != "schemaVersion") {
            let owners = EditorTab::ALL
                .iter()
                .filter(|t| t.owned_keys().contains(&key.as_str()))
                .count();
            assert_eq!(owners, 1, "{key}");
        }
    }

    #[test]
    fn styles_require_hex_colors() {
        let data = TemplateData::default();
        assert!(
            EditorTab::Styles
                .check(&json!({ "styles": { "primaryColor": "red" } }), &data)
                .is_err()
        );
        let Ok(next) =
            EditorTab::Styles.check(&json!({ "styles": { "primaryColor": "#0f0" } }), &data)
        else {
            panic!("short hex should pass");
        };
        assert_eq!(next.styles.primary_color, "#0f0");
    }

    #[test]
    fn integrations_check_urls_and_email() {
        let data = TemplateData::default();
        assert!(
            EditorTab::Integrations
                .check(
                    &json!({ "integrations": { "checkout": { "url": "ftp://x" } } }),
                    &data
                )
                .is_err()
        );
        assert!(
            EditorTab::Integrations
                .check(
                    &json!({ "integrations": { "leadDestination": { "email": "nope" } } }),
                    &data
                )
                .is_err()
        );
        assert!(
            EditorTab::Integrations
                .check(
                    &json!({ "integrations": { "checkout": { "type": "post_lead", "url": "https://pay.example/a" } } }),
                    &data
                )
                .is_ok()
        );
    }

    #[test]
    fn enabled_offer_needs_headline() {
        let data = TemplateData::default();
        let Err(AppError::Validation { field, .. }) = EditorTab::Upsell.check(
            &json!({ "upsellPage": { "enabled": true, "headline": "  " } }),
            &data,
        ) else {
            panic!("expected validation error");
        };
        assert_eq!(field, "upsellPage.headline");
    }

    #[test]
    fn required_form_fields_cannot_be_disabled() {
        let data = TemplateData::default();
        assert!(
            EditorTab::Form
                .check(&json!({ "formFields": { "email": false } }), &data)
                .is_err()
        );
        assert!(
            EditorTab::Form
                .check(&json!({ "formFields": { "phone": true } }), &data)
                .is_ok()
        );
    }

    #[test]
    fn link_rules() {
        assert!(is_link("https://cdn.example/a.png"));
        assert!(is_link("/media/abc/x.png"));
        assert!(!is_link("//evil.example"));
        assert!(!is_link("javascript:alert(1)"));
        assert!(!is_link("https://"));
    }

    #[test]
    fn legacy_invalid_values_do_not_block_other_fields() {
        let mut data = TemplateData::default();
        data.styles.primary_color = "azul".to_string();
        data.integrations.checkout.url = "ftp://legado".to_string();

        let Ok(next) =
            EditorTab::Styles.check(&json!({ "styles": { "fontFamily": "poppins" } }), &data)
        else {
            panic!("untouched color should not be checked");
        };
        assert_eq!(next.styles.primary_color, "azul");
        assert!(
            EditorTab::Styles
                .check(&json!({ "styles": { "primaryColor": "azul" } }), &data)
                .is_err()
        );
        assert!(
            EditorTab::Integrations
                .check(
                    &json!({ "integrations": { "pixels": { "facebookPixelId": "123" } } }),
                    &data
                )
                .is_ok()
        );
    }
}
