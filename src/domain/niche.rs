//! Niches, template variants and renderer dispatch.
//!
//! A project's [`Niche`] selects the renderer family; its `template_id`
//! selects a concrete variant inside that family. The mapping lives in
//! [`RendererKind::resolve`] as an exhaustive `match`, so an unknown
//! template id always lands on the niche default instead of failing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Business category of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Niche {
    /// Physical or digital product sales page.
    Product,
    /// Service / agency page.
    Service,
    /// Event, webinar or meetup registration.
    Event,
    /// Online course enrollment.
    Course,
}

impl Niche {
    /// Every niche, in catalog order.
    pub const ALL: [Self; 4] = [Self::Product, Self::Service, Self::Event, Self::Course];

    /// Stable lowercase identifier used in storage and URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Service => "service",
            Self::Event => "event",
            Self::Course => "course",
        }
    }

    /// Display label shown in the dashboard.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Product => "Produto",
            Self::Service => "Serviço",
            Self::Event => "Evento",
            Self::Course => "Curso",
        }
    }

    /// Template variants available for this niche. The first one is the
    /// default.
    #[must_use]
    pub const fn renderers(self) -> &'static [RendererKind] {
        match self {
            Self::Product => &[RendererKind::Product, RendererKind::ProductVsl],
            Self::Service => &[RendererKind::Service],
            Self::Event => &[RendererKind::Event],
            Self::Course => &[RendererKind::Course],
        }
    }

    /// Default variant for this niche.
    #[must_use]
    pub const fn default_renderer(self) -> RendererKind {
        match self {
            Self::Product => RendererKind::Product,
            Self::Service => RendererKind::Service,
            Self::Event => RendererKind::Event,
            Self::Course => RendererKind::Course,
        }
    }
}

impl fmt::Display for Niche {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Niche {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(Self::Product),
            "service" => Ok(Self::Service),
            "event" => Ok(Self::Event),
            "course" => Ok(Self::Course),
            other => Err(AppError::validation(
                "niche",
                format!("unknown niche '{other}'"),
            )),
        }
    }
}

/// Concrete page renderer selected for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    /// Classic product sales page.
    Product,
    /// Product page led by a video sales letter.
    ProductVsl,
    /// Service page.
    Service,
    /// Event page.
    Event,
    /// Course page.
    Course,
}

impl RendererKind {
    /// Picks the renderer for a niche and stored template id.
    ///
    /// Only the product niche has more than one variant; every other
    /// niche ignores `template_id`. Unknown or empty ids fall back to the
    /// niche default.
    #[must_use]
    pub fn resolve(niche: Niche, template_id: &str) -> Self {
        match niche {
            Niche::Product => match template_id {
                "product_vsl" => Self::ProductVsl,
                _ => Self::Product,
            },
            Niche::Service => Self::Service,
            Niche::Event => Self::Event,
            Niche::Course => Self::Course,
        }
    }

    /// Template id stored on the project for this variant.
    #[must_use]
    pub const fn template_id(self) -> &'static str {
        match self {
            Self::Product => "product_default",
            Self::ProductVsl => "product_vsl",
            Self::Service => "service_default",
            Self::Event => "event_default",
            Self::Course => "course_default",
        }
    }

    /// Niche this variant belongs to.
    #[must_use]
    pub const fn niche(self) -> Niche {
        match self {
            Self::Product | Self::ProductVsl => Niche::Product,
            Self::Service => Niche::Service,
            Self::Event => Niche::Event,
            Self::Course => Niche::Course,
        }
    }

    /// Short description for the template picker.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Product => "Página de vendas com benefícios, depoimentos e oferta",
            Self::ProductVsl => "Vídeo de vendas em destaque com oferta logo abaixo",
            Self::Service => "Serviços, processo de trabalho e cases de sucesso",
            Self::Event => "Data, local, palestrantes e programação",
            Self::Course => "Módulos, instrutor e planos de matrícula",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_dispatches_on_template_id() {
        assert_eq!(
            RendererKind::resolve(Niche::Product, "product_vsl"),
            RendererKind::ProductVsl
        );
        assert_eq!(
            RendererKind::resolve(Niche::Product, "product_default"),
            RendererKind::Product
        );
    }

    #[test]
    fn unknown_template_falls_back_to_niche_default() {
        for niche in Niche::ALL {
            assert_eq!(
                RendererKind::resolve(niche, "no_such_template"),
                niche.default_renderer()
            );
            assert_eq!(RendererKind::resolve(niche, ""), niche.default_renderer());
        }
    }

    #[test]
    fn other_niches_ignore_template_id() {
        assert_eq!(
            RendererKind::resolve(Niche::Event, "product_vsl"),
            RendererKind::Event
        );
    }

    #[test]
    fn every_renderer_belongs_to_its_niche() {
        for niche in Niche::ALL {
            for kind in niche.renderers() {
                assert_eq!(kind.niche(), niche);
                assert_eq!(RendererKind::resolve(niche, kind.template_id()), *kind);
            }
        }
    }

    #[test]
    fn niche_parses_round_trip() {
        for niche in Niche::ALL {
            assert_eq!(niche.as_str().parse::<Niche>().ok(), Some(niche));
        }
        assert!("restaurant".parse::<Niche>().is_err());
    }
}
