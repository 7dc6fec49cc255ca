//! Add / update / remove for every list inside [`TemplateData`].
//!
//! All collections share one generic implementation over
//! [`CollectionItem`]. Operations are pure: they take the current list and
//! return a new one, which the editor then wraps in a partial document
//! (see [`CollectionKind::partial`]) and feeds through the session's single
//! apply path.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

use super::ids::new_item_id;
use super::template_data::{TemplateData, merge_json};
use crate::error::AppError;

/// An element of a template collection, identified by a string id.
pub trait CollectionItem: Clone + Serialize + DeserializeOwned {
    /// Item id.
    fn id(&self) -> &str;

    /// Replaces the item id.
    fn set_id(&mut self, id: String);
}

/// Gives every item a non-empty id unique within `items`, keeping the
/// first occurrence of a duplicated id and re-keying the rest.
pub fn ensure_item_ids<T: CollectionItem>(items: &mut [T]) {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items.iter_mut() {
        if item.id().trim().is_empty() || !seen.insert(item.id().to_string()) {
            let id = new_item_id();
            seen.insert(id.clone());
            item.set_id(id);
        }
    }
}

/// Appends `item` with a fresh id.
///
/// A client-supplied id is kept only when it is non-empty and not already
/// used in the list.
#[must_use]
pub fn add_item<T: CollectionItem>(items: &[T], mut item: T) -> Vec<T> {
    let taken = item.id().trim().is_empty() || items.iter().any(|i| i.id() == item.id());
    if taken {
        item.set_id(new_item_id());
    }
    let mut next = items.to_vec();
    next.push(item);
    next
}

/// Merges `patch` into the item with the given id. The id and the item's
/// position never change.
///
/// # Errors
///
/// Returns [`AppError::ItemNotFound`] for an unknown id and
/// [`AppError::InvalidRequest`] when the patched item no longer matches
/// its schema.
pub fn update_item<T: CollectionItem>(
    items: &[T],
    collection: CollectionKind,
    id: &str,
    patch: &Value,
) -> Result<Vec<T>, AppError> {
    let index = position(items, collection, id)?;
    let mut next = items.to_vec();
    let Some(slot) = next.get_mut(index) else {
        return Err(not_found(collection, id));
    };

    let mut value = serde_json::to_value(&*slot)
        .map_err(|e| AppError::Internal(format!("serialize {collection} item: {e}")))?;
    merge_json(&mut value, patch);
    let mut updated: T = serde_json::from_value(value)
        .map_err(|e| AppError::InvalidRequest(format!("invalid {collection} item: {e}")))?;
    updated.set_id(id.to_string());
    *slot = updated;
    Ok(next)
}

/// Removes the item with the given id.
///
/// # Errors
///
/// Returns [`AppError::ItemNotFound`] for an unknown id.
pub fn remove_item<T: CollectionItem>(
    items: &[T],
    collection: CollectionKind,
    id: &str,
) -> Result<Vec<T>, AppError> {
    position(items, collection, id)?;
    Ok(items.iter().filter(|i| i.id() != id).cloned().collect())
}

fn position<T: CollectionItem>(
    items: &[T],
    collection: CollectionKind,
    id: &str,
) -> Result<usize, AppError> {
    items
        .iter()
        .position(|i| i.id() == id)
        .ok_or_else(|| not_found(collection, id))
}

fn not_found(collection: CollectionKind, id: &str) -> AppError {
    AppError::ItemNotFound {
        collection: collection.as_str().to_string(),
        id: id.to_string(),
    }
}

/// The collections an editor can manipulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// `benefits`
    Benefits,
    /// `testimonials`
    Testimonials,
    /// `faqs`
    Faqs,
    /// `speakers`
    Speakers,
    /// `modules`
    Modules,
    /// `scheduleItems`
    ScheduleItems,
    /// `caseStudies`
    CaseStudies,
    /// `pricingTiers`
    PricingTiers,
    /// `processSteps`
    ProcessSteps,
    /// `thankYouPage.benefits`
    ThankYouBenefits,
    /// `upsellPage.benefits`
    UpsellBenefits,
    /// `downsellPage.benefits`
    DownsellBenefits,
}

impl CollectionKind {
    /// Every collection.
    pub const ALL: [Self; 12] = [
        Self::Benefits,
        Self::Testimonials,
        Self::Faqs,
        Self::Speakers,
        Self::Modules,
        Self::ScheduleItems,
        Self::CaseStudies,
        Self::PricingTiers,
        Self::ProcessSteps,
        Self::ThankYouBenefits,
        Self::UpsellBenefits,
        Self::DownsellBenefits,
    ];

    /// Path segment used in editor routes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Benefits => "benefits",
            Self::Testimonials => "testimonials",
            Self::Faqs => "faqs",
            Self::Speakers => "speakers",
            Self::Modules => "modules",
            Self::ScheduleItems => "schedule_items",
            Self::CaseStudies => "case_studies",
            Self::PricingTiers => "pricing_tiers",
            Self::ProcessSteps => "process_steps",
            Self::ThankYouBenefits => "thank_you_benefits",
            Self::UpsellBenefits => "upsell_benefits",
            Self::DownsellBenefits => "downsell_benefits",
        }
    }

    /// Location inside the document: top-level key, plus the nested key
    /// for funnel stage collections.
    #[must_use]
    pub const fn json_path(self) -> (&'static str, Option<&'static str>) {
        match self {
            Self::Benefits => ("benefits", None),
            Self::Testimonials => ("testimonials", None),
            Self::Faqs => ("faqs", None),
            Self::Speakers => ("speakers", None),
            Self::Modules => ("modules", None),
            Self::ScheduleItems => ("scheduleItems", None),
            Self::CaseStudies => ("caseStudies", None),
            Self::PricingTiers => ("pricingTiers", None),
            Self::ProcessSteps => ("processSteps", None),
            Self::ThankYouBenefits => ("thankYouPage", Some("benefits")),
            Self::UpsellBenefits => ("upsellPage", Some("benefits")),
            Self::DownsellBenefits => ("downsellPage", Some("benefits")),
        }
    }

    /// Wraps a full list into the partial document that replaces it.
    #[must_use]
    pub fn partial(self, list: Value) -> Value {
        match self.json_path() {
            (key, None) => json!({ key: list }),
            (key, Some(nested)) => json!({ key: { nested: list } }),
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AppError::InvalidRequest(format!("unknown collection '{s}'")))
    }
}

/// A collection command issued by the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionOp {
    /// Append a new item built from the given JSON.
    Add(Value),
    /// Merge a patch into an existing item.
    Update {
        /// Item id.
        id: String,
        /// JSON merge patch.
        patch: Value,
    },
    /// Drop an item.
    Remove {
        /// Item id.
        id: String,
    },
}

/// Outcome of a collection command.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionChange {
    /// Partial document replacing the whole collection.
    pub partial: Value,
    /// Id of the added, updated or removed item.
    pub item_id: String,
}

impl TemplateData {
    /// Runs a collection command against this document without mutating
    /// it.
    ///
    /// # Errors
    ///
    /// See [`update_item`] and [`remove_item`]; an `Add` payload with the
    /// wrong shape yields [`AppError::InvalidRequest`].
    pub fn collection_change(
        &self,
        kind: CollectionKind,
        op: &CollectionOp,
    ) -> Result<CollectionChange, AppError> {
        let (list, item_id) = match kind {
            CollectionKind::Benefits => run(&self.benefits, kind, op)?,
            CollectionKind::Testimonials => run(&self.testimonials, kind, op)?,
            CollectionKind::Faqs => run(&self.faqs, kind, op)?,
            CollectionKind::Speakers => run(&self.speakers, kind, op)?,
            CollectionKind::Modules => run(&self.modules, kind, op)?,
            CollectionKind::ScheduleItems => run(&self.schedule_items, kind, op)?,
            CollectionKind::CaseStudies => run(&self.case_studies, kind, op)?,
            CollectionKind::PricingTiers => run(&self.pricing_tiers, kind, op)?,
            CollectionKind::ProcessSteps => run(&self.process_steps, kind, op)?,
            CollectionKind::ThankYouBenefits => run(&self.thank_you_page.benefits, kind, op)?,
            CollectionKind::UpsellBenefits => run(&self.upsell_page.benefits, kind, op)?,
            CollectionKind::DownsellBenefits => run(&self.downsell_page.benefits, kind, op)?,
        };
        Ok(CollectionChange {
            partial: kind.partial(list),
            item_id,
        })
    }
}

fn run<T: CollectionItem>(
    items: &[T],
    kind: CollectionKind,
    op: &CollectionOp,
) -> Result<(Value, String), AppError> {
    let (next, item_id) = match op {
        CollectionOp::Add(raw) => {
            if !raw.is_object() {
                return Err(AppError::InvalidRequest(format!(
                    "{kind} item must be a JSON object"
                )));
            }
            let item: T = serde_json::from_value(raw.clone())
                .map_err(|e| AppError::InvalidRequest(format!("invalid {kind} item: {e}")))?;
            let next = add_item(items, item);
            let id = next.last().map(|i| i.id().to_string()).unwrap_or_default();
            (next, id)
        }
        CollectionOp::Update { id, patch } => (update_item(items, kind, id, patch)?, id.clone()),
        CollectionOp::Remove { id } => (remove_item(items, kind, id)?, id.clone()),
    };
    let list = serde_json::to_value(next)
        .map_err(|e| AppError::Internal(format!("serialize {kind}: {e}")))?;
    Ok((list, item_id))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::template_data::Faq;

    fn faq(id: &str, question: &str) -> Faq {
        Faq {
            id: id.to_string(),
            question: question.to_string(),
            answer: String::new(),
        }
    }

    #[test]
    fn add_then_remove_restores_count() {
        let items = vec![faq("a", "one"), faq("b", "two")];
        let added = add_item(&items, faq("", "three"));
        assert_eq!(added.len(), 3);
        let Some(new_id) = added.last().map(|f| f.id.clone()) else {
            panic!("item not appended");
        };
        assert!(!new_id.is_empty());

        let Ok(removed) = remove_item(&added, CollectionKind::Faqs, &new_id) else {
            panic!("remove failed");
        };
        assert_eq!(removed, items);
    }

    #[test]
    fn add_rekeys_duplicate_id() {
        let items = vec![faq("a", "one")];
        let added = add_item(&items, faq("a", "dup"));
        let ids: HashSet<&str> = added.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn update_touches_only_target_item() {
        let items = vec![faq("a", "one"), faq("b", "two"), faq("c", "three")];
        let Ok(next) = update_item(
            &items,
            CollectionKind::Faqs,
            "b",
            &json!({ "answer": "yes", "id": "hijack" }),
        ) else {
            panic!("update failed");
        };
        assert_eq!(next.first(), items.first());
        assert_eq!(next.get(2), items.get(2));
        let Some(updated) = next.get(1) else {
            panic!("item moved");
        };
        assert_eq!(updated.id, "b");
        assert_eq!(updated.question, "two");
        assert_eq!(updated.answer, "yes");
    }

    #[test]
    fn unknown_id_is_not_found() {
        let items = vec![faq("a", "one")];
        let Err(err) = remove_item(&items, CollectionKind::Faqs, "zzz") else {
            panic!("expected error");
        };
        assert!(matches!(err, AppError::ItemNotFound { .. }));
        assert!(update_item(&items, CollectionKind::Faqs, "zzz", &json!({})).is_err());
    }

    #[test]
    fn ensure_ids_fills_blanks_and_duplicates() {
        let mut items = vec![faq("", "x"), faq("k", "y"), faq("k", "z")];
        ensure_item_ids(&mut items);
        let ids: HashSet<&str> = items.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(""));
    }

    #[test]
    fn stage_collections_nest_their_partial() {
        let data = TemplateData::default();
        let Ok(change) = data.collection_change(
            CollectionKind::UpsellBenefits,
            &CollectionOp::Add(json!({ "title": "Bônus" })),
        ) else {
            panic!("add failed");
        };
        let Some(list) = change.partial.pointer("/upsellPage/benefits").and_then(Value::as_array)
        else {
            panic!("unexpected partial {}", change.partial);
        };
        assert_eq!(list.len(), 1);
        assert!(!change.item_id.is_empty());
    }

    #[test]
    fn add_rejects_non_object_payload() {
        let data = TemplateData::default();
        assert!(
            data.collection_change(CollectionKind::Faqs, &CollectionOp::Add(json!("oops")))
                .is_err()
        );
    }

    #[test]
    fn collection_names_parse() {
        for kind in CollectionKind::ALL {
            assert_eq!(kind.as_str().parse::<CollectionKind>().ok(), Some(kind));
        }
        assert!("widgets".parse::<CollectionKind>().is_err());
    }
}
