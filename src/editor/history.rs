//! Bounded undo/redo stacks of whole-document snapshots.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::TemplateData;

/// One applied change.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// The partial update as received.
    pub patch: Value,
    /// Document before the change.
    pub before: TemplateData,
    /// Document after the change.
    pub after: TemplateData,
    /// When the change was applied.
    pub at: DateTime<Utc>,
}

/// Undo/redo stacks. The oldest undo entry is dropped past `limit`.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    limit: usize,
}

impl History {
    /// Creates empty stacks keeping at most `limit` undo steps.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::with_capacity(limit.min(64)),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Records a new change and clears the redo stack.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.redo.clear();
        self.undo.push_back(entry);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    /// Steps back, returning the document to show.
    pub fn undo(&mut self) -> Option<TemplateData> {
        let entry = self.undo.pop_back()?;
        let before = entry.before.clone();
        self.redo.push(entry);
        Some(before)
    }

    /// Steps forward again, returning the document to show.
    pub fn redo(&mut self) -> Option<TemplateData> {
        let entry = self.redo.pop()?;
        let after = entry.after.clone();
        self.undo.push_back(entry);
        Some(after)
    }

    /// Whether [`History::undo`] would do anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether [`History::redo`] would do anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// The most recent change still in effect.
    #[must_use]
    pub fn last_change(&self) -> Option<&HistoryEntry> {
        self.undo.back()
    }

    /// Number of undo steps held.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(from: &str, to: &str) -> HistoryEntry {
        let before = TemplateData {
            headline: from.to_string(),
            ..TemplateData::default()
        };
        let after = TemplateData {
            headline: to.to_string(),
            ..TemplateData::default()
        };
        HistoryEntry {
            patch: json!({ "headline": to }),
            before,
            after,
            at: Utc::now(),
        }
    }

    #[test]
    fn undo_then_redo_round_trips() {
        let mut history = History::new(10);
        history.record(entry("a", "b"));
        history.record(entry("b", "c"));

        let Some(doc) = history.undo() else {
            panic!("nothing to undo");
        };
        assert_eq!(doc.headline, "b");
        let Some(doc) = history.redo() else {
            panic!("nothing to redo");
        };
        assert_eq!(doc.headline, "c");
        assert!(!history.can_redo());
    }

    #[test]
    fn new_change_clears_redo() {
        let mut history = History::new(10);
        history.record(entry("a", "b"));
        assert!(history.undo().is_some());
        assert!(history.can_redo());
        history.record(entry("a", "z"));
        assert!(!history.can_redo());
    }

    #[test]
    fn limit_drops_oldest() {
        let mut history = History::new(3);
        for i in 0..5 {
            history.record(entry(&i.to_string(), &(i + 1).to_string()));
        }
        assert_eq!(history.undo_len(), 3);
        let mut last = None;
        while let Some(doc) = history.undo() {
            last = Some(doc.headline);
        }
        assert_eq!(last.as_deref(), Some("2"));
    }
}
