//! Linear undo/redo log of style mutations.
//!
//! The log is a vector plus a count of applied entries. Recording while some
//! entries are undone discards them first, so there is never more than one
//! redo branch. Entries that share a `group` id were recorded together and are
//! undone and redone as one step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stylekit_css::StyleRuleStore;
use stylekit_dom::Document;
use tracing::{debug, trace, warn};

use crate::path::PathResolver;

/// What a history entry's `target` addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    /// `target` is a selector in the style rule store.
    Class,
    /// `target` is a node path; the value is the node's inline declaration.
    Inline,
}

/// One recorded mutation. Empty values mean "no declaration".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub kind: HistoryKind,
    pub target: String,
    pub property: String,
    pub old_value: String,
    pub new_value: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<u64>,
}

/// A mutation about to be recorded; the log stamps the time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleChange {
    pub kind: HistoryKind,
    pub target: String,
    pub property: String,
    pub old_value: String,
    pub new_value: String,
}

impl StyleChange {
    pub fn class(
        selector: impl Into<String>,
        property: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            kind: HistoryKind::Class,
            target: selector.into(),
            property: property.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
        }
    }

    pub fn inline(
        path: impl Into<String>,
        property: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            kind: HistoryKind::Inline,
            ..Self::class(path, property, old_value, new_value)
        }
    }

    fn into_entry(self, group: Option<u64>) -> HistoryEntry {
        HistoryEntry {
            kind: self.kind,
            target: self.target,
            property: self.property,
            old_value: self.old_value,
            new_value: self.new_value,
            timestamp: Utc::now(),
            group,
        }
    }
}

/// Writes a value back during undo/redo.
pub trait StyleApplier {
    /// Set `property` on `target` to `value`; an empty value removes it.
    /// Returns false when the write could not be made.
    fn apply(&mut self, kind: HistoryKind, target: &str, property: &str, value: &str) -> bool;
}

impl StyleApplier for StyleRuleStore {
    fn apply(&mut self, kind: HistoryKind, target: &str, property: &str, value: &str) -> bool {
        if kind != HistoryKind::Class {
            warn!(selector = target, property, "Inline history entry needs a document to replay");
            return false;
        }
        match self.upsert(target, property, value) {
            Ok(_) => true,
            Err(e) => {
                warn!(selector = target, property, error = %e, "Failed to replay style change");
                false
            }
        }
    }
}

/// Replays both entry kinds: selectors against the store, paths against the document.
pub struct DocumentStyleApplier<'a> {
    pub store: &'a mut StyleRuleStore,
    pub doc: &'a mut Document,
    pub resolver: &'a PathResolver,
}

impl StyleApplier for DocumentStyleApplier<'_> {
    fn apply(&mut self, kind: HistoryKind, target: &str, property: &str, value: &str) -> bool {
        match kind {
            HistoryKind::Class => self.store.apply(kind, target, property, value),
            HistoryKind::Inline => {
                let Some(node) = self.resolver.resolve_path(&*self.doc, target) else {
                    warn!(path = target, property, "Inline history target no longer resolves");
                    return false;
                };
                match self.doc.set_inline_style(node, property, value) {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(path = target, property, error = %e, "Failed to replay inline change");
                        false
                    }
                }
            }
        }
    }
}

/// The undo/redo log.
#[derive(Debug, Clone, Default)]
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    /// Entries `[0, applied)` are in effect; the cursor is `applied - 1`.
    applied: usize,
    limit: Option<usize>,
    next_group: u64,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` entries, dropping the oldest.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Append one change, discarding any undone entries first.
    pub fn record(&mut self, change: StyleChange) {
        self.push(change.into_entry(None));
        self.enforce_limit();
    }

    /// Append changes that undo and redo as a single step.
    ///
    /// Returns the group id, or `None` when `changes` is empty.
    pub fn record_group(&mut self, changes: Vec<StyleChange>) -> Option<u64> {
        if changes.is_empty() {
            return None;
        }
        let group = self.next_group;
        self.next_group += 1;
        let count = changes.len();
        for change in changes {
            self.push(change.into_entry(Some(group)));
        }
        self.enforce_limit();
        debug!(group, count, "Recorded grouped changes");
        Some(group)
    }

    fn push(&mut self, entry: HistoryEntry) {
        if self.applied < self.entries.len() {
            let dropped = self.entries.len() - self.applied;
            self.entries.truncate(self.applied);
            trace!(dropped, "Discarded redo branch");
        }
        trace!(kind = ?entry.kind, target = %entry.target, property = %entry.property, "Recorded change");
        self.entries.push(entry);
        self.applied = self.entries.len();
    }

    /// Drop whole groups from the front until the log fits.
    fn enforce_limit(&mut self) {
        let Some(limit) = self.limit else {
            return;
        };
        let mut excess = 0;
        while self.entries.len() - excess > limit {
            let group = self.entries[excess].group;
            excess += 1;
            if group.is_some() {
                while excess < self.entries.len() && self.entries[excess].group == group {
                    excess += 1;
                }
            }
        }
        if excess > 0 {
            self.entries.drain(..excess);
            self.applied = self.applied.saturating_sub(excess);
            debug!(dropped = excess, limit, "Trimmed history");
        }
    }

    /// Undo the entry (or group) at the cursor. Returns false when there is nothing to undo.
    pub fn undo(&mut self, applier: &mut impl StyleApplier) -> bool {
        if self.applied == 0 {
            return false;
        }
        let end = self.applied;
        let start = self.step_start(end);
        for entry in self.entries[start..end].iter().rev() {
            applier.apply(entry.kind, &entry.target, &entry.property, &entry.old_value);
        }
        self.applied = start;
        debug!(undone = end - start, cursor = self.cursor(), "Undo");
        true
    }

    /// Redo the entry (or group) after the cursor. Returns false at the end of the log.
    pub fn redo(&mut self, applier: &mut impl StyleApplier) -> bool {
        if self.applied >= self.entries.len() {
            return false;
        }
        let start = self.applied;
        let end = self.step_end(start);
        for entry in &self.entries[start..end] {
            applier.apply(entry.kind, &entry.target, &entry.property, &entry.new_value);
        }
        self.applied = end;
        debug!(redone = end - start, cursor = self.cursor(), "Redo");
        true
    }

    /// First index of the step ending just before `end`.
    fn step_start(&self, end: usize) -> usize {
        let mut start = end - 1;
        if let Some(group) = self.entries[start].group {
            while start > 0 && self.entries[start - 1].group == Some(group) {
                start -= 1;
            }
        }
        start
    }

    /// One past the last index of the step beginning at `start`.
    fn step_end(&self, start: usize) -> usize {
        let mut end = start + 1;
        if let Some(group) = self.entries[start].group {
            while end < self.entries.len() && self.entries[end].group == Some(group) {
                end += 1;
            }
        }
        end
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    /// Index of the last applied entry; `-1` when nothing is applied.
    pub fn cursor(&self) -> isize {
        self.applied as isize - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// The entry the next `undo` would revert.
    pub fn peek_undo(&self) -> Option<&HistoryEntry> {
        self.applied.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// The entry the next `redo` would reapply.
    pub fn peek_redo(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.applied)
    }

    /// Forget every entry. The store is left as is.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.applied = 0;
        debug!("Cleared history");
    }
}
