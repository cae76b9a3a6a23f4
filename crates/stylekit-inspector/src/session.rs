//! Inspector session state.
//!
//! The coordinator UI panels talk to. It owns the document, the style rule
//! store, history and selection, plus UI-only flags. Every style mutation
//! goes through here so it can be recorded and counted.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use stylekit_css::{normalize_property, CssError, ResolvedValue, StyleRuleStore};
use stylekit_dom::{escape_identifier, Document, NodeId};
use tracing::{debug, info, warn};

use crate::config::{InspectorConfig, PathConfig};
use crate::export::{self, DesignToken, TailwindConfig};
use crate::history::{DocumentStyleApplier, HistoryManager, StyleChange};
use crate::path::PathResolver;
use crate::selection::{SelectOptions, SelectionManager, SelectionMode};
use crate::snapshot::{SnapshotBackend, SnapshotStore, StyleSession};
use crate::InspectorError;

/// Responsive breakpoint being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    #[default]
    Base,
    Sm,
    Md,
    Lg,
    Xl,
}

impl Breakpoint {
    /// Minimum viewport width in CSS pixels.
    pub fn min_width(self) -> u32 {
        match self {
            Breakpoint::Base => 0,
            Breakpoint::Sm => 640,
            Breakpoint::Md => 768,
            Breakpoint::Lg => 1024,
            Breakpoint::Xl => 1280,
        }
    }
}

/// Builder for [`InspectorSession`].
#[derive(Debug, Default)]
pub struct InspectorSessionBuilder {
    config: InspectorConfig,
    document: Option<Document>,
}

impl InspectorSessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: InspectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set how element paths are computed.
    pub fn path_config(mut self, path: PathConfig) -> Self {
        self.config.path = path;
        self
    }

    /// Cap the number of history entries kept.
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = Some(limit);
        self
    }

    /// Set the starting selection mode.
    pub fn selection_mode(mut self, mode: SelectionMode) -> Self {
        self.config.selection_mode = mode;
        self
    }

    /// Edit this document instead of an empty one.
    pub fn document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    /// Build the session.
    pub fn build(self) -> InspectorSession {
        let config = self.config;
        let resolver = PathResolver::new(config.path.clone());
        InspectorSession {
            document: self.document.unwrap_or_default(),
            store: StyleRuleStore::new(),
            history: HistoryManager::with_limit(config.history_limit),
            selection: SelectionManager::new(resolver).with_mode(config.selection_mode),
            panel_visible: config.panel_visible,
            breakpoint: config.breakpoint,
            style_change_counter: 0,
            config,
        }
    }
}

/// One inspector session over one document.
#[derive(Debug)]
pub struct InspectorSession {
    config: InspectorConfig,
    document: Document,
    store: StyleRuleStore,
    history: HistoryManager,
    selection: SelectionManager,
    panel_visible: bool,
    breakpoint: Breakpoint,
    /// Bumped on every style mutation, undo and redo.
    style_change_counter: u64,
}

impl Default for InspectorSession {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl InspectorSession {
    pub fn builder() -> InspectorSessionBuilder {
        InspectorSessionBuilder::new()
    }

    /// Session over `document` with the default configuration.
    pub fn new(document: Document) -> Self {
        Self::builder().document(document).build()
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Structural edits made here are not tracked; call
    /// [`refresh_selection`](Self::refresh_selection) afterwards.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn store(&self) -> &StyleRuleStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    /// For subscribing listeners and queries that need `&mut`.
    pub fn selection_mut(&mut self) -> &mut SelectionManager {
        &mut self.selection
    }

    // =======================================================================
    // Selection
    // =======================================================================

    pub fn select(&mut self, node: NodeId, options: SelectOptions) -> bool {
        self.selection.select(&self.document, node, options)
    }

    pub fn select_multiple(&mut self, nodes: &[NodeId]) -> usize {
        self.selection.select_multiple(&self.document, nodes)
    }

    pub fn select_by_path(&mut self, path: &str, options: SelectOptions) -> bool {
        self.selection.select_by_path(&self.document, path, options)
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.selection.set_selection_mode(mode);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Drop members that left the document. Returns how many were dropped.
    pub fn refresh_selection(&mut self) -> usize {
        self.selection.refresh(&self.document)
    }

    /// Selector edits to `node` are keyed by: its first non-internal class,
    /// else its id, else its path.
    pub fn selector_for(&self, node: NodeId) -> Option<String> {
        let resolver = self.selection.resolver();
        if resolver.is_tooling_node(&self.document, node) {
            return None;
        }
        let element = self.document.element(node)?;
        let prefix = &resolver.config().internal_class_prefix;
        if let Some(class) = element.classes().find(|c| !c.starts_with(prefix.as_str())) {
            return Some(format!(".{}", escape_identifier(class)));
        }
        if let Some(id) = element.id() {
            return Some(format!("#{}", escape_identifier(id)));
        }
        resolver
            .compute_path(&self.document, node)
            .map(|path| path.as_str().to_string())
    }

    // =======================================================================
    // Style edits
    // =======================================================================

    /// Set `property: value` through the rule store for every selected node.
    ///
    /// Members sharing a selector are written once. The whole batch is one
    /// undo step; if any write fails the ones already made are reverted and
    /// the error returned. Returns the number of declarations that changed;
    /// an empty selection is a no-op.
    pub fn update_style(&mut self, property: &str, value: &str) -> Result<usize, InspectorError> {
        let property = normalize_property(property)?;
        validate_value(value)?;

        let mut selectors: Vec<String> = Vec::new();
        for handle in self.selection.selected_elements() {
            if let Some(selector) = self.selector_for(handle.node) {
                if !selectors.contains(&selector) {
                    selectors.push(selector);
                }
            }
        }
        if selectors.is_empty() {
            debug!(property = %property, "Style update with empty selection");
            return Ok(0);
        }

        let mut changes = Vec::with_capacity(selectors.len());
        for selector in &selectors {
            match self.upsert_change(selector, &property, value) {
                Ok(Some(change)) => changes.push(change),
                Ok(None) => {}
                Err(e) => {
                    self.revert(&changes);
                    return Err(e.into());
                }
            }
        }
        Ok(self.commit(changes))
    }

    /// Set `property: value` on one selector, recorded as one undo step.
    ///
    /// Returns false when the value was already in place.
    pub fn update_style_for(
        &mut self,
        selector: &str,
        property: &str,
        value: &str,
    ) -> Result<bool, InspectorError> {
        let property = normalize_property(property)?;
        let change = self.upsert_change(selector, &property, value)?;
        Ok(self.commit(change.into_iter().collect()) > 0)
    }

    /// Write a preset inline on every selected node, bypassing the rule store.
    ///
    /// All writes form one undo step. Invalid declarations are skipped.
    /// Returns the number of inline values that changed.
    pub fn apply_preset_to_selection(&mut self, declarations: &[(&str, &str)]) -> usize {
        let mut changes = Vec::new();
        for (property, value) in declarations {
            let property = match normalize_property(property) {
                Ok(property) => property,
                Err(e) => {
                    warn!(error = %e, "Skipping preset declaration");
                    continue;
                }
            };
            if let Err(e) = validate_value(value) {
                warn!(property = %property, error = %e, "Skipping preset declaration");
                continue;
            }
            let value = value.trim();
            for write in self.selection.apply_style_to_all(&mut self.document, &property, value) {
                let previous = write.previous.unwrap_or_default();
                if previous != value {
                    changes.push(StyleChange::inline(write.path, property.clone(), previous, value));
                }
            }
        }
        self.commit(changes)
    }

    /// Upsert and describe the change, or `None` if nothing changed.
    fn upsert_change(
        &mut self,
        selector: &str,
        property: &str,
        value: &str,
    ) -> Result<Option<StyleChange>, CssError> {
        let selector = selector.trim();
        let old_value = self.store.get(selector, property).unwrap_or_default();
        self.store.upsert(selector, property, value)?;
        let new_value = self.store.get(selector, property).unwrap_or_default();
        if old_value == new_value {
            return Ok(None);
        }
        Ok(Some(StyleChange::class(selector, property, old_value, new_value)))
    }

    fn revert(&mut self, changes: &[StyleChange]) {
        for change in changes.iter().rev() {
            if let Err(e) = self.store.upsert(&change.target, &change.property, &change.old_value) {
                warn!(selector = %change.target, error = %e, "Failed to revert partial update");
            }
        }
    }

    /// Record `changes` as one step and bump the counter. Returns the count.
    fn commit(&mut self, mut changes: Vec<StyleChange>) -> usize {
        let count = changes.len();
        match count {
            0 => return 0,
            1 => {
                if let Some(change) = changes.pop() {
                    self.history.record(change);
                }
            }
            _ => {
                self.history.record_group(changes);
            }
        }
        self.style_change_counter += 1;
        count
    }

    // =======================================================================
    // History
    // =======================================================================

    pub fn undo(&mut self) -> bool {
        let mut applier = DocumentStyleApplier {
            store: &mut self.store,
            doc: &mut self.document,
            resolver: self.selection.resolver(),
        };
        let undone = self.history.undo(&mut applier);
        if undone {
            self.style_change_counter += 1;
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let mut applier = DocumentStyleApplier {
            store: &mut self.store,
            doc: &mut self.document,
            resolver: self.selection.resolver(),
        };
        let redone = self.history.redo(&mut applier);
        if redone {
            self.style_change_counter += 1;
        }
        redone
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // =======================================================================
    // Computed values
    // =======================================================================

    pub fn computed_value(&self, node: NodeId, property: &str) -> Option<ResolvedValue> {
        self.store.resolve(&self.document, node, property)
    }

    /// Computed value on the primary node, for detail panels.
    pub fn primary_value(&self, property: &str) -> Option<String> {
        let primary = self.selection.primary_element()?;
        self.computed_value(primary.node, property).map(|v| v.value)
    }

    // =======================================================================
    // UI flags
    // =======================================================================

    /// Returns the new visibility.
    pub fn toggle_panel(&mut self) -> bool {
        self.panel_visible = !self.panel_visible;
        self.panel_visible
    }

    pub fn panel_visible(&self) -> bool {
        self.panel_visible
    }

    pub fn set_breakpoint(&mut self, breakpoint: Breakpoint) {
        self.breakpoint = breakpoint;
    }

    pub fn breakpoint(&self) -> Breakpoint {
        self.breakpoint
    }

    pub fn style_change_counter(&self) -> u64 {
        self.style_change_counter
    }

    // =======================================================================
    // Export / import
    // =======================================================================

    pub fn export_css(&self) -> String {
        self.store.export_css()
    }

    pub fn export_json(&self) -> Result<String, InspectorError> {
        export::to_json(&self.store.all_styles())
    }

    pub fn export_tailwind_config(&self) -> TailwindConfig {
        export::to_tailwind_config(&self.store.all_styles())
    }

    pub fn export_design_tokens(&self) -> Vec<DesignToken> {
        export::to_design_tokens(&self.store.all_styles())
    }

    /// Merge styles JSON (bare map or session record) into the store as one
    /// undo step. Invalid declarations are skipped.
    ///
    /// Returns false, changing nothing, if the text is malformed.
    pub fn import_json(&mut self, text: &str) -> bool {
        let styles = match export::parse_styles_json(text) {
            Ok(styles) => styles,
            Err(e) => {
                warn!(error = %e, "Rejected styles import");
                return false;
            }
        };
        let mut changes = Vec::new();
        for (selector, declarations) in &styles {
            for (property, value) in declarations {
                match self.upsert_change(selector, property, value) {
                    Ok(Some(change)) => changes.push(change),
                    Ok(None) => {}
                    Err(e) => warn!(selector = %selector, property = %property, error = %e, "Skipping imported declaration"),
                }
            }
        }
        let count = self.commit(changes);
        info!(changed = count, "Imported styles");
        true
    }

    // =======================================================================
    // Snapshots
    // =======================================================================

    /// Remove every rule. Not recorded in history.
    pub fn clear_styles(&mut self) {
        self.store.clear();
        self.style_change_counter += 1;
    }

    pub fn save_snapshot<B: SnapshotBackend>(
        &self,
        snapshots: &mut SnapshotStore<B>,
        name: &str,
    ) -> Result<StyleSession, InspectorError> {
        snapshots.save(name, self.store.all_styles())
    }

    /// Replace the store's rules with a saved session's. Not recorded in history.
    ///
    /// Returns the number of declarations restored.
    pub fn restore_snapshot(&mut self, session: &StyleSession) -> usize {
        self.store.clear();
        let restored = self.store.import_styles(&session.styles);
        self.style_change_counter += 1;
        info!(id = %session.id, restored, "Restored style session");
        restored
    }
}

fn validate_value(value: &str) -> Result<(), CssError> {
    if value.contains(&['{', '}', ';'][..]) {
        return Err(CssError::InvalidValue(value.trim().to_string()));
    }
    Ok(())
}

thread_local! {
    static DEFAULT_SESSION: RefCell<InspectorSession> = RefCell::new(InspectorSession::default());
}

/// Run `f` against this thread's default session.
///
/// For simple embeddings; sessions built explicitly are independent of it.
/// Must not be called from inside `f`.
pub fn with_default_session<R>(f: impl FnOnce(&mut InspectorSession) -> R) -> R {
    DEFAULT_SESSION.with(|session| f(&mut session.borrow_mut()))
}
