//! Multi-node selection.
//!
//! Members are keyed by path string. One member is the primary node that
//! drives detail panels. Every call that changes membership, the primary
//! node, the mode, or members' inline styles notifies listeners once,
//! synchronously, before returning.

use std::fmt;

use serde::{Deserialize, Serialize};
use stylekit_dom::{Document, NodeId};
use tracing::{debug, trace, warn};

use crate::path::{NodeHandle, PathResolver};

/// How a plain `select` treats existing members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// At most one member; selecting replaces.
    #[default]
    Single,
    /// Selecting adds.
    Multi,
    /// Selecting adds every sibling between the primary node and the target.
    Range,
}

/// Modifiers for [`SelectionManager::select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectOptions {
    pub add: bool,
    pub toggle: bool,
}

impl SelectOptions {
    pub fn add() -> Self {
        Self {
            add: true,
            toggle: false,
        }
    }

    pub fn toggle() -> Self {
        Self {
            add: false,
            toggle: true,
        }
    }
}

/// Handle returned by [`SelectionManager::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Why listeners were notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    Selected,
    Deselected,
    Replaced,
    Cleared,
    ModeChanged,
    StyleApplied,
    Refreshed,
}

/// What listeners receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub count: usize,
    pub primary: Option<String>,
    pub reason: ChangeReason,
}

/// One inline write made by [`SelectionManager::apply_style_to_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineChange {
    pub path: String,
    pub node: NodeId,
    pub previous: Option<String>,
}

type Listener = Box<dyn FnMut(&SelectionChange)>;

/// The selection set, primary node and mode.
pub struct SelectionManager {
    resolver: PathResolver,
    members: Vec<NodeHandle>,
    /// Key of the primary member.
    primary: Option<String>,
    mode: SelectionMode,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_listener: u64,
}

impl fmt::Debug for SelectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionManager")
            .field("members", &self.members)
            .field("primary", &self.primary)
            .field("mode", &self.mode)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for SelectionManager {
    fn default() -> Self {
        Self::new(PathResolver::default())
    }
}

impl SelectionManager {
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            members: Vec::new(),
            primary: None,
            mode: SelectionMode::Single,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn with_mode(mut self, mode: SelectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    // =======================================================================
    // Selection
    // =======================================================================

    /// Select `node` according to `options` and the current mode.
    ///
    /// Returns false when the node cannot be addressed (not an element, or
    /// inspector-owned); the selection is left untouched.
    pub fn select(&mut self, doc: &Document, node: NodeId, options: SelectOptions) -> bool {
        let Some(handle) = self.resolver.handle(doc, node) else {
            debug!(node = %node, "Ignoring unaddressable node");
            return false;
        };

        if options.toggle {
            if self.is_selected(handle.key()) {
                self.remove(handle.key());
                self.notify(ChangeReason::Deselected);
            } else {
                self.insert(handle);
                self.notify(ChangeReason::Selected);
            }
            return true;
        }

        if options.add || self.mode == SelectionMode::Multi {
            if self.insert(handle) {
                self.notify(ChangeReason::Selected);
            }
            return true;
        }

        if self.mode == SelectionMode::Range {
            let range = self
                .primary_element()
                .and_then(|primary| siblings_between(doc, primary.node, node));
            let mut changed = false;
            match range {
                Some(nodes) => {
                    for sibling in nodes {
                        if let Some(h) = self.resolver.handle(doc, sibling) {
                            changed |= self.insert(h);
                        }
                    }
                }
                None => changed = self.insert(handle),
            }
            if changed {
                self.notify(ChangeReason::Selected);
            }
            return true;
        }

        let key = handle.key().to_string();
        self.members = vec![handle];
        self.primary = Some(key);
        self.notify(ChangeReason::Replaced);
        true
    }

    /// Replace the selection with `nodes`; the first addressable one is primary.
    ///
    /// Returns the new member count.
    pub fn select_multiple(&mut self, doc: &Document, nodes: &[NodeId]) -> usize {
        let mut handles: Vec<NodeHandle> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Some(handle) = self.resolver.handle(doc, *node) {
                if !handles.iter().any(|h| h.key() == handle.key()) {
                    handles.push(handle);
                }
            }
        }
        if handles.len() > 1 {
            self.promote_from_single();
        }
        self.primary = handles.first().map(|h| h.key().to_string());
        self.members = handles;
        let reason = if self.members.is_empty() {
            ChangeReason::Cleared
        } else {
            ChangeReason::Replaced
        };
        self.notify(reason);
        self.members.len()
    }

    /// Select the node a path string resolves to. An identity miss returns false.
    pub fn select_by_path(
        &mut self,
        doc: &Document,
        path: &str,
        options: SelectOptions,
    ) -> bool {
        match self.resolver.resolve_path(doc, path) {
            Some(node) => self.select(doc, node, options),
            None => false,
        }
    }

    pub fn clear(&mut self) {
        if self.members.is_empty() {
            return;
        }
        self.members.clear();
        self.primary = None;
        self.notify(ChangeReason::Cleared);
    }

    /// Change mode. Entering `Single` with several members keeps only the primary.
    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        let collapse = mode == SelectionMode::Single && self.members.len() > 1;
        if mode == self.mode && !collapse {
            return;
        }
        if collapse {
            let keep = self
                .primary
                .clone()
                .or_else(|| self.members.first().map(|h| h.key().to_string()));
            self.members.retain(|h| Some(h.key()) == keep.as_deref());
            self.primary = keep;
            debug!(kept = ?self.primary, "Collapsed selection to primary");
        }
        self.mode = mode;
        self.notify(ChangeReason::ModeChanged);
    }

    /// Recompute every member's path. Members that left the document are dropped.
    ///
    /// Returns the number of members dropped.
    pub fn refresh(&mut self, doc: &Document) -> usize {
        let before = self.members.len();
        let old_primary = self.primary_element().map(|h| h.node);
        let mut refreshed: Vec<NodeHandle> = Vec::with_capacity(before);
        for member in &self.members {
            if !doc.is_attached(member.node) {
                debug!(path = %member.path, "Dropping detached member");
                continue;
            }
            match self.resolver.handle(doc, member.node) {
                Some(handle) if !refreshed.iter().any(|h| h.key() == handle.key()) => {
                    refreshed.push(handle)
                }
                Some(_) => {}
                None => debug!(path = %member.path, "Dropping unaddressable member"),
            }
        }
        self.primary = old_primary
            .and_then(|node| refreshed.iter().find(|h| h.node == node))
            .or_else(|| refreshed.first())
            .map(|h| h.key().to_string());
        self.members = refreshed;
        self.notify(ChangeReason::Refreshed);
        before - self.members.len()
    }

    // =======================================================================
    // Batch inline edits
    // =======================================================================

    /// Write `property: value` inline on every member.
    ///
    /// Bypasses the rule store. Listeners are notified once after all writes.
    /// An empty selection is a no-op.
    pub fn apply_style_to_all(
        &mut self,
        doc: &mut Document,
        property: &str,
        value: &str,
    ) -> Vec<InlineChange> {
        if self.members.is_empty() {
            trace!(property, "Batch apply on empty selection");
            return Vec::new();
        }
        let mut changes = Vec::with_capacity(self.members.len());
        for member in &self.members {
            match doc.set_inline_style(member.node, property, value) {
                Ok(previous) => changes.push(InlineChange {
                    path: member.key().to_string(),
                    node: member.node,
                    previous,
                }),
                Err(e) => warn!(path = %member.path, property, error = %e, "Skipping inline write"),
            }
        }
        debug!(property, value, count = changes.len(), "Applied inline style to selection");
        self.notify(ChangeReason::StyleApplied);
        changes
    }

    // =======================================================================
    // Queries
    // =======================================================================

    pub fn selected_elements(&self) -> &[NodeHandle] {
        &self.members
    }

    pub fn primary_element(&self) -> Option<&NodeHandle> {
        let key = self.primary.as_deref()?;
        self.members.iter().find(|h| h.key() == key)
    }

    pub fn has_selection(&self) -> bool {
        !self.members.is_empty()
    }

    pub fn has_multiple_selection(&self) -> bool {
        self.members.len() > 1
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.members.iter().any(|h| h.key() == path)
    }

    pub fn is_node_selected(&self, node: NodeId) -> bool {
        self.members.iter().any(|h| h.node == node)
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    // =======================================================================
    // Listeners
    // =======================================================================

    pub fn subscribe(&mut self, listener: impl FnMut(&SelectionChange) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        before != self.listeners.len()
    }

    fn notify(&mut self, reason: ChangeReason) {
        let change = SelectionChange {
            count: self.members.len(),
            primary: self.primary.clone(),
            reason,
        };
        trace!(?reason, count = change.count, "Selection changed");
        for (_, listener) in &mut self.listeners {
            listener(&change);
        }
    }

    // =======================================================================
    // Internals
    // =======================================================================

    /// Adding to a single-mode selection switches to multi.
    fn promote_from_single(&mut self) {
        if self.mode == SelectionMode::Single {
            debug!("Promoting selection mode to multi");
            self.mode = SelectionMode::Multi;
        }
    }

    /// Returns false if the key was already a member. A second member
    /// promotes `Single` mode to `Multi`.
    fn insert(&mut self, handle: NodeHandle) -> bool {
        if self.is_selected(handle.key()) {
            return false;
        }
        if self.primary.is_none() {
            self.primary = Some(handle.key().to_string());
        }
        self.members.push(handle);
        if self.members.len() > 1 {
            self.promote_from_single();
        }
        true
    }

    fn remove(&mut self, key: &str) {
        self.members.retain(|h| h.key() != key);
        if self.primary.as_deref() == Some(key) {
            self.primary = self.members.first().map(|h| h.key().to_string());
        }
    }
}

/// Element siblings from `from` to `to` inclusive, in document order.
fn siblings_between(doc: &Document, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
    let parent = doc.parent(from)?;
    if doc.parent(to)? != parent {
        return None;
    }
    let siblings: Vec<NodeId> = doc.element_children(parent).collect();
    let a = siblings.iter().position(|s| *s == from)?;
    let b = siblings.iter().position(|s| *s == to)?;
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    Some(siblings[lo..=hi].to_vec())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn list_doc(n: usize) -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let body = doc.body();
        let ul = doc.create_element_with("ul", &[("id", "list")]);
        doc.append_child(body, ul).unwrap();
        let items = (0..n)
            .map(|i| {
                let class = format!("item-{}", i);
                let li = doc.create_element_with("li", &[("class", class.as_str())]);
                doc.append_child(ul, li).unwrap();
                li
            })
            .collect();
        (doc, items)
    }

    fn recorder(manager: &mut SelectionManager) -> Rc<RefCell<Vec<ChangeReason>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        manager.subscribe(move |change| sink.borrow_mut().push(change.reason));
        seen
    }

    #[test]
    fn test_default_select_replaces() {
        let (doc, items) = list_doc(2);
        let mut sel = SelectionManager::default();
        assert!(sel.select(&doc, items[0], SelectOptions::default()));
        assert!(sel.select(&doc, items[1], SelectOptions::default()));
        assert_eq!(sel.len(), 1);
        assert_eq!(sel.primary_element().unwrap().node, items[1]);
    }

    #[test]
    fn test_toggle_symmetry() {
        let (doc, items) = list_doc(1);
        let mut sel = SelectionManager::default();
        sel.select(&doc, items[0], SelectOptions::default());
        sel.select(&doc, items[0], SelectOptions::toggle());
        assert!(!sel.has_selection());
        assert!(sel.primary_element().is_none());
    }

    #[test]
    fn test_toggle_reassigns_primary() {
        let (doc, items) = list_doc(3);
        let mut sel = SelectionManager::default().with_mode(SelectionMode::Multi);
        for item in &items {
            sel.select(&doc, *item, SelectOptions::default());
        }
        assert_eq!(sel.primary_element().unwrap().node, items[0]);
        sel.select(&doc, items[0], SelectOptions::toggle());
        assert_eq!(sel.len(), 2);
        assert_eq!(sel.primary_element().unwrap().node, items[1]);
    }

    #[test]
    fn test_add_in_single_mode_promotes() {
        let (doc, items) = list_doc(2);
        let mut sel = SelectionManager::default();
        sel.select(&doc, items[0], SelectOptions::default());
        sel.select(&doc, items[1], SelectOptions::add());
        assert_eq!(sel.mode(), SelectionMode::Multi);
        assert!(sel.has_multiple_selection());
        assert_eq!(sel.primary_element().unwrap().node, items[0]);
    }

    #[test]
    fn test_toggle_into_empty_set_stays_single() {
        let (doc, items) = list_doc(2);
        let mut sel = SelectionManager::default();
        sel.select(&doc, items[0], SelectOptions::toggle());
        assert_eq!(sel.mode(), SelectionMode::Single);

        sel.select(&doc, items[1], SelectOptions::default());
        assert_eq!(sel.len(), 1);
        assert_eq!(sel.primary_element().unwrap().node, items[1]);
    }

    #[test]
    fn test_add_without_growth_stays_single() {
        let (doc, items) = list_doc(2);
        let mut sel = SelectionManager::default();
        sel.select(&doc, items[0], SelectOptions::add());
        sel.select(&doc, items[0], SelectOptions::add());
        assert_eq!(sel.mode(), SelectionMode::Single);
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_single_mode_collapse_keeps_primary() {
        let (doc, items) = list_doc(3);
        let mut sel = SelectionManager::default().with_mode(SelectionMode::Multi);
        sel.select_multiple(&doc, &[items[1], items[0], items[2]]);
        sel.set_selection_mode(SelectionMode::Single);
        assert_eq!(sel.len(), 1);
        assert_eq!(sel.selected_elements()[0].node, items[1]);
        assert_eq!(sel.primary_element().unwrap().node, items[1]);
    }

    #[test]
    fn test_mode_switch_without_collapse_keeps_members() {
        let (doc, items) = list_doc(2);
        let mut sel = SelectionManager::default().with_mode(SelectionMode::Multi);
        sel.select_multiple(&doc, &items);
        sel.set_selection_mode(SelectionMode::Range);
        assert_eq!(sel.len(), 2);
    }

    #[test]
    fn test_select_multiple_dedupes() {
        let (doc, items) = list_doc(2);
        let mut sel = SelectionManager::default();
        assert_eq!(sel.select_multiple(&doc, &[items[0], items[0], items[1]]), 2);
        assert_eq!(sel.mode(), SelectionMode::Multi);
        assert_eq!(sel.primary_element().unwrap().node, items[0]);
    }

    #[test]
    fn test_range_selects_siblings() {
        let (doc, items) = list_doc(5);
        let mut sel = SelectionManager::default().with_mode(SelectionMode::Range);
        sel.select(&doc, items[3], SelectOptions::default());
        sel.select(&doc, items[1], SelectOptions::default());
        let nodes: Vec<NodeId> = sel.selected_elements().iter().map(|h| h.node).collect();
        assert_eq!(nodes, vec![items[3], items[1], items[2]]);
        assert_eq!(sel.primary_element().unwrap().node, items[3]);
    }

    #[test]
    fn test_range_across_parents_adds() {
        let (mut doc, items) = list_doc(1);
        let body = doc.body();
        let footer = doc.create_element("footer");
        doc.append_child(body, footer).unwrap();
        let mut sel = SelectionManager::default().with_mode(SelectionMode::Range);
        sel.select(&doc, items[0], SelectOptions::default());
        sel.select(&doc, footer, SelectOptions::default());
        assert_eq!(sel.len(), 2);
    }

    #[test]
    fn test_tooling_node_not_selectable() {
        let mut doc = Document::new();
        let body = doc.body();
        let overlay = doc.create_element_with("div", &[("data-stylekit", "overlay")]);
        doc.append_child(body, overlay).unwrap();
        let mut sel = SelectionManager::default();
        assert!(!sel.select(&doc, overlay, SelectOptions::default()));
        assert!(!sel.has_selection());
    }

    #[test]
    fn test_apply_style_to_all_notifies_once() {
        let (mut doc, items) = list_doc(3);
        let mut sel = SelectionManager::default();
        sel.select_multiple(&doc, &items);
        let seen = recorder(&mut sel);

        let changes = sel.apply_style_to_all(&mut doc, "opacity", "0.5");
        assert_eq!(changes.len(), 3);
        assert!(items.iter().all(|i| doc.inline_style(*i, "opacity") == Some("0.5")));
        assert_eq!(*seen.borrow(), vec![ChangeReason::StyleApplied]);
    }

    #[test]
    fn test_apply_on_empty_selection_is_noop() {
        let (mut doc, _) = list_doc(1);
        let mut sel = SelectionManager::default();
        let seen = recorder(&mut sel);
        assert!(sel.apply_style_to_all(&mut doc, "color", "red").is_empty());
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_refresh_drops_detached_members() {
        let (mut doc, items) = list_doc(3);
        let mut sel = SelectionManager::default();
        sel.select_multiple(&doc, &items);
        doc.detach(items[0]).unwrap();

        assert_eq!(sel.refresh(&doc), 1);
        assert_eq!(sel.len(), 2);
        assert_eq!(sel.primary_element().unwrap().node, items[1]);
    }

    #[test]
    fn test_select_by_path_identity_miss() {
        let (doc, items) = list_doc(1);
        let mut sel = SelectionManager::default();
        assert!(sel.select_by_path(&doc, "body > ul#list > li.item-0", SelectOptions::default()));
        assert!(sel.is_node_selected(items[0]));
        assert!(!sel.select_by_path(&doc, "body > ul#gone", SelectOptions::default()));
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let (doc, items) = list_doc(1);
        let mut sel = SelectionManager::default();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = sel.subscribe(move |_| *sink.borrow_mut() += 1);

        sel.select(&doc, items[0], SelectOptions::default());
        assert!(sel.unsubscribe(id));
        assert!(!sel.unsubscribe(id));
        sel.clear();
        assert_eq!(*count.borrow(), 1);
    }
}
