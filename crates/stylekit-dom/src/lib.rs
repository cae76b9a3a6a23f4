//! # StyleKit DOM
//!
//! The live document tree edited by the StyleKit inspector.
//!
//! ## Design Goals
//!
//! 1. **Arena storage**: Nodes live in one arena and are addressed by [`NodeId`]
//! 2. **Detach, never free**: Removing a node detaches it; its id stays valid
//! 3. **Inline declarations**: Each element carries ordered per-node styles
//! 4. **Selector matching**: [`Document::query_selector_all`] matches against the tree

use std::fmt;

use thiserror::Error;
use tracing::{debug, trace};

mod selector;

pub use selector::{
    escape_identifier, Combinator, ComplexSelector, CompoundSelector, SelectorList, Specificity,
};

/// Errors that can occur in DOM operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Not an element: {0}")]
    NotAnElement(NodeId),

    #[error("Hierarchy error: {0}")]
    HierarchyRequest(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

/// Unique identifier for a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// An element attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Element-specific node data.
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    tag_name: String,
    attributes: Vec<Attribute>,
    /// Per-node declarations in insertion order. Backs the `style` attribute.
    inline_style: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Get an attribute value. `style` is serialized from the inline declarations.
    pub fn attribute(&self, name: &str) -> Option<String> {
        if name.eq_ignore_ascii_case("style") {
            if self.inline_style.is_empty() {
                return None;
            }
            return Some(self.style_attribute());
        }
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.clone())
    }

    fn raw_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.raw_attribute(name).is_some()
            || (name.eq_ignore_ascii_case("style") && !self.inline_style.is_empty())
    }

    /// The `id` attribute, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.raw_attribute("id").filter(|id| !id.is_empty())
    }

    /// Class tokens in attribute order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.raw_attribute("class")
            .unwrap_or("")
            .split_whitespace()
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.classes().any(|c| c == class_name)
    }

    /// Inline value for a property.
    pub fn inline_style(&self, property: &str) -> Option<&str> {
        self.inline_style
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    pub fn inline_declarations(&self) -> &[(String, String)] {
        &self.inline_style
    }

    /// Serialize inline declarations the way a `style` attribute reads.
    pub fn style_attribute(&self) -> String {
        self.inline_style
            .iter()
            .map(|(p, v)| format!("{}: {};", p, v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case("style") {
            self.inline_style = parse_style_attribute(value);
            return;
        }
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            Some(attr) => attr.value = value.to_string(),
            None => self.attributes.push(Attribute {
                name: name.to_ascii_lowercase(),
                value: value.to_string(),
            }),
        }
    }

    fn remove_attribute(&mut self, name: &str) -> bool {
        if name.eq_ignore_ascii_case("style") {
            let had = !self.inline_style.is_empty();
            self.inline_style.clear();
            return had;
        }
        let before = self.attributes.len();
        self.attributes.retain(|a| !a.name.eq_ignore_ascii_case(name));
        before != self.attributes.len()
    }

    /// Returns the previous value. An empty value removes the declaration.
    fn set_inline(&mut self, property: &str, value: &str) -> Option<String> {
        let value = value.trim();
        let existing = self.inline_style.iter().position(|(p, _)| p == property);
        if value.is_empty() {
            return existing.map(|idx| self.inline_style.remove(idx).1);
        }
        match existing {
            Some(idx) => Some(std::mem::replace(
                &mut self.inline_style[idx].1,
                value.to_string(),
            )),
            None => {
                self.inline_style
                    .push((property.to_string(), value.to_string()));
                None
            }
        }
    }
}

/// Parse `a: b; c: d` into ordered declarations. Later duplicates win in place.
fn parse_style_attribute(value: &str) -> Vec<(String, String)> {
    let mut declarations: Vec<(String, String)> = Vec::new();
    for decl in value.split(';') {
        let Some((property, val)) = decl.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        let val = val.trim();
        if property.is_empty() || val.is_empty() {
            continue;
        }
        match declarations.iter_mut().find(|(p, _)| *p == property) {
            Some(existing) => existing.1 = val.to_string(),
            None => declarations.push((property, val.to_string())),
        }
    }
    declarations
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeType {
    Document,
    Element(ElementData),
    Text(String),
}

/// A node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    node_type: NodeType,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.node_type, NodeType::Element(_))
    }
}

/// A live document: `#document > html > (head, body)` plus whatever the host appends.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    html: NodeId,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with empty `html`, `head` and `body` elements.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            html: NodeId(0),
            body: NodeId(0),
        };
        doc.root = doc.allocate(NodeType::Document);
        doc.html = doc.create_element("html");
        let head = doc.create_element("head");
        doc.body = doc.create_element("body");
        doc.link(doc.root, doc.html);
        doc.link(doc.html, head);
        doc.link(doc.html, doc.body);
        doc
    }

    fn allocate(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            node_type,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn document_element(&self) -> NodeId {
        self.html
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Number of nodes ever allocated, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0).ok_or(DomError::NodeNotFound(id))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match self.nodes.get_mut(id.0) {
            Some(Node {
                node_type: NodeType::Element(data),
                ..
            }) => Ok(data),
            Some(_) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::NodeNotFound(id)),
        }
    }

    // =======================================================================
    // Node creation
    // =======================================================================

    /// Create a detached element.
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.allocate(NodeType::Element(ElementData::new(tag_name)))
    }

    /// Create a detached element with attributes.
    pub fn create_element_with(&mut self, tag_name: &str, attributes: &[(&str, &str)]) -> NodeId {
        let mut data = ElementData::new(tag_name);
        for (name, value) in attributes {
            data.set_attribute(name, value);
        }
        self.allocate(NodeType::Element(data))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.allocate(NodeType::Text(text.to_string()))
    }

    // =======================================================================
    // Tree mutation
    // =======================================================================

    /// Append `child` as the last child of `parent`, detaching it first if needed.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.detach(child)?;
        self.link(parent, child);
        trace!(%parent, %child, "Appended child");
        Ok(())
    }

    /// Insert `child` before `reference`, which must be a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        if self.node(reference)?.parent != Some(parent) {
            return Err(DomError::HierarchyRequest(format!(
                "{} is not a child of {}",
                reference, parent
            )));
        }
        if child == reference {
            return Ok(());
        }
        self.detach(child)?;
        let idx = self.nodes[parent.0]
            .children
            .iter()
            .position(|c| *c == reference)
            .ok_or(DomError::NodeNotFound(reference))?;
        self.nodes[parent.0].children.insert(idx, child);
        self.nodes[child.0].parent = Some(parent);
        trace!(%parent, %child, %reference, "Inserted child");
        Ok(())
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        if matches!(parent_node.node_type, NodeType::Text(_)) {
            return Err(DomError::HierarchyRequest(format!(
                "{} cannot have children",
                parent
            )));
        }
        if matches!(child_node.node_type, NodeType::Document) {
            return Err(DomError::HierarchyRequest(
                "document node cannot be inserted".to_string(),
            ));
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(DomError::HierarchyRequest(format!(
                "inserting {} under {} would create a cycle",
                child, parent
            )));
        }
        Ok(())
    }

    /// Detach a node (and its subtree) from its parent. Its id stays valid.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            self.nodes[parent.0].children.retain(|c| *c != id);
            self.nodes[id.0].parent = None;
            debug!(node = %id, %parent, "Detached node");
        }
        Ok(())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.element_mut(id)?.set_attribute(name, value);
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<bool, DomError> {
        Ok(self.element_mut(id)?.remove_attribute(name))
    }

    pub fn add_class(&mut self, id: NodeId, class_name: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        if element.has_class(class_name) {
            return Ok(());
        }
        let mut classes: Vec<String> = element.classes().map(str::to_string).collect();
        classes.push(class_name.to_string());
        element.set_attribute("class", &classes.join(" "));
        Ok(())
    }

    pub fn remove_class(&mut self, id: NodeId, class_name: &str) -> Result<bool, DomError> {
        let element = self.element_mut(id)?;
        if !element.has_class(class_name) {
            return Ok(false);
        }
        let classes: Vec<String> = element
            .classes()
            .filter(|c| *c != class_name)
            .map(str::to_string)
            .collect();
        element.set_attribute("class", &classes.join(" "));
        Ok(true)
    }

    /// Set one inline declaration, returning the previous value.
    /// An empty value removes the declaration.
    pub fn set_inline_style(
        &mut self,
        id: NodeId,
        property: &str,
        value: &str,
    ) -> Result<Option<String>, DomError> {
        let previous = self.element_mut(id)?.set_inline(property, value);
        trace!(node = %id, property, value, "Set inline style");
        Ok(previous)
    }

    pub fn inline_style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.inline_style(property))
    }

    // =======================================================================
    // Traversal
    // =======================================================================

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Parent, but only when it is an element.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.element(*p).is_some())
    }

    /// Ancestors, nearest first, up to and including the document node.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.element(*c).is_some())
    }

    /// True when the node is reachable from the document node.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// Elements under `id` in document order, excluding `id` itself.
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if self.element(next).is_some() {
                out.push(next);
            }
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// 1-based position among element siblings sharing the same tag.
    pub fn index_of_type(&self, id: NodeId) -> Option<usize> {
        let tag = self.element(id)?.tag_name();
        let parent = self.parent(id)?;
        self.element_children(parent)
            .filter(|s| self.element(*s).map(ElementData::tag_name) == Some(tag))
            .position(|s| s == id)
            .map(|idx| idx + 1)
    }

    /// Position of `id` within its parent's children.
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    // =======================================================================
    // Selector matching
    // =======================================================================

    /// Whether an element matches any selector in `selectors`.
    pub fn matches(&self, id: NodeId, selectors: &SelectorList) -> bool {
        selectors.matches(self, id)
    }

    /// All attached elements matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selectors = SelectorList::parse(selector)?;
        Ok(self.select_all(&selectors))
    }

    /// First attached element matching `selector`.
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        let selectors = SelectorList::parse(selector)?;
        Ok(self
            .descendant_elements(self.root)
            .into_iter()
            .find(|id| selectors.matches(self, *id)))
    }

    pub fn select_all(&self, selectors: &SelectorList) -> Vec<NodeId> {
        self.descendant_elements(self.root)
            .into_iter()
            .filter(|id| selectors.matches(self, *id))
            .collect()
    }
}
