//! Path-based node addressing.
//!
//! A path is a selector string built from one segment per ancestor, from the
//! selection root down to the node:
//!
//! ```text
//! body > main#content > div.card.featured:nth-of-type(2) > p
//! ```
//!
//! Each segment is the tag, then either `#id` (ids are treated as unique, so
//! nothing else is added) or up to two class tokens, then `:nth-of-type(n)`
//! only when a same-tag sibling would match the segment too. Nodes inside an
//! inspector-owned subtree have no path at all.
//!
//! A path is a best-effort address, not a stable identifier: restructuring the
//! tree can make it resolve to a different node or to nothing. Paths persisted
//! outside a session carry [`PATH_FORMAT_VERSION`] and are only resolved when
//! the version matches.

use std::fmt;

use serde::{Deserialize, Serialize};
use stylekit_dom::{escape_identifier, Document, NodeId, SelectorList};
use tracing::{debug, trace, warn};

use crate::config::PathConfig;
use crate::InspectorError;

/// Version of the path string format produced by [`PathResolver`].
pub const PATH_FORMAT_VERSION: u32 = 1;

/// One ancestor's contribution to a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub nth_of_type: Option<usize>,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)?;
        if let Some(id) = &self.id {
            return write!(f, "#{}", escape_identifier(id));
        }
        for class in &self.classes {
            write!(f, ".{}", escape_identifier(class))?;
        }
        if let Some(n) = self.nth_of_type {
            write!(f, ":nth-of-type({})", n)?;
        }
        Ok(())
    }
}

/// A computed path, root to leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementPath {
    segments: Vec<PathSegment>,
    provisional: bool,
    rendered: String,
}

impl ElementPath {
    fn new(segments: Vec<PathSegment>, provisional: bool) -> Self {
        let rendered = segments
            .iter()
            .map(PathSegment::to_string)
            .collect::<Vec<_>>()
            .join(" > ");
        Self {
            segments,
            provisional,
            rendered,
        }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn leaf(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// True when the node was not attached beneath the selection root when the
    /// path was computed. Such a path may not resolve back to the node.
    pub fn is_provisional(&self) -> bool {
        self.provisional
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// A path as stored outside a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedPath {
    pub version: u32,
    pub path: String,
}

impl PersistedPath {
    pub fn validate(&self) -> Result<(), InspectorError> {
        if self.version != PATH_FORMAT_VERSION {
            return Err(InspectorError::PathVersion {
                expected: PATH_FORMAT_VERSION,
                found: self.version,
            });
        }
        Ok(())
    }
}

/// A live node reference plus the path it had when it was addressed.
///
/// Only the path may be persisted; the node id is meaningful for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    pub node: NodeId,
    pub path: ElementPath,
}

impl NodeHandle {
    /// The path string, used as the selection key.
    pub fn key(&self) -> &str {
        self.path.as_str()
    }
}

/// Computes and resolves element paths.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    config: PathConfig,
}

impl PathResolver {
    pub fn new(config: PathConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PathConfig {
        &self.config
    }

    /// Whether the node or any ancestor carries the tooling marker. Such nodes
    /// belong to the inspector's own UI and are never addressed.
    pub fn is_tooling_node(&self, doc: &Document, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if doc
                .element(id)
                .is_some_and(|e| e.has_attribute(&self.config.tooling_attribute))
            {
                return true;
            }
            current = doc.parent(id);
        }
        false
    }

    /// Compute the path for an element.
    ///
    /// Returns `None` for non-elements and for inspector-owned nodes. A node that
    /// is not attached beneath the boundary gets a provisional path built from
    /// whatever ancestor chain exists.
    pub fn compute_path(&self, doc: &Document, node: NodeId) -> Option<ElementPath> {
        doc.element(node)?;
        if self.is_tooling_node(doc, node) {
            return None;
        }

        // Collected leaf to root.
        let mut segments = Vec::new();
        let mut reached_boundary = false;
        let mut current = Some(node);

        while let Some(id) = current {
            let Some(element) = doc.element(id) else {
                break;
            };
            if element.tag_name().eq_ignore_ascii_case(&self.config.boundary_tag) {
                segments.push(PathSegment {
                    tag: element.tag_name().to_string(),
                    id: None,
                    classes: Vec::new(),
                    nth_of_type: None,
                });
                reached_boundary = true;
                break;
            }
            segments.push(self.segment_for(doc, id));
            current = doc.parent_element(id);
        }

        segments.reverse();
        let provisional = !reached_boundary || !doc.is_attached(node);
        let path = ElementPath::new(segments, provisional);
        if provisional {
            debug!(node = %node, path = %path, "Computed provisional path");
        } else {
            trace!(node = %node, path = %path, "Computed path");
        }
        Some(path)
    }

    fn segment_for(&self, doc: &Document, node: NodeId) -> PathSegment {
        let Some(element) = doc.element(node) else {
            return PathSegment {
                tag: String::new(),
                id: None,
                classes: Vec::new(),
                nth_of_type: None,
            };
        };
        let tag = element.tag_name().to_string();

        if let Some(id) = element.id() {
            return PathSegment {
                tag,
                id: Some(id.to_string()),
                classes: Vec::new(),
                nth_of_type: None,
            };
        }

        let classes: Vec<String> = element
            .classes()
            .filter(|c| !c.starts_with(&self.config.internal_class_prefix))
            .take(self.config.max_classes)
            .map(str::to_string)
            .collect();

        let ambiguous = doc.parent(node).is_some_and(|parent| {
            doc.element_children(parent).any(|sibling| {
                sibling != node
                    && doc.element(sibling).is_some_and(|s| {
                        s.tag_name() == tag && classes.iter().all(|c| s.has_class(c))
                    })
            })
        });

        PathSegment {
            tag,
            id: None,
            classes,
            nth_of_type: if ambiguous { doc.index_of_type(node) } else { None },
        }
    }

    /// Handle for a node, if it is addressable.
    pub fn handle(&self, doc: &Document, node: NodeId) -> Option<NodeHandle> {
        let path = self.compute_path(doc, node)?;
        Some(NodeHandle { node, path })
    }

    /// Re-locate a node from its path string.
    ///
    /// A path that no longer matches anything (or no longer parses) yields
    /// `None`; deciding whether that breaks a selection is the caller's job.
    pub fn resolve_path(&self, doc: &Document, path: &str) -> Option<NodeId> {
        let selectors = match SelectorList::parse(path) {
            Ok(selectors) => selectors,
            Err(e) => {
                warn!(path, error = %e, "Unresolvable path");
                return None;
            }
        };
        let found = doc
            .select_all(&selectors)
            .into_iter()
            .find(|id| !self.is_tooling_node(doc, *id));
        if found.is_none() {
            debug!(path, "Path did not resolve");
        }
        found
    }

    /// Wrap a path for storage, stamped with the current format version.
    pub fn persist(&self, path: &ElementPath) -> PersistedPath {
        PersistedPath {
            version: PATH_FORMAT_VERSION,
            path: path.as_str().to_string(),
        }
    }

    /// Resolve a stored path. Mismatched format versions are never looked up.
    pub fn resolve_persisted(&self, doc: &Document, persisted: &PersistedPath) -> Option<NodeId> {
        if let Err(e) = persisted.validate() {
            warn!(path = %persisted.path, error = %e, "Skipping stored path");
            return None;
        }
        self.resolve_path(doc, &persisted.path)
    }
}
