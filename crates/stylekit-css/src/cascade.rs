//! Cascade resolution for a single property on a single node.
//!
//! Order, lowest to highest: rule declarations by (specificity, source order),
//! then inline declarations; `!important` lifts a declaration above every
//! normal one. `inherit`, and inherited properties with no declaration,
//! resolve against the parent element.

use stylekit_dom::{Document, NodeId, Specificity};
use tracing::trace;

use crate::store::{Declaration, PropertyValue, StyleRuleStore};

/// Properties that inherit by default.
const INHERITED_PROPERTIES: &[&str] = &[
    "color",
    "font-size",
    "font-weight",
    "font-style",
    "font-stretch",
    "font-family",
    "line-height",
    "text-align",
    "letter-spacing",
    "word-spacing",
    "text-indent",
    "text-transform",
    "white-space",
    "word-break",
    "direction",
    "writing-mode",
    "visibility",
    "cursor",
];

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueOrigin {
    /// The node's own inline declaration.
    Inline,
    /// A rule in the injected stylesheet.
    Rule { selector: String },
    /// Inherited from an ancestor element.
    Inherited { from: NodeId },
}

/// A computed value with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedValue {
    pub value: String,
    pub origin: ValueOrigin,
}

/// Resolve `property` on `node` against the store and the node's inline styles.
pub fn resolve_value(
    store: &StyleRuleStore,
    doc: &Document,
    node: NodeId,
    property: &str,
) -> Option<ResolvedValue> {
    let element = doc.element(node)?;

    // (important, inline, specificity, source index)
    let mut winner: Option<((bool, bool, Specificity, usize), Declaration, ValueOrigin)> = None;
    let mut consider = |key: (bool, bool, Specificity, usize), decl: Declaration, origin: ValueOrigin| {
        if winner.as_ref().map_or(true, |(best, _, _)| key >= *best) {
            winner = Some((key, decl, origin));
        }
    };

    for (index, rule) in store.rules().iter().enumerate() {
        let Some(decl) = rule.declaration(property) else {
            continue;
        };
        let Some(specificity) = rule.selectors().matching_specificity(doc, node) else {
            continue;
        };
        consider(
            (decl.important, false, specificity, index),
            decl.clone(),
            ValueOrigin::Rule {
                selector: rule.selector.clone(),
            },
        );
    }

    if let Some(raw) = element.inline_style(property) {
        let decl = Declaration::new(property.to_string(), raw);
        consider(
            (decl.important, true, Specificity::default(), usize::MAX),
            decl,
            ValueOrigin::Inline,
        );
    }

    match winner {
        Some((_, decl, _)) if decl.value == PropertyValue::Inherit => inherit(store, doc, node, property),
        Some((_, decl, origin)) => {
            trace!(node = %node, property, value = %decl.value, ?origin, "Resolved value");
            Some(ResolvedValue {
                value: decl.value.to_string(),
                origin,
            })
        }
        None if INHERITED_PROPERTIES.contains(&property) => inherit(store, doc, node, property),
        None => None,
    }
}

fn inherit(
    store: &StyleRuleStore,
    doc: &Document,
    node: NodeId,
    property: &str,
) -> Option<ResolvedValue> {
    let parent = doc.parent_element(node)?;
    let resolved = resolve_value(store, doc, parent, property)?;
    let origin = match resolved.origin {
        ValueOrigin::Inherited { from } => ValueOrigin::Inherited { from },
        _ => ValueOrigin::Inherited { from: parent },
    };
    Some(ResolvedValue {
        value: resolved.value,
        origin,
    })
}
