//! The style rule store: one injected stylesheet keyed by selector.

use std::fmt;

use indexmap::IndexMap;
use stylekit_dom::{Document, NodeId, SelectorList};
use tracing::{debug, trace, warn};

use crate::cascade::{resolve_value, ResolvedValue};
use crate::{normalize_property, CssError};

/// Snapshot shape: selector → property → value, both levels in insertion order.
pub type StyleMap = IndexMap<String, IndexMap<String, String>>;

/// CSS property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Inherit from parent.
    Inherit,
    /// Initial value.
    Initial,
    /// Specific value.
    Specified(String),
}

impl PropertyValue {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            v if v.eq_ignore_ascii_case("inherit") => PropertyValue::Inherit,
            v if v.eq_ignore_ascii_case("initial") => PropertyValue::Initial,
            v => PropertyValue::Specified(v.to_string()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Inherit => f.write_str("inherit"),
            PropertyValue::Initial => f.write_str("initial"),
            PropertyValue::Specified(v) => f.write_str(v),
        }
    }
}

/// A CSS declaration (property: value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: PropertyValue,
    pub important: bool,
}

impl Declaration {
    /// Parse a raw value, splitting off a trailing `!important`.
    pub fn new(property: String, raw_value: &str) -> Self {
        let raw_value = raw_value.trim();
        let (value, important) = match raw_value.rfind('!') {
            Some(idx) if raw_value[idx + 1..].trim().eq_ignore_ascii_case("important") => {
                (raw_value[..idx].trim_end(), true)
            }
            _ => (raw_value, false),
        };
        Self {
            property,
            value: PropertyValue::parse(value),
            important,
        }
    }

    /// The value as the user would type it back, `!important` included.
    pub fn value_text(&self) -> String {
        if self.important {
            format!("{} !important", self.value)
        } else {
            self.value.to_string()
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {};", self.property, self.value_text())
    }
}

/// A CSS rule (selector + declarations).
#[derive(Debug, Clone)]
pub struct Rule {
    pub selector: String,
    pub declarations: Vec<Declaration>,
    selectors: SelectorList,
}

impl Rule {
    pub fn selectors(&self) -> &SelectorList {
        &self.selectors
    }

    pub fn declaration(&self, property: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.property == property)
    }
}

/// The injected stylesheet.
///
/// Holds at most one value per `(selector, property)`; re-upserting overwrites
/// in place so declaration order follows first insertion.
#[derive(Debug, Default, Clone)]
pub struct StyleRuleStore {
    rules: Vec<Rule>,
    /// Bumped only when the stylesheet text actually changes.
    generation: u64,
}

impl StyleRuleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a declaration, returning the previous value.
    ///
    /// An empty value removes the declaration instead.
    pub fn upsert(
        &mut self,
        selector: &str,
        property: &str,
        value: &str,
    ) -> Result<Option<String>, CssError> {
        let value = value.trim();
        if value.is_empty() {
            let property = normalize_property(property)?;
            return Ok(self.remove(selector, &property));
        }
        if value.contains(&['{', '}', ';'][..]) {
            return Err(CssError::InvalidValue(value.to_string()));
        }
        let property = normalize_property(property)?;
        let selector = selector.trim();
        let declaration = Declaration::new(property.clone(), value);

        let idx = match self.rules.iter().position(|r| r.selector == selector) {
            Some(idx) => idx,
            None => {
                let selectors = SelectorList::parse(selector)?;
                self.rules.push(Rule {
                    selector: selector.to_string(),
                    declarations: Vec::new(),
                    selectors,
                });
                self.rules.len() - 1
            }
        };

        let rule = &mut self.rules[idx];
        let previous = match rule.declarations.iter_mut().find(|d| d.property == property) {
            Some(existing) if *existing == declaration => {
                trace!(selector, property = %property, "Upsert unchanged");
                return Ok(Some(existing.value_text()));
            }
            Some(existing) => Some(std::mem::replace(existing, declaration).value_text()),
            None => {
                rule.declarations.push(declaration);
                None
            }
        };

        self.generation += 1;
        debug!(selector, property = %property, value, "Upserted style rule");
        Ok(previous)
    }

    /// Current value for `(selector, property)`.
    pub fn get(&self, selector: &str, property: &str) -> Option<String> {
        let property = normalize_property(property).ok()?;
        self.rules_for(selector)?
            .declaration(&property)
            .map(Declaration::value_text)
    }

    /// Delete one declaration. A rule left empty is pruned.
    pub fn remove(&mut self, selector: &str, property: &str) -> Option<String> {
        let property = normalize_property(property).ok()?;
        let selector = selector.trim();
        let idx = self.rules.iter().position(|r| r.selector == selector)?;
        let rule = &mut self.rules[idx];
        let pos = rule.declarations.iter().position(|d| d.property == property)?;
        let removed = rule.declarations.remove(pos);
        if rule.declarations.is_empty() {
            self.rules.remove(idx);
        }
        self.generation += 1;
        debug!(selector, property = %property, "Removed style rule");
        Some(removed.value_text())
    }

    /// Drop every declaration for one selector.
    pub fn remove_selector(&mut self, selector: &str) -> bool {
        let selector = selector.trim();
        let before = self.rules.len();
        self.rules.retain(|r| r.selector != selector);
        let removed = before != self.rules.len();
        if removed {
            self.generation += 1;
        }
        removed
    }

    /// Remove all rules.
    pub fn clear(&mut self) {
        if !self.rules.is_empty() {
            self.rules.clear();
            self.generation += 1;
            debug!("Cleared style rules");
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rules_for(&self, selector: &str) -> Option<&Rule> {
        let selector = selector.trim();
        self.rules.iter().find(|r| r.selector == selector)
    }

    pub fn selector_count(&self) -> usize {
        self.rules.len()
    }

    pub fn declaration_count(&self) -> usize {
        self.rules.iter().map(|r| r.declarations.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Full snapshot of the store.
    pub fn all_styles(&self) -> StyleMap {
        self.rules
            .iter()
            .map(|rule| {
                let declarations = rule
                    .declarations
                    .iter()
                    .map(|d| (d.property.clone(), d.value_text()))
                    .collect();
                (rule.selector.clone(), declarations)
            })
            .collect()
    }

    /// Merge a snapshot into the store. Invalid entries are skipped.
    ///
    /// Returns the number of declarations applied.
    pub fn import_styles(&mut self, styles: &StyleMap) -> usize {
        let mut applied = 0;
        for (selector, declarations) in styles {
            for (property, value) in declarations {
                match self.upsert(selector, property, value) {
                    Ok(_) => applied += 1,
                    Err(e) => warn!(selector = %selector, property = %property, error = %e, "Skipping imported declaration"),
                }
            }
        }
        debug!(applied, "Imported styles");
        applied
    }

    /// One block per selector, declarations in insertion order.
    pub fn export_css(&self) -> String {
        format_css(&self.all_styles())
    }

    /// The injected stylesheet text, one rule per line.
    pub fn css_text(&self) -> String {
        self.rules
            .iter()
            .map(|rule| {
                let body = rule
                    .declarations
                    .iter()
                    .map(Declaration::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{} {{ {} }}", rule.selector, body)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Rules whose selector matches `node`, in source order.
    pub fn matching_rules(&self, doc: &Document, node: NodeId) -> Vec<&Rule> {
        self.rules
            .iter()
            .filter(|r| r.selectors.matches(doc, node))
            .collect()
    }

    /// Computed value of `property` on `node`.
    pub fn resolve(&self, doc: &Document, node: NodeId, property: &str) -> Option<ResolvedValue> {
        resolve_value(self, doc, node, property)
    }

    /// Elements currently affected by `selector`'s rule.
    pub fn affected_nodes(&self, doc: &Document, selector: &str) -> Vec<NodeId> {
        self.rules_for(selector)
            .map(|rule| doc.select_all(&rule.selectors))
            .unwrap_or_default()
    }
}

/// Serialize a snapshot as stylesheet text: one block per selector.
pub fn format_css(styles: &StyleMap) -> String {
    let mut out = String::new();
    for (idx, (selector, declarations)) in styles.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(selector);
        out.push_str(" {\n");
        for (property, value) in declarations {
            out.push_str(&format!("  {}: {};\n", property, value));
        }
        out.push_str("}\n");
    }
    out
}
