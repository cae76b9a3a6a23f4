//! # StyleKit CSS
//!
//! CSS values, rule storage and cascade resolution for the StyleKit inspector.
//!
//! ## Design Goals
//!
//! 1. **Global rules**: Edits are keyed by selector, so every matching node updates
//! 2. **Stable ordering**: Declarations keep first-insertion order for predictable export
//! 3. **Cascade**: Computed values honor specificity, source order and inline styles
//! 4. **Value parsing**: Colors and lengths are classified for design-token export

use thiserror::Error;

mod cascade;
mod store;
mod values;

pub use cascade::{resolve_value, ResolvedValue, ValueOrigin};
pub use store::{format_css, Declaration, PropertyValue, Rule, StyleMap, StyleRuleStore};
pub use values::{parse_color, parse_length, Color, Length};

/// Errors that can occur in CSS operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CssError {
    #[error("Invalid selector: {0}")]
    InvalidSelector(#[from] stylekit_dom::DomError),

    #[error("Invalid property: {0:?}")]
    InvalidProperty(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Normalize a property name: trimmed, lowercased unless it is a custom property.
pub fn normalize_property(property: &str) -> Result<String, CssError> {
    let property = property.trim();
    let valid = !property.is_empty()
        && property
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(CssError::InvalidProperty(property.to_string()));
    }
    if property.starts_with("--") {
        Ok(property.to_string())
    } else {
        Ok(property.to_ascii_lowercase())
    }
}
