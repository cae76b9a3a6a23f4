//! Export formats derived from a styles snapshot.
//!
//! Everything here is a pure function of a [`StyleMap`]; nothing reads the
//! live store or document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use stylekit_css::{format_css, parse_color, parse_length, Declaration, PropertyValue, StyleMap};
use tracing::debug;

use crate::InspectorError;

/// Stylesheet text, one block per selector.
pub fn to_css(styles: &StyleMap) -> String {
    format_css(styles)
}

/// Pretty JSON of the bare styles map.
pub fn to_json(styles: &StyleMap) -> Result<String, InspectorError> {
    Ok(serde_json::to_string_pretty(styles)?)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StylesDocument {
    /// A saved session record. `id` and `name` keep a bare map that happens to
    /// have a `styles` selector from matching here.
    Envelope {
        id: String,
        name: String,
        styles: StyleMap,
    },
    Bare(StyleMap),
}

/// Parse styles JSON: either a session record (`{id, name, ..., styles}`) or
/// the bare selector → property → value map.
pub fn parse_styles_json(text: &str) -> Result<StyleMap, InspectorError> {
    match serde_json::from_str::<StylesDocument>(text)? {
        StylesDocument::Envelope { id, name, styles } => {
            debug!(id = %id, name = %name, "Parsed styles from session record");
            Ok(styles)
        }
        StylesDocument::Bare(styles) => Ok(styles),
    }
}

/// Token bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenCategory {
    Color,
    Spacing,
    Radius,
    Shadow,
    FontSize,
}

impl TokenCategory {
    fn prefix(self) -> &'static str {
        match self {
            TokenCategory::Color => "color",
            TokenCategory::Spacing => "spacing",
            TokenCategory::Radius => "radius",
            TokenCategory::Shadow => "shadow",
            TokenCategory::FontSize => "text",
        }
    }

    /// Bucket for a property, if it has one.
    fn for_property(property: &str) -> Option<Self> {
        let category = match property {
            "color" | "background" | "fill" | "stroke" => TokenCategory::Color,
            p if p.ends_with("-color") => TokenCategory::Color,
            p if p.contains("radius") => TokenCategory::Radius,
            "box-shadow" => TokenCategory::Shadow,
            "font-size" => TokenCategory::FontSize,
            "gap" | "row-gap" | "column-gap" | "inset" => TokenCategory::Spacing,
            p if p.starts_with("margin") || p.starts_with("padding") => TokenCategory::Spacing,
            _ => return None,
        };
        Some(category)
    }

    /// Canonical token value, or `None` if the value does not fit the bucket.
    fn normalize(self, value: &str) -> Option<String> {
        match self {
            TokenCategory::Color => parse_color(value).map(|c| c.to_hex()),
            TokenCategory::Shadow => (!value.eq_ignore_ascii_case("none")).then(|| value.to_string()),
            TokenCategory::Spacing | TokenCategory::Radius | TokenCategory::FontSize => {
                split_top_level(value)
                    .into_iter()
                    .all(|part| parse_length(part).is_some())
                    .then(|| value.to_string())
            }
        }
    }
}

/// Split a shorthand on whitespace outside parentheses, so `min(8px, 2vw) 4px`
/// yields two parts.
fn split_top_level(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if start < i {
                    parts.push(&value[start..i]);
                }
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if start < value.len() {
        parts.push(&value[start..]);
    }
    parts
}

/// One entry of the flat design-token list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignToken {
    pub name: String,
    pub value: String,
    pub category: TokenCategory,
    pub description: String,
}

/// Collect distinct values per bucket, in first-use order, naming each
/// `<prefix>-<n>` and describing where it is used.
pub fn to_design_tokens(styles: &StyleMap) -> Vec<DesignToken> {
    // (category, value) -> usages
    let mut found: IndexMap<(TokenCategory, String), Vec<String>> = IndexMap::new();
    for (selector, declarations) in styles {
        for (property, raw) in declarations {
            let Some(category) = TokenCategory::for_property(property) else {
                continue;
            };
            let declaration = Declaration::new(property.clone(), raw);
            let PropertyValue::Specified(value) = &declaration.value else {
                continue;
            };
            let Some(value) = category.normalize(value) else {
                continue;
            };
            let usage = format!("{} ({})", selector, property);
            let usages = found.entry((category, value)).or_default();
            if !usages.contains(&usage) {
                usages.push(usage);
            }
        }
    }

    let mut counters: IndexMap<TokenCategory, usize> = IndexMap::new();
    found
        .into_iter()
        .map(|((category, value), usages)| {
            let n = counters.entry(category).or_insert(0);
            *n += 1;
            DesignToken {
                name: format!("{}-{}", category.prefix(), n),
                value,
                category,
                description: format!("Used by {}", usages.join(", ")),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailwindConfig {
    pub theme: TailwindTheme,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailwindTheme {
    pub extend: TailwindExtend,
}

/// `theme.extend`, one map per bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailwindExtend {
    pub colors: IndexMap<String, String>,
    pub spacing: IndexMap<String, String>,
    pub border_radius: IndexMap<String, String>,
    pub box_shadow: IndexMap<String, String>,
    pub font_size: IndexMap<String, String>,
}

/// Tailwind `theme.extend` built from the design tokens.
pub fn to_tailwind_config(styles: &StyleMap) -> TailwindConfig {
    let mut extend = TailwindExtend::default();
    for token in to_design_tokens(styles) {
        let bucket = match token.category {
            TokenCategory::Color => &mut extend.colors,
            TokenCategory::Spacing => &mut extend.spacing,
            TokenCategory::Radius => &mut extend.border_radius,
            TokenCategory::Shadow => &mut extend.box_shadow,
            TokenCategory::FontSize => &mut extend.font_size,
        };
        bucket.insert(token.name, token.value);
    }
    TailwindConfig {
        theme: TailwindTheme { extend },
    }
}
