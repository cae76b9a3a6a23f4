//! Inspector configuration.

use serde::{Deserialize, Serialize};

use crate::selection::SelectionMode;
use crate::session::Breakpoint;
use crate::InspectorError;

/// How element paths are computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Tag of the selection root. Paths start here.
    pub boundary_tag: String,
    /// Attribute marking inspector-owned subtrees; nothing inside one gets a path.
    pub tooling_attribute: String,
    /// Class prefix of inspector-internal classes; excluded from segments.
    pub internal_class_prefix: String,
    /// Class tokens kept per segment.
    pub max_classes: usize,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            boundary_tag: "body".to_string(),
            tooling_attribute: "data-stylekit".to_string(),
            internal_class_prefix: "stylekit-".to_string(),
            max_classes: 2,
        }
    }
}

/// Inspector session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    pub path: PathConfig,
    /// Maximum history entries kept; oldest are dropped first. `None` keeps all.
    pub history_limit: Option<usize>,
    /// Selection mode at startup.
    pub selection_mode: SelectionMode,
    /// Breakpoint at startup.
    pub breakpoint: Breakpoint,
    /// Whether the inspector panel starts visible.
    pub panel_visible: bool,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            path: PathConfig::default(),
            history_limit: None,
            selection_mode: SelectionMode::Single,
            breakpoint: Breakpoint::Base,
            panel_visible: true,
        }
    }
}

impl InspectorConfig {
    /// Load from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, InspectorError> {
        Ok(serde_json::from_str(json)?)
    }
}
