//! # StyleKit Inspector
//!
//! Element identity and style mutation engine for visual CSS editing.
//!
//! ## Design Goals
//!
//! 1. **Re-derivable identity**: Selected nodes are addressed by path strings
//! 2. **Global edits**: Style changes are keyed by selector, not written per node
//! 3. **Linear history**: Every mutation is undoable and redoable exactly
//! 4. **Multi-selection**: Batch edits apply atomically; one primary node drives panels
//!
//! ## Layout
//!
//! - [`path`]: path computation and resolution
//! - [`history`]: undo/redo log
//! - [`selection`]: selection set, primary node, selection mode, listeners
//! - [`session`]: the coordinator consumed by UI panels
//! - [`snapshot`]: saved style sessions
//! - [`export`]: CSS, JSON, Tailwind config and design token output

use thiserror::Error;

pub mod config;
pub mod export;
pub mod history;
pub mod path;
pub mod selection;
pub mod session;
pub mod snapshot;

pub use config::{InspectorConfig, PathConfig};
pub use export::{DesignToken, TailwindConfig, TokenCategory};
pub use history::{
    DocumentStyleApplier, HistoryEntry, HistoryKind, HistoryManager, StyleApplier, StyleChange,
};
pub use path::{
    ElementPath, NodeHandle, PathResolver, PathSegment, PersistedPath, PATH_FORMAT_VERSION,
};
pub use selection::{
    ChangeReason, InlineChange, SelectOptions, SelectionChange, SelectionManager, SelectionMode,
    SubscriptionId,
};
pub use session::{with_default_session, Breakpoint, InspectorSession, InspectorSessionBuilder};
pub use snapshot::{JsonFileBackend, MemoryBackend, SnapshotBackend, SnapshotStore, StyleSession};

pub use stylekit_css::{StyleMap, StyleRuleStore};
pub use stylekit_dom::{Document, NodeId};

/// Errors that can occur in inspector operations.
#[derive(Error, Debug)]
pub enum InspectorError {
    #[error("CSS error: {0}")]
    Css(#[from] stylekit_css::CssError),

    #[error("DOM error: {0}")]
    Dom(#[from] stylekit_dom::DomError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Unsupported path format version {found} (expected {expected})")]
    PathVersion { expected: u32, found: u32 },
}
