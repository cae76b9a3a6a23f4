//! Saved style sessions.
//!
//! A [`StyleSession`] is created by an explicit save and never modified
//! afterwards; it lives until the user deletes it. The store keeps every
//! session in memory and writes the whole list through a [`SnapshotBackend`]
//! after each change.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{InspectorError, StyleMap};

/// Name given to sessions imported from a bare styles map.
const IMPORTED_SESSION_NAME: &str = "Imported styles";

/// One saved snapshot of the style rule store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSession {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub styles: StyleMap,
}

impl StyleSession {
    pub fn new(name: impl Into<String>, styles: StyleMap) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now,
            updated_at: now,
            styles,
        }
    }
}

/// Where the serialized session list lives.
pub trait SnapshotBackend {
    /// Raw stored text, or `None` if nothing has been stored yet.
    fn load(&self) -> Result<Option<String>, InspectorError>;

    fn store(&mut self, raw: &str) -> Result<(), InspectorError>;
}

/// Keeps the serialized list in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    raw: Option<String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously stored text.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }
}

impl SnapshotBackend for MemoryBackend {
    fn load(&self) -> Result<Option<String>, InspectorError> {
        Ok(self.raw.clone())
    }

    fn store(&mut self, raw: &str) -> Result<(), InspectorError> {
        self.raw = Some(raw.to_string());
        Ok(())
    }
}

/// Stores the list as a JSON file. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<String>, InspectorError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&mut self, raw: &str) -> Result<(), InspectorError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, raw)?;
        debug!(path = %self.path.display(), bytes = raw.len(), "Wrote snapshots");
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    Many(Vec<StyleSession>),
    One(StyleSession),
    Bare(StyleMap),
}

/// Saved sessions over a backend.
#[derive(Debug)]
pub struct SnapshotStore<B: SnapshotBackend> {
    backend: B,
    sessions: Vec<StyleSession>,
}

impl<B: SnapshotBackend> SnapshotStore<B> {
    /// Load whatever the backend holds. Unreadable or corrupt data starts the
    /// store empty instead of failing.
    pub fn open(backend: B) -> Self {
        let sessions = match backend.load() {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<StyleSession>>(&raw) {
                Ok(sessions) => sessions,
                Err(e) => {
                    warn!(error = %e, "Ignoring corrupt snapshot data");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read snapshots");
                Vec::new()
            }
        };
        debug!(count = sessions.len(), "Opened snapshot store");
        Self { backend, sessions }
    }

    /// Save a new session and persist the list.
    pub fn save(
        &mut self,
        name: impl Into<String>,
        styles: StyleMap,
    ) -> Result<StyleSession, InspectorError> {
        let session = StyleSession::new(name, styles);
        self.sessions.push(session.clone());
        if let Err(e) = self.persist() {
            self.sessions.pop();
            return Err(e);
        }
        info!(id = %session.id, name = %session.name, "Saved style session");
        Ok(session)
    }

    pub fn list(&self) -> &[StyleSession] {
        &self.sessions
    }

    pub fn load(&self, id: &str) -> Option<&StyleSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Returns `Ok(false)` when no session has `id`.
    pub fn delete(&mut self, id: &str) -> Result<bool, InspectorError> {
        let Some(pos) = self.sessions.iter().position(|s| s.id == id) else {
            return Ok(false);
        };
        let removed = self.sessions.remove(pos);
        if let Err(e) = self.persist() {
            self.sessions.insert(pos, removed);
            return Err(e);
        }
        info!(id, "Deleted style session");
        Ok(true)
    }

    /// Every session as pretty JSON.
    pub fn export_json(&self) -> Result<String, InspectorError> {
        Ok(serde_json::to_string_pretty(&self.sessions)?)
    }

    /// Merge sessions from JSON: a list, one session record, or a bare styles
    /// map. Sessions with a known id replace the stored one.
    ///
    /// Returns false, leaving the store unchanged, if the text is malformed or
    /// cannot be persisted.
    pub fn import_json(&mut self, text: &str) -> bool {
        let incoming = match serde_json::from_str::<ImportPayload>(text) {
            Ok(ImportPayload::Many(sessions)) => sessions,
            Ok(ImportPayload::One(session)) => vec![session],
            Ok(ImportPayload::Bare(styles)) => vec![StyleSession::new(IMPORTED_SESSION_NAME, styles)],
            Err(e) => {
                warn!(error = %e, "Rejected snapshot import");
                return false;
            }
        };

        let previous = self.sessions.clone();
        let count = incoming.len();
        for session in incoming {
            match self.sessions.iter_mut().find(|s| s.id == session.id) {
                Some(existing) => *existing = session,
                None => self.sessions.push(session),
            }
        }
        if let Err(e) = self.persist() {
            warn!(error = %e, "Failed to persist imported snapshots");
            self.sessions = previous;
            return false;
        }
        info!(count, "Imported style sessions");
        true
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn persist(&mut self) -> Result<(), InspectorError> {
        let raw = serde_json::to_string(&self.sessions)?;
        self.backend.store(&raw)
    }
}
