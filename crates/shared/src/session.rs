//! Client-side persistence of the current session handle.
//!
//! Exactly one handle is held at a time. The store is injected into the flows
//! so tests and embedders can swap the on-disk store for [`MemorySessionStore`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::SessionHandle;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("failed to read session file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("session file {path} is not valid JSON: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write session file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode session file {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait SessionStore: Send + Sync {
    fn get(&self) -> Result<Option<SessionHandle>, SessionStoreError>;
    fn set(&self, handle: &SessionHandle) -> Result<(), SessionStoreError>;
    fn clear(&self) -> Result<(), SessionStoreError>;

    /// Clears the store only while it still holds `expected`. Returns whether it cleared.
    fn clear_if(&self, expected: &SessionHandle) -> Result<bool, SessionStoreError> {
        if self.get()?.as_ref() != Some(expected) {
            return Ok(false);
        }
        self.clear()?;
        Ok(true)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionDocument {
    #[serde(rename = "currentAnalysisId", default)]
    current_analysis_id: Option<String>,
}

/// Stores the handle as `{"currentAnalysisId": "..."}` in a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Result<Option<SessionHandle>, SessionStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionStoreError::Read {
                    path: self.display_path(),
                    source,
                });
            }
        };

        if raw.trim().is_empty() {
            return Ok(None);
        }

        let document =
            serde_json::from_str::<SessionDocument>(&raw).map_err(|source| {
                SessionStoreError::Parse {
                    path: self.display_path(),
                    source,
                }
            })?;

        Ok(document
            .current_analysis_id
            .and_then(SessionHandle::new))
    }

    fn set(&self, handle: &SessionHandle) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SessionStoreError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let document = SessionDocument {
            current_analysis_id: Some(handle.as_str().to_string()),
        };
        let mut encoded =
            serde_json::to_string_pretty(&document).map_err(|source| SessionStoreError::Encode {
                path: self.display_path(),
                source,
            })?;
        encoded.push('\n');

        fs::write(&self.path, encoded).map_err(|source| SessionStoreError::Write {
            path: self.display_path(),
            source,
        })?;
        debug!(path = %self.path.display(), "session handle stored");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "session handle cleared");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionStoreError::Write {
                path: self.display_path(),
                source,
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    handle: Mutex<Option<SessionHandle>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handle(handle: SessionHandle) -> Self {
        Self {
            handle: Mutex::new(Some(handle)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<SessionHandle>> {
        self.handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Result<Option<SessionHandle>, SessionStoreError> {
        Ok(self.slot().clone())
    }

    fn set(&self, handle: &SessionHandle) -> Result<(), SessionStoreError> {
        *self.slot() = Some(handle.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        *self.slot() = None;
        Ok(())
    }

    fn clear_if(&self, expected: &SessionHandle) -> Result<bool, SessionStoreError> {
        let mut slot = self.slot();
        if slot.as_ref() != Some(expected) {
            return Ok(false);
        }
        *slot = None;
        Ok(true)
    }
}
