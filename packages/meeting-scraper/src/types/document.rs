//! The published snapshot document.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::OutputError;
use crate::types::Meeting;

/// Future meetings as of `generated_at`, ordered by start time then id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDocument {
    pub generated_at: DateTime<FixedOffset>,
    pub meetings: Vec<Meeting>,
}

impl OutputDocument {
    pub fn empty(generated_at: DateTime<FixedOffset>) -> Self {
        Self {
            generated_at,
            meetings: Vec::new(),
        }
    }

    pub fn find(&self, id: &str) -> Option<&Meeting> {
        self.meetings.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.meetings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty()
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String, OutputError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Read the previous run's document.
    ///
    /// A missing or unreadable file is not an error: the run proceeds without
    /// carry-forward.
    pub fn load_previous(path: &Path) -> Option<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No previous document");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read previous document");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unparseable previous document");
                None
            }
        }
    }

    /// Replace `path` atomically: temp file in the same directory, fsync, rename.
    ///
    /// Readers see either the old document or the new one, never a partial write.
    pub fn write_atomic(&self, path: &Path) -> Result<(), OutputError> {
        let json = self.to_json()?;
        let write_err = |source: std::io::Error| OutputError::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        debug!(path = %path.display(), meetings = self.meetings.len(), "Wrote output document");
        Ok(())
    }
}
