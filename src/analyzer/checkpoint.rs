//! Durable checkpoints of analyzed sessions.
//!
//! A checkpoint is always the full list of analyzed sessions so far, never
//! a delta. Writes go to `<file>.tmp` first and are renamed over the target,
//! so a failed or interrupted write leaves the previous checkpoint intact.
//!
//! File format:
//!
//! ```json
//! {
//!   "analyzed_sessions": [{"messages": [...], "analysis": {...}}],
//!   "saved_at": "2024-01-01 12:00:00"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::CheckpointError;
use super::types::{timestamp_format, AnalyzedSession};

/// File name of the checkpoint inside the output directory.
pub const CHECKPOINT_FILE_NAME: &str = "intermediate_results.json";

/// Persistence for in-progress results.
pub trait CheckpointStore {
    /// Replace the stored checkpoint with `analyzed`.
    fn save(&self, analyzed: &[AnalyzedSession]) -> Result<(), CheckpointError>;

    /// Load the stored sessions; empty when nothing usable is stored.
    fn load(&self) -> Vec<AnalyzedSession>;
}

/// A checkpoint as read from disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Checkpoint {
    #[serde(alias = "analyzed_groups")]
    pub analyzed_sessions: Vec<AnalyzedSession>,
    #[serde(with = "timestamp_format", alias = "timestamp")]
    pub saved_at: NaiveDateTime,
}

/// Borrowed form used for writing without cloning the session list.
#[derive(Serialize)]
struct CheckpointRef<'a> {
    analyzed_sessions: &'a [AnalyzedSession],
    #[serde(with = "timestamp_format")]
    saved_at: NaiveDateTime,
}

/// Checkpoint store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    /// Store `intermediate_results.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CHECKPOINT_FILE_NAME),
        }
    }

    /// Store at an explicit file path.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Path of the temporary file used during writes.
    pub fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.as_os_str().to_owned();
        temp.push(".tmp");
        PathBuf::from(temp)
    }

    /// Read the checkpoint, distinguishing "absent" from "broken".
    pub fn read(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CheckpointError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| CheckpointError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Remove the checkpoint. Returns whether a file was removed.
    pub fn clear(&self) -> Result<bool, CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CheckpointError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_error(&self, source: std::io::Error) -> CheckpointError {
        CheckpointError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn save(&self, analyzed: &[AnalyzedSession]) -> Result<(), CheckpointError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
        }

        let checkpoint = CheckpointRef {
            analyzed_sessions: analyzed,
            saved_at: chrono::Local::now().naive_local(),
        };
        let json = serde_json::to_string_pretty(&checkpoint)?;

        // Use atomic temp+rename pattern for crash safety
        let temp_path = self.temp_path();
        fs::write(&temp_path, json).map_err(|e| self.write_error(e))?;

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            // Clean up temp file on failure
            let _ = fs::remove_file(&temp_path);
            return Err(self.write_error(e));
        }

        debug!(path = %self.path.display(), sessions = analyzed.len(), "checkpoint written");
        Ok(())
    }

    fn load(&self) -> Vec<AnalyzedSession> {
        match self.read() {
            Ok(Some(checkpoint)) => checkpoint.analyzed_sessions,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable checkpoint");
                Vec::new()
            }
        }
    }
}
