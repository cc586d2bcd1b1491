//! Error types for the classification pipeline.
//!
//! - `ClassifyError` - why one classification attempt failed (always retried)
//! - `CheckpointError` - a checkpoint could not be read or written
//! - `PipelineError` - why a whole run stopped early
//!
//! Per-session failures never escape the orchestrator; they end up as
//! fallback results. Only cancellation stops a run.

use crate::analyzer::backend::BackendError;
use crate::analyzer::repair::RepairError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single classification attempt produced no usable result.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The service could not be reached or refused the request.
    #[error(transparent)]
    Transport(#[from] BackendError),

    /// The service answered with degenerate output (empty or repeated noise).
    #[error("Anomalous response: {preview}")]
    Anomalous { preview: String },

    /// No JSON object could be recovered from the answer.
    #[error("Malformed response: {0}")]
    Malformed(#[from] RepairError),
}

impl ClassifyError {
    /// Short category label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifyError::Transport(_) => "transport",
            ClassifyError::Anomalous { .. } => "anomalous",
            ClassifyError::Malformed(_) => "malformed",
        }
    }
}

/// A checkpoint could not be read or written.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Failed to write checkpoint {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read checkpoint {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checkpoint {} is not valid: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Why a pipeline run stopped before completing.
#[derive(Debug)]
pub enum PipelineError {
    /// The run was interrupted between sessions.
    Cancelled {
        /// Sessions analyzed so far (including resumed ones)
        completed: usize,
        /// Sessions in the full transcript
        total: usize,
        /// Whether the final checkpoint write succeeded
        checkpoint_saved: bool,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Cancelled {
                completed,
                total,
                checkpoint_saved,
            } => {
                write!(
                    f,
                    "Analysis interrupted after {} of {} sessions.",
                    completed, total
                )?;
                if *checkpoint_saved {
                    write!(f, " Progress saved; run the same command again to resume.")
                } else {
                    write!(f, " Progress could not be saved.")
                }
            }
        }
    }
}

impl std::error::Error for PipelineError {}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled { .. })
    }
}
