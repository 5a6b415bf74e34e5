//! Centralized error types for the nixdeps workspace.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error enum. Only [`NixDepsError::ToolNotFound`] is fatal to a
/// whole run; every other variant is local to one entry file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NixDepsError {
    #[error("Tracer binary not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("Evaluation of {} failed ({status})", entry.display())]
    SubprocessFailure {
        entry: PathBuf,
        status: String,
        /// Combined stdout/stderr of the tracer subprocess.
        output: String,
    },

    #[error("Evaluation of {} timed out after {after:?}", entry.display())]
    TracerTimeout { entry: PathBuf, after: Duration },

    #[error("Malformed trace for {}: {reason}", entry.display())]
    MalformedTrace { entry: PathBuf, reason: String },

    #[error("Path belongs to no package: {path}")]
    OrphanPath { path: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NixDepsError {
    /// Whether the error makes any further resolution pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, NixDepsError::ToolNotFound { .. })
    }

    /// Captured subprocess output, if the error carries any.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            NixDepsError::SubprocessFailure { output, .. } => Some(output),
            _ => None,
        }
    }
}

pub type NixDepsResult<T> = Result<T, NixDepsError>;
