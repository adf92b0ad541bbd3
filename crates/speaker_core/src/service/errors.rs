//! Errors returned by the control surface.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::JobPhase;
use crate::runner::ToolError;

/// A start request was refused.
#[derive(Error, Debug)]
pub enum StartRejected {
    /// Another job has not finished yet.
    #[error("Job '{0}' is still running")]
    Busy(String),

    /// A reset job's worker has not released its tools yet.
    #[error("Job '{0}' was reset and is still stopping")]
    Stopping(String),

    #[error("Failed to start job worker: {0}")]
    Spawn(#[source] io::Error),
}

/// The final video cannot be handed out.
#[derive(Error, Debug)]
pub enum ResultError {
    /// No completed job to return a result for.
    #[error("Result not ready (state: {0})")]
    NotReady(JobPhase),

    #[error("Failed to open result: {0}")]
    Io(#[source] io::Error),
}

/// Cleanup was refused or could not finish.
#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("Cannot clean up while job '{0}' is running")]
    Busy(String),

    #[error("Failed to remove {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A voice preview could not be produced.
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("No voice name provided")]
    NoVoice,

    #[error("Failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Voice preview generation failed: {0}")]
    Synthesis(#[source] ToolError),
}

impl ResultError {
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }
}
