//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Job → Step → Slide → Detail. Anything reaching this level is fatal
//! to the job; per-slide tool failures are absorbed by the stages.

use std::io;

use thiserror::Error;

use crate::capabilities::ExtractionError;
use crate::runner::{PolicyError, ToolError};

/// Top-level pipeline error with job context.
///
/// The display form is the error detail published to pollers.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("{step_name} failed: {source}")]
    StepFailed {
        job_id: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// The job was reset or superseded.
    #[error("Job '{job_id}' was cancelled")]
    Cancelled { job_id: String },

    /// Failed to set up the job (workspace, logger).
    #[error("Setup failed: {message}")]
    SetupFailed { job_id: String, message: String },
}

impl PipelineError {
    pub fn step_failed(
        job_id: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            job_id: job_id.into(),
            step_name: step_name.into(),
            source,
        }
    }

    pub fn cancelled(job_id: impl Into<String>) -> Self {
        Self::Cancelled {
            job_id: job_id.into(),
        }
    }

    pub fn setup_failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::StepFailed { source, .. } => matches!(source, StepError::Cancelled),
            Self::SetupFailed { .. } => false,
        }
    }
}

/// Error from a pipeline step.
#[derive(Error, Debug)]
pub enum StepError {
    /// A required input is absent or unreadable.
    #[error("ResourceMissingError: {}", describe_resource(.what, .slide))]
    ResourceMissing { what: String, slide: Option<usize> },

    /// A previously produced artifact is missing or damaged.
    #[error("IntegrityError: slide {slide}: {message}")]
    Integrity { slide: usize, message: String },

    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    /// A stage policy is misconfigured.
    #[error("Invalid stage policy: {0}")]
    Policy(#[from] PolicyError),

    /// A tool failed where no fallback exists.
    #[error("{what}: {source}")]
    Tool {
        what: String,
        #[source]
        source: ToolError,
    },

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    #[error("Cancelled")]
    Cancelled,
}

impl StepError {
    /// Missing input for a specific slide (`slide` is 1-based).
    pub fn missing_for_slide(what: impl Into<String>, slide: usize) -> Self {
        Self::ResourceMissing {
            what: what.into(),
            slide: Some(slide),
        }
    }

    /// Missing job-level input.
    pub fn missing(what: impl Into<String>) -> Self {
        Self::ResourceMissing {
            what: what.into(),
            slide: None,
        }
    }

    pub fn integrity(slide: usize, message: impl Into<String>) -> Self {
        Self::Integrity {
            slide,
            message: message.into(),
        }
    }

    pub fn tool(what: impl Into<String>, source: ToolError) -> Self {
        Self::Tool {
            what: what.into(),
            source,
        }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// The 1-based slide this error concerns, if any.
    pub fn slide(&self) -> Option<usize> {
        match self {
            Self::ResourceMissing { slide, .. } => *slide,
            Self::Integrity { slide, .. } => Some(*slide),
            _ => None,
        }
    }
}

fn describe_resource(what: &str, slide: &Option<usize>) -> String {
    match slide {
        Some(n) => format!("slide {}: {}", n, what),
        None => what.to_string(),
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
