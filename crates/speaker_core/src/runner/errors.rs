//! Errors from a single invocation of an external capability.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of one capability call.
///
/// Everything except `Unavailable` is transient: the stage runner
/// retries it within its attempt budget and never lets it escape.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The call did not finish in time and was killed.
    #[error("{tool} timed out after {}s", after.as_secs())]
    Timeout { tool: String, after: Duration },

    /// The tool exited unsuccessfully.
    #[error("{tool} failed with exit code {}: {message}", exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    NonZeroExit {
        tool: String,
        exit_code: Option<i32>,
        message: String,
    },

    /// The tool claimed success but its output is unusable.
    #[error("Invalid output {}: {reason}", file_label(.path))]
    InvalidOutput { path: PathBuf, reason: String },

    /// The tool could not be started.
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// File I/O around the call failed.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// The capability is not installed or not reachable.
    #[error("{0} is unavailable")]
    Unavailable(String),
}

impl ToolError {
    pub fn timeout(tool: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            tool: tool.into(),
            after,
        }
    }

    pub fn non_zero_exit(
        tool: impl Into<String>,
        exit_code: Option<i32>,
        message: impl Into<String>,
    ) -> Self {
        Self::NonZeroExit {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    pub fn invalid_output(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidOutput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn spawn(tool: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            tool: tool.into(),
            source,
        }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn unavailable(what: impl Into<String>) -> Self {
        Self::Unavailable(what.into())
    }

    /// Tool output quoted in the error, if any.
    pub fn output_tail(&self) -> Option<&str> {
        match self {
            Self::NonZeroExit { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    /// Whether this failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether retrying could possibly help.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Unavailable(_))
    }
}

/// File name only, so messages do not leak workspace paths.
pub(crate) fn file_label(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Result type for capability calls.
pub type ToolResult<T> = Result<T, ToolError>;
