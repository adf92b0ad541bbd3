//! Core types for the orchestrator pipeline.

use std::sync::Arc;

use super::errors::{StepError, StepResult};
use super::pipeline::CancelHandle;
use crate::capabilities::Capabilities;
use crate::config::Settings;
use crate::logging::JobLogger;
use crate::progress::ProgressWriter;
use crate::workspace::JobWorkspace;

/// Read-only context passed to pipeline steps.
///
/// Shared resources steps can use but not replace. Mutable results go
/// on the [`Job`](crate::models::Job).
pub struct Context {
    pub settings: Settings,
    pub capabilities: Capabilities,
    pub workspace: JobWorkspace,
    pub logger: Arc<JobLogger>,
    /// The job's sole handle for publishing progress.
    pub progress: ProgressWriter,
    cancel: CancelHandle,
}

impl Context {
    pub fn new(
        settings: Settings,
        capabilities: Capabilities,
        workspace: JobWorkspace,
        logger: Arc<JobLogger>,
        progress: ProgressWriter,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            settings,
            capabilities,
            workspace,
            logger,
            progress,
            cancel,
        }
    }

    pub fn job_id(&self) -> &str {
        self.workspace.job_id()
    }

    /// True once the job was reset or superseded by another job.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || !self.progress.is_current()
    }

    pub fn check_cancelled(&self) -> StepResult<()> {
        if self.is_cancelled() {
            return Err(StepError::Cancelled);
        }
        Ok(())
    }

    /// Report `done` of `total` slides finished within the current phase.
    pub fn report_slide(&self, done: usize, total: usize, step: impl Into<String>) {
        if self.progress.report_units(done, total, step) {
            self.logger
                .progress(u32::from(self.progress.snapshot().progress));
        }
    }

    /// Update the step description without moving progress.
    pub fn describe(&self, step: impl Into<String>) {
        self.progress.describe(step);
    }

    /// Record a reduced-feature warning in the log and the status record.
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        self.logger.warn(&message);
        self.progress.warn(message);
    }
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Nothing to do (not an error).
    Skipped(String),
}
