//! Job processor that runs one request through the standard pipeline.
//!
//! Owns the translation from pipeline results to terminal states: the
//! pipeline only advances phases, this module records completion or
//! failure on both the job and the published progress record.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capabilities::Capabilities;
use crate::config::Settings;
use crate::logging::{JobLogger, LogConfig};
use crate::models::{Job, JobRequest};
use crate::progress::ProgressWriter;
use crate::workspace::JobWorkspace;

use super::pipeline::Pipeline;
use super::types::Context;

/// Shared sink for job log lines (console, UI, test capture).
pub type SharedLineCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Result of processing a single job.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: String,
    pub success: bool,
    /// Final video (if successful).
    pub output_path: Option<PathBuf>,
    /// Error detail (if failed).
    pub error: Option<String>,
    /// True when the job was reset or superseded before it finished.
    pub cancelled: bool,
    pub steps_completed: Vec<String>,
    /// Reduced-feature warnings raised along the way.
    pub warnings: Vec<String>,
    /// Last lines of failed tool output from the step that stopped the job.
    pub tool_output: Vec<String>,
}

impl JobResult {
    pub fn success(
        job_id: impl Into<String>,
        output_path: PathBuf,
        steps_completed: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            success: true,
            output_path: Some(output_path),
            error: None,
            cancelled: false,
            steps_completed,
            warnings,
            tool_output: Vec::new(),
        }
    }

    pub fn failure(job_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            success: false,
            output_path: None,
            error: Some(error.into()),
            cancelled: false,
            steps_completed: Vec::new(),
            warnings: Vec::new(),
            tool_output: Vec::new(),
        }
    }

    /// Attach the tool output that explains a failure.
    pub fn with_tool_output(mut self, lines: Vec<String>) -> Self {
        self.tool_output = lines;
        self
    }

    pub fn cancelled(job_id: impl Into<String>) -> Self {
        Self {
            cancelled: true,
            ..Self::failure(job_id, "cancelled")
        }
    }
}

/// Runs jobs against a fixed settings snapshot and capability set.
pub struct JobProcessor {
    settings: Settings,
    capabilities: Capabilities,
    line_callback: Option<SharedLineCallback>,
}

impl JobProcessor {
    pub fn new(settings: Settings, capabilities: Capabilities) -> Self {
        Self {
            settings,
            capabilities,
            line_callback: None,
        }
    }

    /// Mirror every job log line to `callback`.
    pub fn with_line_callback(mut self, callback: Option<SharedLineCallback>) -> Self {
        self.line_callback = callback;
        self
    }

    /// Process one job to a terminal state.
    ///
    /// `writer` must come from the tracker's `begin` for `job_id`; the
    /// pipeline's cancel handle is the one the caller keeps for reset.
    pub fn process(
        &self,
        job_id: &str,
        request: &JobRequest,
        writer: ProgressWriter,
        pipeline: Pipeline,
    ) -> JobResult {
        let paths = &self.settings.paths;
        let workspace = JobWorkspace::new(
            Path::new(&paths.work_root),
            Path::new(&paths.output_folder),
            job_id,
        );
        if let Err(e) = workspace.create() {
            let detail = format!("Setup failed: could not create workspace: {}", e);
            tracing::error!("[{}] {}", job_id, detail);
            writer.fail(detail.clone());
            return JobResult::failure(job_id, detail);
        }

        let callback = self.line_callback.clone().map(|cb| {
            let boxed: crate::logging::LineCallback = Box::new(move |line: &str| cb(line));
            boxed
        });
        let logger = match JobLogger::new(
            job_id,
            &paths.logs_folder,
            LogConfig::from_settings(&self.settings.logging),
            callback,
        ) {
            Ok(logger) => Arc::new(logger),
            Err(e) => {
                let detail = format!("Setup failed: could not create job log: {}", e);
                tracing::error!("[{}] {}", job_id, detail);
                writer.fail(detail.clone());
                return JobResult::failure(job_id, detail);
            }
        };

        let ctx = Context::new(
            self.settings.clone(),
            self.capabilities.clone(),
            workspace,
            Arc::clone(&logger),
            writer,
            pipeline.cancel_handle(),
        );
        let mut job = Job::new(job_id, request);

        logger.info(&format!("Starting job: {}", job_id));
        logger.info(&format!("Presentation: {}", job.presentation.display()));
        logger.info(&format!("Face image: {}", job.face_image.display()));
        if let Some(voice) = &job.voice {
            logger.info(&format!("Voice: {}", voice));
        }

        let result = match pipeline.run(&ctx, &mut job) {
            Ok(run) => {
                let output = ctx.workspace.final_video_path();
                job.complete(output.clone());
                ctx.progress.complete(output.clone());
                logger.success(&format!("Job completed: {}", output.display()));
                JobResult::success(
                    job_id,
                    output,
                    run.steps_completed,
                    ctx.progress.snapshot().warnings.clone(),
                )
            }
            Err(e) if e.is_cancelled() => {
                logger.warn("Job cancelled");
                // Ignored once the record was reset or handed to a new job.
                ctx.progress.fail("Job cancelled");
                JobResult::cancelled(job_id)
            }
            Err(e) => {
                let detail = e.to_string();
                logger.error(&format!("Pipeline failed: {}", detail));
                logger.show_tail("Recent output");
                job.fail(detail.clone());
                ctx.progress.fail(detail.clone());
                JobResult::failure(job_id, detail).with_tool_output(logger.get_tail())
            }
        };

        logger.flush();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_result_is_not_success() {
        let result = JobResult::cancelled("job-1");
        assert!(result.cancelled);
        assert!(!result.success);
        assert!(result.output_path.is_none());
    }

    #[test]
    fn success_keeps_warnings() {
        let result = JobResult::success(
            "job-1",
            PathBuf::from("/out/job-1/final.mp4"),
            vec!["ExtractSlides".to_string()],
            vec!["lip-sync unavailable; using still-image clips".to_string()],
        );
        assert!(result.success);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.error.is_none());
    }
}
