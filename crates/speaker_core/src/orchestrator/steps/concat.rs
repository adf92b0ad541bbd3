//! Concatenate step - joins the segments into the final video.
//!
//! Every segment is verified against its completion marker first. The
//! output is built under a pending name in the output directory and only
//! renamed to the final name once it validates, so a partial video is
//! never published.

use std::fs;
use std::io;
use std::path::PathBuf;

use super::record_output;
use crate::models::{ArtifactKind, Job, JobPhase};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};
use crate::runner::{file_label, validate_min_size, StagePolicy, StageRunner};

pub struct ConcatStep;

impl ConcatStep {
    pub fn new() -> Self {
        Self
    }

    /// Segment paths in slide order, or the first slide without a valid one.
    fn verified_segments(ctx: &Context, job: &Job) -> StepResult<Vec<PathBuf>> {
        let min_bytes = ctx.settings.validation.min_segment_bytes;
        job.slides
            .iter()
            .map(|slide| {
                ctx.workspace
                    .completed_artifact(ArtifactKind::Segment, slide.index(), min_bytes)
                    .map(|(path, _)| path)
                    .ok_or_else(|| {
                        StepError::integrity(slide.number(), "composed segment is missing")
                    })
            })
            .collect()
    }
}

impl Default for ConcatStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ConcatStep {
    fn name(&self) -> &str {
        "Concatenate"
    }

    fn phase(&self) -> JobPhase {
        JobPhase::Concatenating
    }

    fn description(&self) -> &str {
        "Concatenating final video..."
    }

    fn validate_input(&self, ctx: &Context, job: &Job) -> StepResult<()> {
        if job.slides.is_empty() {
            return Err(StepError::invalid_output("no slides to concatenate"));
        }
        Self::verified_segments(ctx, job).map(|_| ())
    }

    fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome> {
        ctx.check_cancelled()?;
        let segments = Self::verified_segments(ctx, job)?;
        let pending = ctx.workspace.pending_video_path();
        let final_path = ctx.workspace.final_video_path();

        for stale in [&pending, &final_path] {
            match fs::remove_file(stale) {
                Ok(()) => ctx.logger.debug(&format!("Removed stale {}", stale.display())),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StepError::io(format!("removing {}", file_label(stale)), e)),
            }
        }

        let composition = &ctx.settings.composition;
        let runner = StageRunner::new(
            "concatenation",
            StagePolicy::new(composition.max_attempts, composition.timeout())?
                .with_min_bytes(ctx.settings.validation.min_output_bytes),
        );
        let encoder = &ctx.capabilities.encoder;

        ctx.logger
            .info(&format!("Joining {} segment(s)", segments.len()));
        let artifact = runner
            .run(
                |attempt| {
                    ctx.logger.command(&format!(
                        "concat {} segments (attempt {}/{})",
                        segments.len(),
                        attempt.attempt,
                        attempt.max_attempts
                    ));
                    encoder
                        .concat(&segments, &pending, attempt.timeout)
                        .inspect_err(|e| record_output(ctx, e))
                        .map(|()| pending.clone())
                },
                |_| {},
            )
            .map_err(|failure| StepError::tool("concatenation", failure.last_error))?;

        if let Err(e) = fs::rename(&artifact.path, &final_path) {
            let _ = fs::remove_file(&artifact.path);
            return Err(StepError::io("publishing final video", e));
        }
        ctx.logger.info(&format!(
            "Final video: {} ({} bytes)",
            final_path.display(),
            artifact.bytes
        ));
        ctx.report_slide(1, 1, "Final video ready");

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, _job: &Job) -> StepResult<()> {
        let final_path = ctx.workspace.final_video_path();
        validate_min_size(&final_path, ctx.settings.validation.min_output_bytes)
            .map(|_| ())
            .map_err(|e| StepError::invalid_output(e.to_string()))
    }
}
