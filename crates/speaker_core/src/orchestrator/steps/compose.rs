//! Compose step - overlays each clip on its slide image.
//!
//! A slide whose segment cannot be produced is logged and left without
//! one; concatenation refuses to run over the gap.

use super::{invalidate, mark_complete, record_output, reusable};
use crate::models::{ArtifactKind, Job, JobPhase};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};
use crate::runner::{StagePolicy, StageRunner};

pub struct ComposeStep;

impl ComposeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ComposeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ComposeStep {
    fn name(&self) -> &str {
        "ComposeVideo"
    }

    fn phase(&self) -> JobPhase {
        JobPhase::ComposingVideo
    }

    fn description(&self) -> &str {
        "Composing video..."
    }

    fn validate_input(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        for slide in &job.slides {
            if slide.image.is_none() {
                return Err(StepError::integrity(slide.number(), "rendered image is missing"));
            }
            if slide.clip.is_none() {
                return Err(StepError::integrity(slide.number(), "animated clip is missing"));
            }
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome> {
        let composition = &ctx.settings.composition;
        let min_bytes = ctx.settings.validation.min_segment_bytes;
        let runner = StageRunner::new(
            "composition",
            StagePolicy::new(composition.max_attempts, composition.timeout())?
                .with_min_bytes(min_bytes),
        );
        let max_duration = composition.max_segment();
        let encoder = &ctx.capabilities.encoder;
        let total = job.slides.len();
        let mut failed = Vec::new();

        for slide in job.slides.iter_mut() {
            ctx.check_cancelled()?;
            let index = slide.index();
            let number = slide.number();

            if let Some((path, _)) = reusable(ctx, ArtifactKind::Segment, index, min_bytes) {
                slide.segment = Some(path);
                report(ctx, number, total);
                continue;
            }

            let (Some(image), Some(clip)) = (slide.image.clone(), slide.clip.clone()) else {
                return Err(StepError::integrity(number, "inputs for composition are missing"));
            };
            invalidate(ctx, ArtifactKind::Segment, index)?;
            let output = ctx.workspace.artifact_path(ArtifactKind::Segment, index);

            ctx.describe(format!("Composing video for slide {}/{}", number, total));
            let result = runner.run(
                |attempt| {
                    ctx.logger.command(&format!(
                        "compose slide {} (attempt {}/{})",
                        number, attempt.attempt, attempt.max_attempts
                    ));
                    encoder
                        .compose(&image, &clip, &output, max_duration, attempt.timeout)
                        .inspect_err(|e| record_output(ctx, e))
                        .map(|()| output.clone())
                },
                |_| {},
            );

            match result {
                Ok(artifact) => {
                    mark_complete(ctx, ArtifactKind::Segment, index, artifact.bytes, "composed")?;
                    slide.segment = Some(output);
                }
                Err(failure) => {
                    ctx.logger
                        .error(&format!("Slide {}: composition {}", number, failure));
                    slide.segment = None;
                    failed.push(number);
                }
            }
            report(ctx, number, total);
        }

        if !failed.is_empty() {
            ctx.logger.warn(&format!(
                "{} slide(s) have no composed segment: {:?}",
                failed.len(),
                failed
            ));
        }

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, _job: &Job) -> StepResult<()> {
        // Gaps are reported by concatenation, which names the slide.
        Ok(())
    }
}

fn report(ctx: &Context, number: usize, total: usize) {
    ctx.report_slide(number, total, format!("Composed slide {}/{}", number, total));
}
