//! Animate step - turns each slide's narration into a talking-head clip.
//!
//! Lip-sync is optional. When it is unavailable, or exhausts its attempts
//! for a slide, the slide gets a still clip of the face held for the
//! length of the narration. Only a failed still clip is fatal.

use std::path::Path;

use super::{invalidate, mark_complete, record_output, reusable};
use crate::models::{ArtifactKind, ClipSource, Job, JobPhase};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};
use crate::runner::{Artifact, StagePolicy, StageRunner};

pub struct AnimateStep;

impl AnimateStep {
    pub fn new() -> Self {
        Self
    }

    /// Still clip fallback; its length follows the narration audio.
    fn still_clip(
        ctx: &Context,
        runner: &StageRunner,
        face: &Path,
        audio: &Path,
        output: &Path,
        number: usize,
    ) -> StepResult<Artifact> {
        let encoder = &ctx.capabilities.encoder;
        let duration = match encoder.probe_duration(audio, ctx.settings.composition.timeout()) {
            Ok(secs) if secs > 0.0 => secs,
            Ok(_) | Err(_) => {
                let fallback = ctx.settings.animation.fallback_duration_secs;
                ctx.logger.warn(&format!(
                    "Slide {}: could not read audio duration, holding still image for {}s",
                    number, fallback
                ));
                fallback
            }
        };

        ctx.describe(format!("Creating still clip for slide {}", number));
        runner
            .run(
                |attempt| {
                    encoder
                        .still_clip(face, audio, output, duration, attempt.timeout)
                        .inspect_err(|e| record_output(ctx, e))
                        .map(|()| output.to_path_buf())
                },
                |_| {},
            )
            .map_err(|failure| {
                StepError::tool(format!("still clip for slide {}", number), failure.last_error)
            })
    }
}

impl Default for AnimateStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for AnimateStep {
    fn name(&self) -> &str {
        "AnimateFaces"
    }

    fn phase(&self) -> JobPhase {
        JobPhase::AnimatingFaces
    }

    fn description(&self) -> &str {
        "Animating faces..."
    }

    fn validate_input(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        if !job.face_image.is_file() {
            return Err(StepError::missing(format!(
                "face image {} not found",
                crate::runner::file_label(&job.face_image)
            )));
        }
        match job.slides.iter().find(|s| s.audio.is_none()) {
            Some(slide) => Err(StepError::integrity(slide.number(), "narration audio is missing")),
            None => Ok(()),
        }
    }

    fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome> {
        let animation = &ctx.settings.animation;
        let composition = &ctx.settings.composition;
        let min_bytes = ctx.settings.validation.min_clip_bytes;

        let lipsync_runner = StageRunner::new(
            "lip-sync",
            StagePolicy::new(animation.max_attempts, animation.timeout())?
                .with_min_bytes(min_bytes)
                .with_retry_delay(animation.retry_delay()),
        );
        let still_runner = StageRunner::new(
            "still clip",
            StagePolicy::new(composition.max_attempts, composition.timeout())?
                .with_min_bytes(min_bytes),
        );

        let available = ctx.capabilities.lipsync.is_available();
        job.lipsync_available = Some(available);
        if !available {
            ctx.warn("lip-sync unavailable; using still-image clips");
        }

        let face = job.face_image.clone();
        let total = job.slides.len();

        for slide in job.slides.iter_mut() {
            ctx.check_cancelled()?;
            let index = slide.index();
            let number = slide.number();

            if let Some((path, marker)) = reusable(ctx, ArtifactKind::Clip, index, min_bytes) {
                slide.clip = Some(path);
                slide.clip_source =
                    Some(ClipSource::from_label(&marker.source).unwrap_or(ClipSource::LipSync));
                report(ctx, number, total);
                continue;
            }

            let audio = slide
                .audio
                .clone()
                .ok_or_else(|| StepError::integrity(number, "narration audio is missing"))?;
            invalidate(ctx, ArtifactKind::Clip, index)?;
            let output = ctx.workspace.artifact_path(ArtifactKind::Clip, index);

            let animated = if available {
                ctx.describe(format!("Animating face for slide {}/{}", number, total));
                let lipsync = &ctx.capabilities.lipsync;
                let result = lipsync_runner.run(
                    |attempt| {
                        if attempt.attempt > 1 {
                            ctx.describe(format!(
                                "Animating face for slide {}/{} (attempt {}/{})",
                                number, total, attempt.attempt, attempt.max_attempts
                            ));
                        }
                        ctx.logger.command(&format!(
                            "lip-sync slide {} (attempt {}/{})",
                            number, attempt.attempt, attempt.max_attempts
                        ));
                        lipsync
                            .animate(&face, &audio, &output, attempt.timeout)
                            .inspect_err(|e| record_output(ctx, e))
                            .map(|()| output.clone())
                    },
                    |_| {},
                );
                match result {
                    Ok(artifact) => Some(artifact),
                    Err(failure) => {
                        ctx.logger
                            .error(&format!("Slide {}: lip-sync {}", number, failure));
                        ctx.warn(format!(
                            "slide {}: lip-sync failed, still-image clip used",
                            number
                        ));
                        None
                    }
                }
            } else {
                None
            };

            let (bytes, source) = match animated {
                Some(artifact) => (artifact.bytes, ClipSource::LipSync),
                None => {
                    let artifact =
                        Self::still_clip(ctx, &still_runner, &face, &audio, &output, number)?;
                    (artifact.bytes, ClipSource::StillFallback)
                }
            };

            mark_complete(ctx, ArtifactKind::Clip, index, bytes, source.as_str())?;
            slide.clip = Some(output);
            slide.clip_source = Some(source);
            report(ctx, number, total);
        }

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        match job.slides.iter().find(|s| s.clip.is_none()) {
            Some(slide) => Err(StepError::integrity(slide.number(), "animated clip is missing")),
            None => Ok(()),
        }
    }
}

fn report(ctx: &Context, number: usize, total: usize) {
    ctx.report_slide(number, total, format!("Animated slide {}/{}", number, total));
}
