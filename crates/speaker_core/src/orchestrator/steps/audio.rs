//! Audio step - synthesizes narration for every slide.
//!
//! Speech failures never fail the job: after the attempt budget is spent
//! the slide gets a short silent placeholder and a warning is recorded.

use std::path::Path;

use super::{invalidate, mark_complete, record_output, reusable};
use crate::capabilities::write_silence;
use crate::models::{ArtifactKind, AudioSource, Job, JobPhase};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};
use crate::runner::{StagePolicy, StageRunner};

pub struct AudioStep;

impl AudioStep {
    pub fn new() -> Self {
        Self
    }

    /// The requested voice if the engine knows it, otherwise the default.
    fn resolve_voice(ctx: &Context, requested: Option<&str>) -> Option<String> {
        let requested = requested?;
        match ctx.capabilities.speech.voices() {
            Ok(voices) if voices.is_empty() => Some(requested.to_string()),
            Ok(voices) => {
                if voices.iter().any(|v| v.id == requested || v.name == requested) {
                    Some(requested.to_string())
                } else {
                    ctx.warn(format!(
                        "voice '{}' not found; using the default voice",
                        requested
                    ));
                    None
                }
            }
            Err(e) => {
                ctx.logger.debug(&format!(
                    "Could not list voices ({}); passing '{}' through",
                    e, requested
                ));
                Some(requested.to_string())
            }
        }
    }

    fn placeholder(ctx: &Context, output: &Path, number: usize) -> StepResult<u64> {
        write_silence(output, ctx.settings.speech.placeholder_secs)
            .map_err(|e| StepError::tool(format!("placeholder audio for slide {}", number), e))
    }
}

impl Default for AudioStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for AudioStep {
    fn name(&self) -> &str {
        "GenerateAudio"
    }

    fn phase(&self) -> JobPhase {
        JobPhase::GeneratingAudio
    }

    fn description(&self) -> &str {
        "Generating audio..."
    }

    fn validate_input(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        if job.slides.is_empty() {
            return Err(StepError::invalid_output("no slides to narrate"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome> {
        let speech = &ctx.settings.speech;
        let min_bytes = ctx.settings.validation.min_audio_bytes;
        let policy =
            StagePolicy::new(speech.max_attempts, speech.timeout())?.with_min_bytes(min_bytes);
        let runner = StageRunner::new("speech synthesis", policy);

        let voice = Self::resolve_voice(ctx, job.voice.as_deref());
        let total = job.slides.len();

        for slide in job.slides.iter_mut() {
            ctx.check_cancelled()?;
            let index = slide.index();
            let number = slide.number();

            if let Some((path, marker)) = reusable(ctx, ArtifactKind::Audio, index, min_bytes) {
                slide.audio = Some(path);
                slide.audio_source =
                    Some(AudioSource::from_label(&marker.source).unwrap_or(AudioSource::Synthesized));
                report(ctx, number, total);
                continue;
            }

            invalidate(ctx, ArtifactKind::Audio, index)?;
            let output = ctx.workspace.artifact_path(ArtifactKind::Audio, index);

            let (bytes, source) = if !slide.has_narration() {
                ctx.logger
                    .info(&format!("Slide {}: no narration, writing silence", number));
                (Self::placeholder(ctx, &output, number)?, AudioSource::Placeholder)
            } else {
                ctx.describe(format!("Generating audio for slide {}/{}", number, total));
                let lease = ctx.capabilities.speech.lease();
                let result = runner.run(
                    |attempt| {
                        if attempt.attempt > 1 {
                            ctx.describe(format!(
                                "Generating audio for slide {}/{} (attempt {}/{})",
                                number, total, attempt.attempt, attempt.max_attempts
                            ));
                        }
                        ctx.logger.command(&format!(
                            "speak slide {} (attempt {}/{})",
                            number, attempt.attempt, attempt.max_attempts
                        ));
                        lease
                            .speak(&slide.text, voice.as_deref(), &output, attempt.timeout)
                            .inspect_err(|e| record_output(ctx, e))
                            .map(|()| output.clone())
                    },
                    |attempt| {
                        ctx.logger.warn(&format!(
                            "Slide {}: speech attempt {}/{} failed, resetting engine",
                            number, attempt.attempt, attempt.max_attempts
                        ));
                        if let Err(e) = lease.reset() {
                            ctx.logger.warn(&format!("Speech engine reset failed: {}", e));
                        }
                    },
                );
                drop(lease);

                match result {
                    Ok(artifact) => (artifact.bytes, AudioSource::Synthesized),
                    Err(failure) => {
                        ctx.logger
                            .error(&format!("Slide {}: speech synthesis {}", number, failure));
                        ctx.warn(format!(
                            "slide {}: speech synthesis failed, placeholder audio used",
                            number
                        ));
                        (Self::placeholder(ctx, &output, number)?, AudioSource::Placeholder)
                    }
                }
            };

            mark_complete(ctx, ArtifactKind::Audio, index, bytes, source.as_str())?;
            slide.audio = Some(output);
            slide.audio_source = Some(source);
            report(ctx, number, total);
        }

        let placeholders = job
            .slides
            .iter()
            .filter(|s| s.audio_source == Some(AudioSource::Placeholder))
            .count();
        ctx.logger.info(&format!(
            "Audio ready: {} synthesized, {} placeholder",
            total - placeholders,
            placeholders
        ));

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        match job.slides.iter().find(|s| s.audio.is_none()) {
            Some(slide) => Err(StepError::integrity(slide.number(), "narration audio is missing")),
            None => Ok(()),
        }
    }
}

fn report(ctx: &Context, number: usize, total: usize) {
    ctx.report_slide(number, total, format!("Generated audio for slide {}/{}", number, total));
}
