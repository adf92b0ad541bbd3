//! Render step - normalizes every slide image to PNG in the workspace.

use image::ImageFormat;

use super::{invalidate, mark_complete, reusable};
use crate::models::{ArtifactKind, Job, JobPhase};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};
use crate::runner::{file_label, validate_min_size};

/// Decodes each slide image and writes it as `images/slide_NNN.png`.
///
/// Decoding doubles as validation: an image that cannot be read is a
/// missing resource for that slide.
pub struct RenderStep;

impl RenderStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RenderStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for RenderStep {
    fn name(&self) -> &str {
        "RenderImages"
    }

    fn phase(&self) -> JobPhase {
        JobPhase::RenderingImages
    }

    fn description(&self) -> &str {
        "Rendering slide images..."
    }

    fn validate_input(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        for slide in &job.slides {
            if !slide.source_image.is_file() {
                return Err(StepError::missing_for_slide(
                    format!("image {} not found", file_label(&slide.source_image)),
                    slide.number(),
                ));
            }
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome> {
        let min_bytes = ctx.settings.validation.min_image_bytes;
        let total = job.slides.len();

        for slide in job.slides.iter_mut() {
            ctx.check_cancelled()?;
            let index = slide.index();

            if let Some((path, _)) = reusable(ctx, ArtifactKind::Image, index, min_bytes) {
                slide.image = Some(path);
                report(ctx, slide.number(), total);
                continue;
            }

            invalidate(ctx, ArtifactKind::Image, index)?;
            let output = ctx.workspace.artifact_path(ArtifactKind::Image, index);

            let decoded = image::open(&slide.source_image).map_err(|e| {
                StepError::missing_for_slide(
                    format!("image {} unreadable: {}", file_label(&slide.source_image), e),
                    slide.number(),
                )
            })?;
            if decoded.width() == 0 || decoded.height() == 0 {
                return Err(StepError::missing_for_slide(
                    format!("image {} has no pixels", file_label(&slide.source_image)),
                    slide.number(),
                ));
            }

            decoded
                .save_with_format(&output, ImageFormat::Png)
                .map_err(|e| {
                    StepError::io(
                        format!("writing {}", file_label(&output)),
                        std::io::Error::other(e),
                    )
                })?;
            let bytes = validate_min_size(&output, min_bytes)
                .map_err(|e| StepError::tool(format!("rendering slide {}", slide.number()), e))?;

            mark_complete(ctx, ArtifactKind::Image, index, bytes, "rendered")?;
            ctx.logger.debug(&format!(
                "Slide {}: {}x{} -> {} ({} bytes)",
                slide.number(),
                decoded.width(),
                decoded.height(),
                file_label(&output),
                bytes
            ));
            slide.image = Some(output);
            report(ctx, slide.number(), total);
        }

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        match job.slides.iter().find(|s| s.image.is_none()) {
            Some(slide) => Err(StepError::integrity(slide.number(), "rendered image is missing")),
            None => Ok(()),
        }
    }
}

fn report(ctx: &Context, number: usize, total: usize) {
    ctx.report_slide(number, total, format!("Rendered slide {}/{}", number, total));
}
