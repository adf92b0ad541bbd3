//! Extract step - reads the presentation into ordered slides.

use crate::capabilities::ExtractionError;
use crate::models::{Job, JobPhase, Slide};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};
use crate::runner::file_label;

/// Reads narration text and slide images from the presentation.
///
/// Both input files must exist before anything else runs; a presentation
/// that yields no slides is fatal.
pub struct ExtractStep;

impl ExtractStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExtractStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ExtractStep {
    fn name(&self) -> &str {
        "ExtractSlides"
    }

    fn phase(&self) -> JobPhase {
        JobPhase::ExtractingSlides
    }

    fn description(&self) -> &str {
        "Extracting slides..."
    }

    fn validate_input(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        if !job.presentation.is_file() {
            return Err(StepError::missing(format!(
                "presentation {} not found",
                file_label(&job.presentation)
            )));
        }
        if !job.face_image.is_file() {
            return Err(StepError::missing(format!(
                "face image {} not found",
                file_label(&job.face_image)
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome> {
        ctx.logger.info(&format!(
            "Reading presentation {}",
            job.presentation.display()
        ));

        let extracted = ctx.capabilities.extractor.extract(&job.presentation)?;
        if extracted.is_empty() {
            return Err(ExtractionError::Empty(job.presentation.clone()).into());
        }

        job.slides = extracted
            .into_iter()
            .enumerate()
            .map(|(index, slide)| Slide::new(index, slide))
            .collect();

        let silent = job.slides.iter().filter(|s| !s.has_narration()).count();
        ctx.logger.info(&format!(
            "Found {} slide(s), {} without narration",
            job.slides.len(),
            silent
        ));
        ctx.report_slide(1, 1, format!("Found {} slides", job.slides.len()));

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        if job.slides.is_empty() {
            return Err(StepError::invalid_output("no slides were extracted"));
        }
        Ok(())
    }
}
