//! Pipeline orchestrator for coordinating job execution.
//!
//! Each job runs a fixed sequence of steps. Every step validates its
//! inputs, works through the slides in order, and records its results on
//! the [`Job`](crate::models::Job) and in the job workspace.
//!
//! # Architecture
//!
//! ```text
//! Pipeline
//!     ├── Step: ExtractSlides   (ExtractingSlides   0-5)
//!     ├── Step: RenderImages    (RenderingImages    5-15)
//!     ├── Step: GenerateAudio   (GeneratingAudio   15-40)
//!     ├── Step: AnimateFaces    (AnimatingFaces    40-75)
//!     ├── Step: ComposeVideo    (ComposingVideo    75-95)
//!     └── Step: Concatenate     (Concatenating     95-100)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use speaker_core::orchestrator::{create_standard_pipeline, JobProcessor};
//!
//! let pipeline = create_standard_pipeline();
//! let cancel = pipeline.cancel_handle();
//! let writer = tracker.begin("job-123");
//!
//! let processor = JobProcessor::new(settings, capabilities);
//! let result = processor.process("job-123", &request, writer, pipeline);
//! println!("Completed: {:?}", result.output_path);
//! ```

mod errors;
mod job_processor;
mod pipeline;
mod step;
pub mod steps;
mod types;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use job_processor::{JobProcessor, JobResult, SharedLineCallback};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{AnimateStep, AudioStep, ComposeStep, ConcatStep, ExtractStep, RenderStep};
pub use types::{Context, StepOutcome};

/// Create a standard pipeline with all steps in the correct order.
///
/// 1. ExtractSlides - read narration and images from the presentation
/// 2. RenderImages - normalize slide images to PNG
/// 3. GenerateAudio - synthesize narration (placeholder on failure)
/// 4. AnimateFaces - lip-sync clips (still-image fallback)
/// 5. ComposeVideo - overlay clips on slides
/// 6. Concatenate - join segments into the final video
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(ExtractStep::new())
        .with_step(RenderStep::new())
        .with_step(AudioStep::new())
        .with_step(AnimateStep::new())
        .with_step(ComposeStep::new())
        .with_step(ConcatStep::new())
}
