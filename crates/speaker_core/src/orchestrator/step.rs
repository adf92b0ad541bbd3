//! Pipeline step trait definition.

use super::errors::StepResult;
use super::types::{Context, StepOutcome};
use crate::models::{Job, JobPhase};

/// One stage of the pipeline.
///
/// The pipeline runner calls these methods in order:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work, recording results on the job
/// 3. `validate_output` - Verify the step produced what later steps need
///
/// # Example
///
/// ```ignore
/// struct RenderStep;
///
/// impl PipelineStep for RenderStep {
///     fn name(&self) -> &str { "RenderImages" }
///     fn phase(&self) -> JobPhase { JobPhase::RenderingImages }
///
///     fn validate_input(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
///         if job.slides.is_empty() {
///             return Err(StepError::invalid_output("no slides to render"));
///         }
///         Ok(())
///     }
///
///     fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome> {
///         // copy each slide image into the workspace...
///         Ok(StepOutcome::Success)
///     }
///
///     fn validate_output(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait PipelineStep: Send + Sync {
    /// Step name (for logging and error context).
    fn name(&self) -> &str;

    /// Lifecycle phase the job is in while this step runs.
    fn phase(&self) -> JobPhase;

    fn validate_input(&self, ctx: &Context, job: &Job) -> StepResult<()>;

    /// Perform the step's work.
    ///
    /// Report per-slide progress through `ctx.report_slide()` and check
    /// `ctx.check_cancelled()` between slides.
    fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome>;

    /// Called after `execute` returns `Success`.
    fn validate_output(&self, ctx: &Context, job: &Job) -> StepResult<()>;

    /// Description published when the step starts.
    fn description(&self) -> &str {
        self.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockStep;

    impl PipelineStep for MockStep {
        fn name(&self) -> &str {
            "Mock"
        }

        fn phase(&self) -> JobPhase {
            JobPhase::ComposingVideo
        }

        fn validate_input(&self, _ctx: &Context, _job: &Job) -> StepResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _job: &mut Job) -> StepResult<StepOutcome> {
            Ok(StepOutcome::Success)
        }

        fn validate_output(&self, _ctx: &Context, _job: &Job) -> StepResult<()> {
            Ok(())
        }
    }

    #[test]
    fn description_defaults_to_name() {
        let step: Box<dyn PipelineStep> = Box::new(MockStep);
        assert_eq!(step.description(), "Mock");
        assert_eq!(step.phase(), JobPhase::ComposingVideo);
    }
}
