//! Pipeline runner that executes steps in sequence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::errors::{PipelineError, PipelineResult};
use super::step::PipelineStep;
use super::types::{Context, StepOutcome};
use crate::models::Job;
use crate::progress::phase_range;

/// Pipeline that runs a sequence of steps.
///
/// Steps run in order, each between input and output validation. The
/// job's phase advances as each step starts; phases never go backwards.
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
    cancelled: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Handle that stops the pipeline at the next step or slide boundary.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Run every step against `job`.
    ///
    /// For each step:
    /// 1. Check for cancellation
    /// 2. Advance the job's phase, publish it and start a fresh output tail
    /// 3. Run `validate_input`, `execute`, then `validate_output`
    /// 4. Publish the end of the phase's progress range
    ///
    /// Terminal states are left to the caller.
    pub fn run(&self, ctx: &Context, job: &mut Job) -> PipelineResult<PipelineRunResult> {
        let mut result = PipelineRunResult {
            steps_completed: Vec::new(),
            steps_skipped: Vec::new(),
        };

        for step in &self.steps {
            let step_name = step.name();

            if ctx.is_cancelled() {
                ctx.logger
                    .warn(&format!("Pipeline cancelled before step '{}'", step_name));
                return Err(PipelineError::cancelled(ctx.job_id()));
            }

            let phase = step.phase();
            if !job.advance(phase) {
                ctx.logger.error(&format!(
                    "Illegal phase transition {} -> {}",
                    job.phase(),
                    phase
                ));
                return Err(PipelineError::setup_failed(
                    ctx.job_id(),
                    format!("cannot enter {} from {}", phase, job.phase()),
                ));
            }
            ctx.progress.enter_phase(phase, step.description());
            ctx.logger.phase(step_name);
            ctx.logger.clear_tail();

            ctx.logger.debug(&format!("Validating input for '{}'", step_name));
            if let Err(e) = step.validate_input(ctx, job) {
                ctx.logger.error(&format!("Input validation failed: {}", e));
                return Err(PipelineError::step_failed(ctx.job_id(), step_name, e));
            }

            let outcome = step.execute(ctx, job).map_err(|e| {
                ctx.logger.error(&format!("Execution failed: {}", e));
                PipelineError::step_failed(ctx.job_id(), step_name, e)
            })?;

            match outcome {
                StepOutcome::Success => {
                    if let Err(e) = step.validate_output(ctx, job) {
                        ctx.logger.error(&format!("Output validation failed: {}", e));
                        return Err(PipelineError::step_failed(ctx.job_id(), step_name, e));
                    }
                    ctx.logger.success(&format!("{} completed", step_name));
                    result.steps_completed.push(step_name.to_string());
                }
                StepOutcome::Skipped(reason) => {
                    ctx.logger.info(&format!("{} skipped: {}", step_name, reason));
                    result.steps_skipped.push(step_name.to_string());
                }
            }

            if let Some(range) = phase_range(phase) {
                ctx.progress
                    .report(range.end, format!("{} completed", step_name));
            }
        }

        Ok(result)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for cancelling a running pipeline.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRunResult {
    pub steps_completed: Vec<String>,
    pub steps_skipped: Vec<String>,
}
