//! Pipeline step implementations.
//!
//! Each step handles one phase of the slide-to-video pipeline and works
//! through the slides in order.

mod animate;
mod audio;
mod compose;
mod concat;
mod extract;
mod render;

pub use animate::AnimateStep;
pub use audio::AudioStep;
pub use compose::ComposeStep;
pub use concat::ConcatStep;
pub use extract::ExtractStep;
pub use render::RenderStep;

use std::path::PathBuf;

use super::errors::{StepError, StepResult};
use super::types::Context;
use crate::models::ArtifactKind;
use crate::runner::ToolError;
use crate::workspace::CompletionMarker;

/// A finished artifact from an earlier run, when resuming is enabled.
fn reusable(
    ctx: &Context,
    kind: ArtifactKind,
    index: usize,
    min_bytes: u64,
) -> Option<(PathBuf, CompletionMarker)> {
    if !ctx.settings.processing.skip_existing {
        return None;
    }
    let found = ctx.workspace.completed_artifact(kind, index, min_bytes)?;
    ctx.logger.info(&format!(
        "Slide {}: reusing existing {} ({} bytes)",
        index + 1,
        kind,
        found.1.bytes
    ));
    Some(found)
}

/// Clear stale state for (`kind`, `index`) before producing it again.
///
/// Later artifacts of the slide built from the old one are dropped too,
/// so a resumed job rebuilds them from the new one.
fn invalidate(ctx: &Context, kind: ArtifactKind, index: usize) -> StepResult<()> {
    ctx.workspace
        .invalidate_with_dependents(kind, index)
        .map_err(|e| StepError::io(format!("clearing {} for slide {}", kind, index + 1), e))
}

fn mark_complete(
    ctx: &Context,
    kind: ArtifactKind,
    index: usize,
    bytes: u64,
    source: &str,
) -> StepResult<()> {
    ctx.workspace
        .mark_complete(kind, index, bytes, source)
        .map(|_| ())
        .map_err(|e| StepError::io(format!("recording {} for slide {}", kind, index + 1), e))
}

/// Keep a failed tool's output in the log tail for the failure report.
fn record_output(ctx: &Context, error: &ToolError) {
    if let Some(tail) = error.output_tail() {
        for line in tail.lines() {
            ctx.logger.output_line(line, true);
        }
    }
}
