//! Execution of external work: processes with time limits, and the
//! retry/validation policy every stage runs its per-slide work under.

mod errors;
mod process;
mod stage_runner;

pub(crate) use errors::file_label;
pub use errors::{ToolError, ToolResult};
pub use process::{is_runnable, run_tool, ToolOutput};
pub use stage_runner::{
    validate_min_size, Artifact, AttemptContext, AttemptOutcome, PolicyError, StageAttempt,
    StageFailure, StagePolicy, StageRunner,
};
