//! Progress tracking shared between the pipeline and polling clients.

mod ranges;
mod record;
mod tracker;

pub use ranges::{phase_range, PhaseRange};
pub use record::ProgressRecord;
pub use tracker::{ProgressTracker, ProgressWriter};
