//! Per-job artifact storage and resumability markers.

mod layout;
mod marker;

pub use layout::{slide_file_name, JobWorkspace, FINAL_VIDEO_NAME};
pub use marker::CompletionMarker;
