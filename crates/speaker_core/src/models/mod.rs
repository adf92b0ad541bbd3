//! Data models for Speaker Avatar.
//!
//! - Enums for job phases and artifact provenance
//! - Slide structures (extracted input, per-slide pipeline record)
//! - Job structures (request, run record)

mod enums;
mod job;
mod slide;

pub use enums::{ArtifactKind, AudioSource, ClipSource, JobPhase};
pub use job::{Job, JobRequest};
pub use slide::{ExtractedSlide, Slide};
