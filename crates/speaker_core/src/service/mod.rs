//! The control surface exposed to front ends.
//!
//! A [`SpeakerService`] runs at most one job at a time on a worker
//! thread. Callers poll [`SpeakerService::status`] and fetch the video
//! with [`SpeakerService::result`] once the job has completed.

mod errors;
mod speaker;

pub use errors::{CleanupError, PreviewError, ResultError, StartRejected};
pub use speaker::{CleanupReport, JobArtifact, JobTicket, SpeakerService, VoicePreview, PREVIEW_TEXT};
