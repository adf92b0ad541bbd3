//! External capabilities the pipeline consumes.
//!
//! Each capability is a trait so tests and alternative backends can
//! stand in for the command-line tools used by default.

mod encoder;
mod errors;
mod extractor;
mod lipsync;
mod speech;

use std::sync::Arc;

pub use encoder::{FfmpegEncoder, Layout, VideoEncoder};
pub use errors::ExtractionError;
pub use extractor::{ManifestExtractor, SlideExtractor};
pub use lipsync::{LipSync, Wav2LipCommand};
pub use speech::{
    write_silence, CommandSpeechEngine, SpeechEngine, SpeechHandle, SpeechLease, Voice,
};

use crate::config::Settings;

/// The set of capabilities a job runs against.
#[derive(Clone)]
pub struct Capabilities {
    pub extractor: Arc<dyn SlideExtractor>,
    pub speech: SpeechHandle,
    pub lipsync: Arc<dyn LipSync>,
    pub encoder: Arc<dyn VideoEncoder>,
}

impl Capabilities {
    /// Command-line backed capabilities configured from `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            extractor: Arc::new(ManifestExtractor::new()),
            speech: SpeechHandle::new(Box::new(CommandSpeechEngine::new(&settings.speech))),
            lipsync: Arc::new(Wav2LipCommand::new(&settings.animation)),
            encoder: Arc::new(FfmpegEncoder::new(settings)),
        }
    }
}
