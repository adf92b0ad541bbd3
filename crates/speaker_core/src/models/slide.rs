//! Slide data structures.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::{AudioSource, ClipSource};

/// A single slide as returned by the extraction capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedSlide {
    /// Narration text (may be empty).
    pub text: String,
    /// Rendered slide image.
    pub image: PathBuf,
}

impl ExtractedSlide {
    pub fn new(text: impl Into<String>, image: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            image: image.into(),
        }
    }
}

/// One slide flowing through the pipeline.
///
/// The derived artifact fields start empty and are filled in by the
/// stage that produces them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    /// 0-based position in the presentation.
    index: usize,
    /// Narration text (may be empty).
    pub text: String,
    /// Rendered image as supplied by extraction.
    pub source_image: PathBuf,
    /// Image copied into the job workspace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    /// Narration audio.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_source: Option<AudioSource>,
    /// Animated (or still) face clip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_source: Option<ClipSource>,
    /// Slide image composed with its clip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<PathBuf>,
}

impl Slide {
    pub fn new(index: usize, extracted: ExtractedSlide) -> Self {
        Self {
            index,
            text: extracted.text,
            source_image: extracted.image,
            image: None,
            audio: None,
            audio_source: None,
            clip: None,
            clip_source: None,
            segment: None,
        }
    }

    /// 0-based slide index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based slide number for display.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Whether the narration has any speakable content.
    pub fn has_narration(&self) -> bool {
        !self.text.trim().is_empty()
    }
}
