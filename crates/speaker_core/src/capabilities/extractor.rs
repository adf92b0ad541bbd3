//! Slide extraction.
//!
//! Text extraction from office formats is done elsewhere; the pipeline
//! consumes a JSON manifest listing each slide's narration and image.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::errors::ExtractionError;
use crate::models::ExtractedSlide;

/// Turns a presentation file into an ordered slide list.
pub trait SlideExtractor: Send + Sync {
    fn extract(&self, presentation: &Path) -> Result<Vec<ExtractedSlide>, ExtractionError>;
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    slides: Vec<ManifestSlide>,
}

#[derive(Debug, Deserialize)]
struct ManifestSlide {
    #[serde(default)]
    text: String,
    image: String,
}

/// Reads `{ "slides": [ { "text": "...", "image": "..." } ] }`.
///
/// Relative image paths are resolved against the manifest's directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestExtractor;

impl ManifestExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl SlideExtractor for ManifestExtractor {
    fn extract(&self, presentation: &Path) -> Result<Vec<ExtractedSlide>, ExtractionError> {
        let is_json = presentation
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if !is_json {
            return Err(ExtractionError::Unsupported(presentation.to_path_buf()));
        }
        if !presentation.exists() {
            return Err(ExtractionError::NotFound(presentation.to_path_buf()));
        }

        let content =
            fs::read_to_string(presentation).map_err(|source| ExtractionError::Unreadable {
                path: presentation.to_path_buf(),
                source,
            })?;
        let manifest: Manifest =
            serde_json::from_str(&content).map_err(|e| ExtractionError::Malformed {
                path: presentation.to_path_buf(),
                message: e.to_string(),
            })?;

        if manifest.slides.is_empty() {
            return Err(ExtractionError::Empty(presentation.to_path_buf()));
        }

        let base = presentation.parent().unwrap_or_else(|| Path::new("."));
        let slides = manifest
            .slides
            .into_iter()
            .map(|slide| {
                let image = Path::new(&slide.image);
                let image = if image.is_absolute() {
                    image.to_path_buf()
                } else {
                    base.join(image)
                };
                ExtractedSlide::new(slide.text, image)
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "Extracted {} slides from {}",
            slides.len(),
            presentation.display()
        );
        Ok(slides)
    }
}
