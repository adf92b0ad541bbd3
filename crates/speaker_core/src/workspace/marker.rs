//! Per-(job, slide, stage) completion markers.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::ArtifactKind;

/// Written after an artifact has been validated.
///
/// An artifact only counts as finished when its marker exists and the
/// file on disk still has the recorded size, so a half-written file
/// left behind by a crash is never mistaken for a finished one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub kind: ArtifactKind,
    /// 1-based slide number.
    pub slide: usize,
    /// Size of the artifact when it was validated.
    pub bytes: u64,
    /// Provenance label (for example `synthesized` or `still_fallback`).
    pub source: String,
    pub written_at: String,
}

impl CompletionMarker {
    pub fn new(kind: ArtifactKind, slide: usize, bytes: u64, source: impl Into<String>) -> Self {
        Self {
            kind,
            slide,
            bytes,
            source: source.into(),
            written_at: chrono::Local::now().to_rfc3339(),
        }
    }

    /// Load a marker. A missing or unparsable marker reads as `None`.
    pub fn load(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(marker) => Some(marker),
            Err(e) => {
                tracing::warn!("Ignoring corrupt marker {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write atomically via a temp file.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &json)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Whether `artifact` still matches this marker and meets `min_bytes`.
    pub fn matches(&self, artifact: &Path, min_bytes: u64) -> bool {
        match fs::metadata(artifact) {
            Ok(meta) => meta.is_file() && meta.len() == self.bytes && meta.len() >= min_bytes,
            Err(_) => false,
        }
    }
}
