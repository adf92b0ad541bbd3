//! Per-job working directory.
//!
//! ```text
//! <work_root>/<job_id>/
//!     images/slide_001.png
//!     audio/slide_001.wav
//!     clips/slide_001.mp4
//!     segments/slide_001.mp4
//!     markers/audio_001.json
//! <output_root>/<job_id>/final_presentation_with_slides.mp4
//! <output_root>/<job_id>/.pending_final_presentation_with_slides.mp4
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::marker::CompletionMarker;
use crate::models::ArtifactKind;

/// Name of the final concatenated video.
pub const FINAL_VIDEO_NAME: &str = "final_presentation_with_slides.mp4";

/// File name for a slide's artifact: `slide_001.wav` for index 0.
pub fn slide_file_name(index: usize, extension: &str) -> String {
    format!("slide_{:03}.{}", index + 1, extension)
}

/// Directory layout for one job, namespaced by job id.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    job_id: String,
    root: PathBuf,
    output_dir: PathBuf,
}

impl JobWorkspace {
    pub fn new(work_root: &Path, output_root: &Path, job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            root: work_root.join(job_id),
            output_dir: output_root.join(job_id),
        }
    }

    /// Create all subdirectories. Existing content is kept for resumption.
    pub fn create(&self) -> io::Result<()> {
        for kind in [
            ArtifactKind::Image,
            ArtifactKind::Audio,
            ArtifactKind::Clip,
            ArtifactKind::Segment,
        ] {
            fs::create_dir_all(self.root.join(kind.dir_name()))?;
        }
        fs::create_dir_all(self.markers_dir())?;
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn markers_dir(&self) -> PathBuf {
        self.root.join("markers")
    }

    /// Deterministic path of a slide's artifact.
    pub fn artifact_path(&self, kind: ArtifactKind, index: usize) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join(slide_file_name(index, kind.extension()))
    }

    pub fn marker_path(&self, kind: ArtifactKind, index: usize) -> PathBuf {
        self.markers_dir()
            .join(format!("{}_{:03}.json", kind, index + 1))
    }

    /// Where the final video is published once validated.
    pub fn final_video_path(&self) -> PathBuf {
        self.output_dir.join(FINAL_VIDEO_NAME)
    }

    /// Where the encoder writes before the final video is validated.
    ///
    /// Lives next to the final video so publishing is a same-directory
    /// rename, whatever filesystems the work and output roots are on.
    pub fn pending_video_path(&self) -> PathBuf {
        self.output_dir.join(format!(".pending_{}", FINAL_VIDEO_NAME))
    }

    /// Record that the artifact for (`kind`, `index`) is complete.
    pub fn mark_complete(
        &self,
        kind: ArtifactKind,
        index: usize,
        bytes: u64,
        source: &str,
    ) -> io::Result<CompletionMarker> {
        let marker = CompletionMarker::new(kind, index + 1, bytes, source);
        marker.save(&self.marker_path(kind, index))?;
        Ok(marker)
    }

    /// Return the artifact and its marker if a finished one exists.
    ///
    /// Valid means: marker present, file present, size equal to the
    /// marker's and at least `min_bytes`. Anything else is not finished.
    pub fn completed_artifact(
        &self,
        kind: ArtifactKind,
        index: usize,
        min_bytes: u64,
    ) -> Option<(PathBuf, CompletionMarker)> {
        let marker = CompletionMarker::load(&self.marker_path(kind, index))?;
        let path = self.artifact_path(kind, index);
        if marker.kind != kind || marker.slide != index + 1 {
            return None;
        }
        marker.matches(&path, min_bytes).then_some((path, marker))
    }

    /// Drop the marker and any file for (`kind`, `index`).
    pub fn invalidate(&self, kind: ArtifactKind, index: usize) -> io::Result<()> {
        for path in [self.marker_path(kind, index), self.artifact_path(kind, index)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Drop (`kind`, `index`) and every artifact of that slide built from it.
    pub fn invalidate_with_dependents(&self, kind: ArtifactKind, index: usize) -> io::Result<()> {
        self.invalidate(kind, index)?;
        for dependent in kind.dependents() {
            self.invalidate(*dependent, index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn workspace(base: &Path) -> JobWorkspace {
        JobWorkspace::new(&base.join("work"), &base.join("out"), "job-1")
    }

    #[test]
    fn paths_are_deterministic_per_slide() {
        let dir = tempdir().unwrap();
        let ws = workspace(dir.path());

        assert_eq!(slide_file_name(0, "wav"), "slide_001.wav");
        assert!(ws
            .artifact_path(ArtifactKind::Audio, 1)
            .ends_with("job-1/audio/slide_002.wav"));
        assert!(ws
            .artifact_path(ArtifactKind::Segment, 11)
            .ends_with("job-1/segments/slide_012.mp4"));
        assert!(ws
            .marker_path(ArtifactKind::Clip, 0)
            .ends_with("job-1/markers/clip_001.json"));
        assert!(ws.final_video_path().ends_with("out/job-1/final_presentation_with_slides.mp4"));
    }

    #[test]
    fn pending_video_shares_the_final_directory() {
        let dir = tempdir().unwrap();
        let ws = JobWorkspace::new(&dir.path().join("scratch"), Path::new("/mnt/exports"), "job-1");

        let pending = ws.pending_video_path();
        assert_eq!(pending.parent(), ws.final_video_path().parent());
        assert!(!pending.starts_with(ws.root()));
        assert_ne!(pending, ws.final_video_path());
    }

    #[test]
    fn file_without_marker_is_not_complete() {
        let dir = tempdir().unwrap();
        let ws = workspace(dir.path());
        ws.create().unwrap();

        fs::write(ws.artifact_path(ArtifactKind::Audio, 0), vec![1u8; 500]).unwrap();
        assert!(ws.completed_artifact(ArtifactKind::Audio, 0, 44).is_none());

        ws.mark_complete(ArtifactKind::Audio, 0, 500, "synthesized")
            .unwrap();
        let (path, marker) = ws.completed_artifact(ArtifactKind::Audio, 0, 44).unwrap();
        assert!(path.ends_with("slide_001.wav"));
        assert_eq!(marker.source, "synthesized");
    }

    #[test]
    fn truncated_file_is_not_complete() {
        let dir = tempdir().unwrap();
        let ws = workspace(dir.path());
        ws.create().unwrap();

        let path = ws.artifact_path(ArtifactKind::Clip, 2);
        fs::write(&path, vec![1u8; 4096]).unwrap();
        ws.mark_complete(ArtifactKind::Clip, 2, 4096, "lip_sync")
            .unwrap();
        fs::write(&path, vec![1u8; 100]).unwrap();

        assert!(ws.completed_artifact(ArtifactKind::Clip, 2, 1).is_none());
    }

    #[test]
    fn invalidate_removes_marker_and_file() {
        let dir = tempdir().unwrap();
        let ws = workspace(dir.path());
        ws.create().unwrap();

        fs::write(ws.artifact_path(ArtifactKind::Segment, 0), b"segment").unwrap();
        ws.mark_complete(ArtifactKind::Segment, 0, 7, "composed")
            .unwrap();
        ws.invalidate(ArtifactKind::Segment, 0).unwrap();
        ws.invalidate(ArtifactKind::Segment, 0).unwrap();

        assert!(!ws.artifact_path(ArtifactKind::Segment, 0).exists());
        assert!(!ws.marker_path(ArtifactKind::Segment, 0).exists());
    }

    #[test]
    fn rebuilding_audio_drops_the_slides_clip_and_segment() {
        let dir = tempdir().unwrap();
        let ws = workspace(dir.path());
        ws.create().unwrap();

        for index in [0, 1] {
            for (kind, source) in [
                (ArtifactKind::Image, "rendered"),
                (ArtifactKind::Audio, "synthesized"),
                (ArtifactKind::Clip, "lip_sync"),
                (ArtifactKind::Segment, "composed"),
            ] {
                fs::write(ws.artifact_path(kind, index), vec![1u8; 64]).unwrap();
                ws.mark_complete(kind, index, 64, source).unwrap();
            }
        }

        ws.invalidate_with_dependents(ArtifactKind::Audio, 1).unwrap();

        assert!(ws.completed_artifact(ArtifactKind::Image, 1, 1).is_some());
        assert!(ws.completed_artifact(ArtifactKind::Audio, 1, 1).is_none());
        assert!(ws.completed_artifact(ArtifactKind::Clip, 1, 1).is_none());
        assert!(ws.completed_artifact(ArtifactKind::Segment, 1, 1).is_none());
        for kind in [ArtifactKind::Audio, ArtifactKind::Clip, ArtifactKind::Segment] {
            assert!(ws.completed_artifact(kind, 0, 1).is_some(), "{}", kind);
        }
    }
}
