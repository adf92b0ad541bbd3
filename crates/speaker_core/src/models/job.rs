//! Job request and job record.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::JobPhase;
use super::slide::Slide;

/// Inputs for starting a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Presentation file handed to the extraction capability.
    pub presentation: PathBuf,
    /// Still face image to animate.
    pub face_image: PathBuf,
    /// Voice identifier (None = engine default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    /// Reuse an existing job identifier (and its workspace) to resume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl JobRequest {
    pub fn new(presentation: impl Into<PathBuf>, face_image: impl Into<PathBuf>) -> Self {
        Self {
            presentation: presentation.into(),
            face_image: face_image.into(),
            voice: None,
            job_id: None,
        }
    }

    /// Select a voice.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        let voice = voice.into();
        self.voice = if voice.trim().is_empty() {
            None
        } else {
            Some(voice)
        };
        self
    }

    /// Resume (or pin) a job identifier.
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }
}

/// One end-to-end run.
///
/// This is the mutable record the pipeline steps build up. The final
/// artifact and error detail are write-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: String,
    /// When the job started.
    pub started_at: String,
    /// Presentation file.
    pub presentation: PathBuf,
    /// Face image.
    pub face_image: PathBuf,
    /// Selected voice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    /// Slides in presentation order.
    pub slides: Vec<Slide>,
    /// Lip-sync capability detected at the start of animation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lipsync_available: Option<bool>,
    /// Current lifecycle state.
    phase: JobPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_artifact: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Job {
    /// Create a job from a request and a resolved identifier.
    pub fn new(id: impl Into<String>, request: &JobRequest) -> Self {
        Self {
            id: id.into(),
            started_at: chrono::Local::now().to_rfc3339(),
            presentation: request.presentation.clone(),
            face_image: request.face_image.clone(),
            voice: request.voice.clone(),
            slides: Vec::new(),
            lipsync_available: None,
            phase: JobPhase::Idle,
            final_artifact: None,
            error: None,
        }
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Advance the lifecycle state. Returns false for an illegal move.
    pub fn advance(&mut self, next: JobPhase) -> bool {
        if !self.phase.can_transition_to(next) {
            return false;
        }
        self.phase = next;
        true
    }

    /// Mark the job completed with its final artifact (only once).
    pub fn complete(&mut self, artifact: PathBuf) -> bool {
        if self.final_artifact.is_some() || !self.advance(JobPhase::Completed) {
            return false;
        }
        self.final_artifact = Some(artifact);
        true
    }

    /// Mark the job failed with an error detail (only once).
    pub fn fail(&mut self, detail: impl Into<String>) -> bool {
        if self.error.is_some() || !self.advance(JobPhase::Failed) {
            return false;
        }
        self.error = Some(detail.into());
        true
    }

    pub fn final_artifact(&self) -> Option<&Path> {
        self.final_artifact.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of slides.
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }
}
