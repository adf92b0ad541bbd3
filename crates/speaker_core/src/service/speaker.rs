//! Job control: start, status, result, reset, cleanup.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use super::errors::{CleanupError, PreviewError, ResultError, StartRejected};
use crate::capabilities::{Capabilities, Voice};
use crate::config::Settings;
use crate::models::{JobPhase, JobRequest};
use crate::orchestrator::{
    create_standard_pipeline, CancelHandle, JobProcessor, JobResult, SharedLineCallback,
};
use crate::progress::{ProgressRecord, ProgressTracker};
use crate::runner::{validate_min_size, ToolResult};

/// Sentence spoken by voice previews.
pub const PREVIEW_TEXT: &str = "This is a voice preview.";

/// Identifies an accepted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTicket {
    pub job_id: String,
}

/// The finished video, opened for reading.
#[derive(Debug)]
pub struct JobArtifact {
    pub path: PathBuf,
    pub file: File,
}

/// A synthesized sample of one voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePreview {
    pub path: PathBuf,
    pub voice: String,
    /// False when the engine did not list the voice and used its default.
    pub voice_found: bool,
}

/// What `cleanup` removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub entries_removed: usize,
}

struct ActiveJob {
    job_id: String,
    cancel: CancelHandle,
    handle: Option<JoinHandle<JobResult>>,
}

impl ActiveJob {
    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// Runs jobs and publishes their progress.
///
/// Status reads never wait on pipeline work. Only one worker runs at a
/// time: after `reset` the status is `Idle` at once, but a new job is
/// refused until the abandoned worker has returned from its current
/// tool call and released the capabilities.
pub struct SpeakerService {
    settings: Settings,
    capabilities: Capabilities,
    tracker: ProgressTracker,
    active: Mutex<Option<ActiveJob>>,
    line_callback: Option<SharedLineCallback>,
}

impl SpeakerService {
    /// Service backed by the command-line capabilities.
    pub fn new(settings: Settings) -> Self {
        let capabilities = Capabilities::from_settings(&settings);
        Self::with_capabilities(settings, capabilities)
    }

    pub fn with_capabilities(settings: Settings, capabilities: Capabilities) -> Self {
        Self {
            settings,
            capabilities,
            tracker: ProgressTracker::new(),
            active: Mutex::new(None),
            line_callback: None,
        }
    }

    /// Mirror job log lines to `callback`.
    pub fn with_line_callback(mut self, callback: SharedLineCallback) -> Self {
        self.line_callback = Some(callback);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Start a job, or reject it if one is still running.
    pub fn start_job(&self, request: JobRequest) -> Result<JobTicket, StartRejected> {
        let mut active = self.active.lock();
        if let Some(job) = active.as_ref().filter(|job| job.is_running()) {
            if job.cancel.is_cancelled() {
                tracing::warn!("Rejecting new job: reset job '{}' is still stopping", job.job_id);
                return Err(StartRejected::Stopping(job.job_id.clone()));
            }
            tracing::warn!("Rejecting new job: '{}' is still running", job.job_id);
            return Err(StartRejected::Busy(job.job_id.clone()));
        }

        let job_id = request
            .job_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let pipeline = create_standard_pipeline();
        let cancel = pipeline.cancel_handle();
        let writer = self.tracker.begin(&job_id);
        let processor = JobProcessor::new(self.settings.clone(), self.capabilities.clone())
            .with_line_callback(self.line_callback.clone());

        let worker_id = job_id.clone();
        let spawned = thread::Builder::new()
            .name(format!("job-{}", short_id(&job_id)))
            .spawn(move || processor.process(&worker_id, &request, writer, pipeline));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!("Failed to spawn worker for job {}: {}", job_id, e);
                self.tracker.reset();
                return Err(StartRejected::Spawn(e));
            }
        };

        tracing::info!("Started job {}", job_id);
        *active = Some(ActiveJob {
            job_id: job_id.clone(),
            cancel,
            handle: Some(handle),
        });
        Ok(JobTicket { job_id })
    }

    /// Latest status snapshot. Idle before any job starts.
    pub fn status(&self) -> Arc<ProgressRecord> {
        self.tracker.snapshot()
    }

    /// Open the final video. Only available once the job has completed.
    pub fn result(&self) -> Result<JobArtifact, ResultError> {
        let record = self.tracker.snapshot();
        match (&record.state, &record.artifact) {
            (JobPhase::Completed, Some(path)) => {
                let file = File::open(path).map_err(ResultError::Io)?;
                Ok(JobArtifact {
                    path: path.clone(),
                    file,
                })
            }
            (state, _) => Err(ResultError::NotReady(*state)),
        }
    }

    /// Abandon the current job and return to `Idle`.
    ///
    /// The worker stops at its next slide boundary and nothing it
    /// publishes afterwards is visible. Until it has stopped it stays
    /// tracked, so `start_job` and `cleanup` keep refusing.
    pub fn reset(&self) {
        let mut active = self.active.lock();
        let stopped = match active.as_ref() {
            Some(job) => {
                job.cancel.cancel();
                let running = job.is_running();
                if running {
                    tracing::info!("Reset: abandoning job {}", job.job_id);
                }
                !running
            }
            None => false,
        };
        if stopped {
            *active = None;
        }
        drop(active);
        self.tracker.reset();
        if !self.capabilities.speech.try_reset() {
            tracing::debug!("Speech engine busy; it resets when released");
        }
    }

    /// Reset, then delete every job workspace and output.
    pub fn cleanup(&self) -> Result<CleanupReport, CleanupError> {
        if let Some(job) = self.active.lock().as_ref().filter(|job| job.is_running()) {
            return Err(CleanupError::Busy(job.job_id.clone()));
        }
        self.reset();

        let mut report = CleanupReport::default();
        let paths = &self.settings.paths;
        for root in [&paths.work_root, &paths.output_folder, &paths.previews_folder] {
            report.entries_removed += clear_dir(Path::new(root))?;
        }
        tracing::info!("Cleanup removed {} entries", report.entries_removed);
        Ok(report)
    }

    pub fn voices(&self) -> ToolResult<Vec<Voice>> {
        self.capabilities.speech.voices()
    }

    /// Speak [`PREVIEW_TEXT`] with `voice` into the previews folder.
    ///
    /// Waits for the speech engine if a job is between slides. An unknown
    /// voice falls back to the engine default, as jobs do.
    pub fn preview_voice(&self, voice: &str) -> Result<VoicePreview, PreviewError> {
        let voice = voice.trim();
        if voice.is_empty() {
            return Err(PreviewError::NoVoice);
        }

        let dir = Path::new(&self.settings.paths.previews_folder);
        fs::create_dir_all(dir).map_err(|source| PreviewError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(preview_file_name(voice));

        let (requested, voice_found) = match self.capabilities.speech.voices() {
            Ok(voices) if voices.iter().any(|v| v.id == voice || v.name == voice) => {
                (Some(voice), true)
            }
            Ok(voices) if !voices.is_empty() => {
                tracing::warn!("Voice '{}' not found, using default", voice);
                (None, false)
            }
            Ok(_) => (Some(voice), true),
            Err(e) => {
                tracing::debug!("Could not list voices ({}); passing '{}' through", e, voice);
                (Some(voice), true)
            }
        };

        tracing::info!("Generating voice preview for: {}", voice);
        let lease = self.capabilities.speech.lease();
        lease
            .speak(PREVIEW_TEXT, requested, &path, self.settings.speech.timeout())
            .and_then(|()| validate_min_size(&path, 1))
            .map_err(|e| {
                tracing::error!("Voice preview for '{}' failed: {}", voice, e);
                let _ = fs::remove_file(&path);
                PreviewError::Synthesis(e)
            })?;
        drop(lease);

        tracing::info!("Generated voice preview {}", path.display());
        Ok(VoicePreview {
            path,
            voice: voice.to_string(),
            voice_found,
        })
    }

    /// Whether a worker is still running, including one being reset.
    pub fn is_busy(&self) -> bool {
        self.active.lock().as_ref().is_some_and(ActiveJob::is_running)
    }

    /// Block until the current job's worker returns.
    ///
    /// Returns None if there is no job or it was already waited on.
    pub fn wait(&self) -> Option<JobResult> {
        let handle = self.active.lock().as_mut()?.handle.take()?;
        match handle.join() {
            Ok(result) => Some(result),
            Err(_) => {
                tracing::error!("Job worker panicked");
                None
            }
        }
    }
}

/// Remove everything inside `dir`. A missing directory is already clean.
fn clear_dir(dir: &Path) -> Result<usize, CleanupError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(CleanupError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut removed = 0;
    for entry in entries {
        let path = entry
            .map_err(|source| CleanupError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|source| CleanupError::Io {
            path: path.clone(),
            source,
        })?;
        removed += 1;
    }
    Ok(removed)
}

/// `preview_<voice>.wav` with only filename-safe characters kept.
fn preview_file_name(voice: &str) -> String {
    let safe: String = voice
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    format!("preview_{}.wav", safe.trim_end().replace(' ', "_"))
}

fn short_id(job_id: &str) -> &str {
    job_id.get(..8).unwrap_or(job_id)
}
