//! The snapshot exposed to polling clients.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::JobPhase;

/// Immutable status snapshot.
///
/// A new record replaces the previous one on every update; readers
/// never observe a record being modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Job the record belongs to (None while idle).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Lifecycle state.
    pub state: JobPhase,
    /// Human-readable description of the current step.
    pub current_step: String,
    /// Overall progress 0-100.
    pub progress: u8,
    /// Error detail (only in `Failed`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Reduced-feature warnings collected during the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Final artifact (only in `Completed`); not exposed to pollers.
    #[serde(skip)]
    pub artifact: Option<PathBuf>,
    /// When this snapshot was published.
    pub updated_at: String,
}

impl ProgressRecord {
    /// The record reported before any job starts (or after a reset).
    pub fn idle() -> Self {
        Self {
            job_id: None,
            state: JobPhase::Idle,
            current_step: String::new(),
            progress: 0,
            error: None,
            warnings: Vec::new(),
            artifact: None,
            updated_at: chrono::Local::now().to_rfc3339(),
        }
    }

    /// Fresh record for a newly started job.
    pub fn started(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            current_step: "Starting processing...".to_string(),
            ..Self::idle()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_record_has_no_job() {
        let record = ProgressRecord::idle();
        assert_eq!(record.state, JobPhase::Idle);
        assert_eq!(record.progress, 0);
        assert!(record.error.is_none());
        assert!(!record.is_active());
    }

    #[test]
    fn serialization_hides_artifact_path() {
        let mut record = ProgressRecord::started("job-9");
        record.artifact = Some(PathBuf::from("/srv/work/job-9/output/final.mp4"));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"job_id\":\"job-9\""));
        assert!(!json.contains("/srv/work"));
    }
}
