//! Process-wide progress tracker.
//!
//! Single writer, many readers. The current [`ProgressRecord`] lives
//! behind an `Arc` that is swapped wholesale on every update, so a
//! reader only holds the lock long enough to clone the pointer.
//!
//! Every job gets a [`ProgressWriter`] tagged with a generation number.
//! Starting another job or resetting bumps the generation, after which
//! writes from the old writer are dropped.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use super::ranges::phase_range;
use super::record::ProgressRecord;
use crate::models::JobPhase;

struct Published {
    generation: u64,
    record: Arc<ProgressRecord>,
}

/// Shared handle to the status record.
#[derive(Clone)]
pub struct ProgressTracker {
    shared: Arc<RwLock<Published>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(RwLock::new(Published {
                generation: 0,
                record: Arc::new(ProgressRecord::idle()),
            })),
        }
    }

    /// Current snapshot. Never blocks on pipeline work.
    pub fn snapshot(&self) -> Arc<ProgressRecord> {
        Arc::clone(&self.shared.read().record)
    }

    /// Start tracking a new job, superseding whatever was tracked before.
    pub fn begin(&self, job_id: &str) -> ProgressWriter {
        let mut published = self.shared.write();
        published.generation += 1;
        published.record = Arc::new(ProgressRecord::started(job_id));
        tracing::debug!("Progress tracking started for job {}", job_id);

        ProgressWriter {
            tracker: self.clone(),
            generation: published.generation,
        }
    }

    /// Discard the current record and return to `Idle`.
    ///
    /// Any outstanding writer stops having an effect.
    pub fn reset(&self) {
        let mut published = self.shared.write();
        published.generation += 1;
        published.record = Arc::new(ProgressRecord::idle());
    }

    /// Replace the record if `generation` is still current.
    ///
    /// `update` sees the current record and returns the replacement, or
    /// `None` to leave it untouched.
    fn publish<F>(&self, generation: u64, update: F) -> bool
    where
        F: FnOnce(&ProgressRecord) -> Option<ProgressRecord>,
    {
        let mut published = self.shared.write();
        if published.generation != generation {
            return false;
        }
        match update(&published.record) {
            Some(mut next) => {
                next.updated_at = chrono::Local::now().to_rfc3339();
                published.record = Arc::new(next);
                true
            }
            None => false,
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Write access to the tracker for one job.
///
/// Progress is clamped so it never decreases, and phase changes must
/// be legal forward transitions.
pub struct ProgressWriter {
    tracker: ProgressTracker,
    generation: u64,
}

impl ProgressWriter {
    /// Whether this writer still owns the record.
    pub fn is_current(&self) -> bool {
        self.tracker.shared.read().generation == self.generation
    }

    /// Latest snapshot (as seen by readers).
    pub fn snapshot(&self) -> Arc<ProgressRecord> {
        self.tracker.snapshot()
    }

    /// Move to a new phase, jumping progress to the start of its range.
    pub fn enter_phase(&self, phase: JobPhase, step: impl Into<String>) -> bool {
        let step = step.into();
        let accepted = self.tracker.publish(self.generation, |current| {
            if !current.state.can_transition_to(phase) {
                tracing::warn!(
                    "Ignoring illegal phase transition {} -> {}",
                    current.state,
                    phase
                );
                return None;
            }
            let floor = phase_range(phase).map(|r| r.start).unwrap_or(0);
            Some(ProgressRecord {
                state: phase,
                current_step: step,
                progress: current.progress.max(floor),
                ..current.clone()
            })
        });
        if accepted {
            tracing::info!("Phase: {}", phase);
        }
        accepted
    }

    /// Report absolute progress within the current phase.
    pub fn report(&self, progress: u8, step: impl Into<String>) -> bool {
        let step = step.into();
        self.tracker.publish(self.generation, |current| {
            if current.is_terminal() {
                return None;
            }
            Some(ProgressRecord {
                current_step: step,
                progress: current.progress.max(progress.min(100)),
                ..current.clone()
            })
        })
    }

    /// Report `done` of `total` units finished in the current phase.
    pub fn report_units(&self, done: usize, total: usize, step: impl Into<String>) -> bool {
        let state = self.snapshot().state;
        match phase_range(state) {
            Some(range) => self.report(range.interpolate(done, total), step),
            None => false,
        }
    }

    /// Update only the step description.
    pub fn describe(&self, step: impl Into<String>) -> bool {
        self.report(0, step)
    }

    /// Record a reduced-feature warning.
    pub fn warn(&self, warning: impl Into<String>) -> bool {
        let warning = warning.into();
        self.tracker.publish(self.generation, |current| {
            if current.is_terminal() {
                return None;
            }
            let mut next = current.clone();
            next.warnings.push(warning);
            Some(next)
        })
    }

    /// Terminal success. The artifact is recorded exactly once.
    pub fn complete(&self, artifact: PathBuf) -> bool {
        self.tracker.publish(self.generation, |current| {
            if !current.state.can_transition_to(JobPhase::Completed) || current.artifact.is_some()
            {
                return None;
            }
            Some(ProgressRecord {
                state: JobPhase::Completed,
                current_step: "Processing complete!".to_string(),
                progress: 100,
                error: None,
                artifact: Some(artifact),
                ..current.clone()
            })
        })
    }

    /// Terminal failure. Progress is left where it stopped.
    pub fn fail(&self, detail: impl Into<String>) -> bool {
        let detail = detail.into();
        self.tracker.publish(self.generation, |current| {
            if !current.state.can_transition_to(JobPhase::Failed) || current.error.is_some() {
                return None;
            }
            Some(ProgressRecord {
                state: JobPhase::Failed,
                current_step: format!("Error: {}", detail),
                error: Some(detail),
                artifact: None,
                ..current.clone()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_before_any_job_is_idle() {
        let tracker = ProgressTracker::new();
        let record = tracker.snapshot();
        assert_eq!(record.state, JobPhase::Idle);
        assert_eq!(record.progress, 0);
        assert!(record.error.is_none());
    }

    #[test]
    fn progress_never_decreases() {
        let tracker = ProgressTracker::new();
        let writer = tracker.begin("job-1");
        writer.enter_phase(JobPhase::GeneratingAudio, "audio");
        writer.report(30, "slide 2");
        writer.report(20, "stale");
        assert_eq!(tracker.snapshot().progress, 30);
        assert_eq!(tracker.snapshot().current_step, "stale");
    }

    #[test]
    fn sequence_of_stage_events_is_monotonic() {
        let tracker = ProgressTracker::new();
        let writer = tracker.begin("job-m");
        let mut seen = Vec::new();

        let phases = [
            JobPhase::ExtractingSlides,
            JobPhase::RenderingImages,
            JobPhase::GeneratingAudio,
            JobPhase::AnimatingFaces,
            JobPhase::ComposingVideo,
            JobPhase::Concatenating,
        ];
        for phase in phases {
            writer.enter_phase(phase, phase.as_str());
            seen.push(tracker.snapshot().progress);
            for done in [3usize, 1, 4, 0, 7, 7] {
                writer.report_units(done, 7, "unit");
                seen.push(tracker.snapshot().progress);
            }
            // illegal backwards move must not disturb progress
            writer.enter_phase(JobPhase::ExtractingSlides, "back");
            seen.push(tracker.snapshot().progress);
        }
        writer.complete(PathBuf::from("final.mp4"));
        seen.push(tracker.snapshot().progress);

        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{:?}", seen);
        assert_eq!(*seen.last().unwrap(), 100);
    }

    #[test]
    fn illegal_transition_is_ignored() {
        let tracker = ProgressTracker::new();
        let writer = tracker.begin("job-2");
        assert!(writer.enter_phase(JobPhase::AnimatingFaces, "animating"));
        assert!(!writer.enter_phase(JobPhase::GeneratingAudio, "audio again"));
        assert_eq!(tracker.snapshot().state, JobPhase::AnimatingFaces);
    }

    #[test]
    fn failure_keeps_progress_and_sets_error_once() {
        let tracker = ProgressTracker::new();
        let writer = tracker.begin("job-3");
        writer.enter_phase(JobPhase::ComposingVideo, "compose");
        writer.report(80, "slide 1");
        assert!(writer.fail("Compose failed: boom"));
        assert!(!writer.fail("second"));
        assert!(!writer.complete(PathBuf::from("x.mp4")));

        let record = tracker.snapshot();
        assert_eq!(record.state, JobPhase::Failed);
        assert_eq!(record.progress, 80);
        assert_eq!(record.error.as_deref(), Some("Compose failed: boom"));
        assert!(record.current_step.starts_with("Error: "));
    }

    #[test]
    fn reset_detaches_running_writer() {
        let tracker = ProgressTracker::new();
        let writer = tracker.begin("job-4");
        writer.enter_phase(JobPhase::AnimatingFaces, "animating");
        writer.report(55, "slide 3");

        tracker.reset();
        assert!(!writer.is_current());
        assert!(!writer.report(60, "late"));
        assert!(!writer.fail("late failure"));

        let record = tracker.snapshot();
        assert_eq!(record.state, JobPhase::Idle);
        assert_eq!(record.progress, 0);
        assert!(record.error.is_none());
    }

    #[test]
    fn new_job_supersedes_old_writer() {
        let tracker = ProgressTracker::new();
        let old = tracker.begin("old");
        old.enter_phase(JobPhase::ComposingVideo, "compose");
        let new = tracker.begin("new");

        assert!(!old.report(90, "old progress"));
        assert!(new.enter_phase(JobPhase::ExtractingSlides, "extract"));
        let record = tracker.snapshot();
        assert_eq!(record.job_id.as_deref(), Some("new"));
        assert_eq!(record.progress, 0);
    }

    #[test]
    fn readers_see_whole_snapshots_across_threads() {
        let tracker = ProgressTracker::new();
        let writer = tracker.begin("job-t");
        writer.enter_phase(JobPhase::GeneratingAudio, "audio");

        let reader = tracker.clone();
        let handle = std::thread::spawn(move || {
            let mut last = 0;
            for _ in 0..500 {
                let record = reader.snapshot();
                assert!(record.progress >= last);
                // step text and progress are published together
                if record.current_step.starts_with("p") {
                    let n: u8 = record.current_step[1..].parse().unwrap();
                    assert_eq!(n, record.progress);
                }
                last = record.progress;
            }
        });

        for p in 15..=40u8 {
            writer.report(p, format!("p{}", p));
        }
        handle.join().unwrap();
    }
}
