//! Retry, timeout and validation policy for one unit of stage work.
//!
//! A unit of work is one capability call producing one file (audio for
//! a slide, a clip, a composed segment). The runner tries it up to the
//! policy's attempt budget, validates every artifact, and resets the
//! capability between attempts. Expected failures never escape as
//! errors; the caller gets a [`StageFailure`] to decide on a fallback.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::errors::{file_label, ToolError, ToolResult};

/// Invalid policy arguments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("attempt timeout must be greater than zero")]
    ZeroTimeout,
}

/// Attempt budget and limits for a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePolicy {
    max_attempts: u32,
    attempt_timeout: Duration,
    min_artifact_bytes: u64,
    retry_delay: Duration,
}

impl StagePolicy {
    pub fn new(max_attempts: u32, attempt_timeout: Duration) -> Result<Self, PolicyError> {
        if max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        if attempt_timeout.is_zero() {
            return Err(PolicyError::ZeroTimeout);
        }
        Ok(Self {
            max_attempts,
            attempt_timeout,
            min_artifact_bytes: 1,
            retry_delay: Duration::ZERO,
        })
    }

    /// Minimum size for an artifact to count as valid (at least 1 byte).
    pub fn with_min_bytes(mut self, bytes: u64) -> Self {
        self.min_artifact_bytes = bytes.max(1);
        self
    }

    /// Pause between a failed attempt and the next one.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    pub fn min_artifact_bytes(&self) -> u64 {
        self.min_artifact_bytes
    }
}

/// What an operation is told about the attempt it is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptContext {
    /// 1-based attempt number.
    pub attempt: u32,
    pub max_attempts: u32,
    /// Budget for this attempt; tool invocations must honour it.
    pub timeout: Duration,
}

impl AttemptContext {
    pub fn is_last(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure,
    Timeout,
}

/// Record of one attempt. Only lives as long as the run result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageAttempt {
    pub number: u32,
    pub outcome: AttemptOutcome,
    pub artifact_bytes: Option<u64>,
}

/// A validated artifact.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub bytes: u64,
    pub attempts: Vec<StageAttempt>,
}

/// All attempts failed.
#[derive(Debug)]
pub struct StageFailure {
    pub attempts: Vec<StageAttempt>,
    pub last_error: ToolError,
}

impl StageFailure {
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} after {} attempt(s)",
            self.last_error,
            self.attempts.len()
        )
    }
}

/// Check that `path` exists and holds at least `min_bytes`. Returns the size.
pub fn validate_min_size(path: &Path, min_bytes: u64) -> ToolResult<u64> {
    let metadata = fs::metadata(path)
        .map_err(|_| ToolError::invalid_output(path, "file was not created"))?;
    if !metadata.is_file() {
        return Err(ToolError::invalid_output(path, "not a regular file"));
    }
    let bytes = metadata.len();
    if bytes < min_bytes {
        return Err(ToolError::invalid_output(
            path,
            format!("{} bytes, expected at least {}", bytes, min_bytes),
        ));
    }
    Ok(bytes)
}

/// Runs one unit of work under a [`StagePolicy`].
pub struct StageRunner {
    label: String,
    policy: StagePolicy,
}

impl StageRunner {
    pub fn new(label: impl Into<String>, policy: StagePolicy) -> Self {
        Self {
            label: label.into(),
            policy,
        }
    }

    pub fn policy(&self) -> &StagePolicy {
        &self.policy
    }

    /// Run `operation` with the policy's minimum-size validation.
    pub fn run<Op, Reset>(&self, operation: Op, reset: Reset) -> Result<Artifact, StageFailure>
    where
        Op: FnMut(&AttemptContext) -> ToolResult<PathBuf>,
        Reset: FnMut(&AttemptContext),
    {
        let min_bytes = self.policy.min_artifact_bytes;
        self.run_validated(operation, |path| validate_min_size(path, min_bytes), reset)
    }

    /// Run `operation` until it yields an artifact accepted by `validate`.
    ///
    /// `reset` is called after every failed attempt that will be retried,
    /// so state left behind by attempt n cannot leak into attempt n+1.
    /// An `Unavailable` error ends the run immediately.
    pub fn run_validated<Op, Validate, Reset>(
        &self,
        mut operation: Op,
        validate: Validate,
        mut reset: Reset,
    ) -> Result<Artifact, StageFailure>
    where
        Op: FnMut(&AttemptContext) -> ToolResult<PathBuf>,
        Validate: Fn(&Path) -> ToolResult<u64>,
        Reset: FnMut(&AttemptContext),
    {
        let mut attempts = Vec::with_capacity(self.policy.max_attempts as usize);

        for number in 1..=self.policy.max_attempts {
            let ctx = AttemptContext {
                attempt: number,
                max_attempts: self.policy.max_attempts,
                timeout: self.policy.attempt_timeout,
            };

            let started = Instant::now();
            let result = operation(&ctx).and_then(|path| {
                if started.elapsed() > ctx.timeout {
                    discard(&path);
                    return Err(ToolError::timeout(&self.label, ctx.timeout));
                }
                match validate(&path) {
                    Ok(bytes) => Ok((path, bytes)),
                    Err(e) => {
                        discard(&path);
                        Err(e)
                    }
                }
            });

            match result {
                Ok((path, bytes)) => {
                    attempts.push(StageAttempt {
                        number,
                        outcome: AttemptOutcome::Success,
                        artifact_bytes: Some(bytes),
                    });
                    tracing::debug!(
                        "{}: attempt {}/{} produced {} ({} bytes)",
                        self.label,
                        number,
                        ctx.max_attempts,
                        file_label(&path),
                        bytes
                    );
                    return Ok(Artifact {
                        path,
                        bytes,
                        attempts,
                    });
                }
                Err(err) => {
                    let outcome = if err.is_timeout() {
                        AttemptOutcome::Timeout
                    } else {
                        AttemptOutcome::Failure
                    };
                    attempts.push(StageAttempt {
                        number,
                        outcome,
                        artifact_bytes: None,
                    });
                    tracing::warn!(
                        "{}: attempt {}/{} failed: {}",
                        self.label,
                        number,
                        ctx.max_attempts,
                        err
                    );

                    if !err.is_retryable() || ctx.is_last() {
                        return Err(StageFailure {
                            attempts,
                            last_error: err,
                        });
                    }

                    reset(&ctx);
                    if !self.policy.retry_delay.is_zero() {
                        thread::sleep(self.policy.retry_delay);
                    }
                }
            }
        }

        unreachable!("attempt loop always returns on its last iteration")
    }
}

/// Remove a rejected artifact so it can never be mistaken for a good one.
fn discard(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!("Failed to discard {}: {}", file_label(path), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::tempdir;

    fn policy(attempts: u32) -> StagePolicy {
        StagePolicy::new(attempts, Duration::from_secs(5))
            .unwrap()
            .with_min_bytes(4)
    }

    #[test]
    fn rejects_invalid_policy() {
        assert_eq!(
            StagePolicy::new(0, Duration::from_secs(1)),
            Err(PolicyError::ZeroAttempts)
        );
        assert_eq!(
            StagePolicy::new(2, Duration::ZERO),
            Err(PolicyError::ZeroTimeout)
        );
    }

    #[test]
    fn first_valid_artifact_wins() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("a.wav");
        let calls = Cell::new(0);

        let runner = StageRunner::new("speech", policy(3));
        let artifact = runner
            .run(
                |_| {
                    calls.set(calls.get() + 1);
                    fs::write(&out, b"RIFFdata").unwrap();
                    Ok(out.clone())
                },
                |_| panic!("no reset after success"),
            )
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(artifact.bytes, 8);
        assert_eq!(artifact.attempts.len(), 1);
        assert_eq!(artifact.attempts[0].outcome, AttemptOutcome::Success);
    }

    #[test]
    fn undersized_artifact_is_discarded_and_retried() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("clip.mp4");
        let resets = Cell::new(0);

        let runner = StageRunner::new("lipsync", policy(3));
        let artifact = runner
            .run(
                |ctx| {
                    let payload: &[u8] = if ctx.attempt == 1 { b"x" } else { b"full clip" };
                    fs::write(&out, payload).unwrap();
                    Ok(out.clone())
                },
                |_| resets.set(resets.get() + 1),
            )
            .unwrap();

        assert_eq!(resets.get(), 1);
        assert_eq!(artifact.attempts.len(), 2);
        assert_eq!(artifact.attempts[0].outcome, AttemptOutcome::Failure);
        assert_eq!(artifact.bytes, 9);
    }

    #[test]
    fn exhaustion_returns_failure_with_last_error() {
        let resets = Cell::new(0);
        let runner = StageRunner::new("speech", policy(3));
        let failure = runner
            .run(
                |ctx| {
                    if ctx.attempt == 3 {
                        Err(ToolError::timeout("espeak-ng", ctx.timeout))
                    } else {
                        Err(ToolError::non_zero_exit("espeak-ng", Some(1), "busy"))
                    }
                },
                |_| resets.set(resets.get() + 1),
            )
            .unwrap_err();

        assert_eq!(failure.attempt_count(), 3);
        assert_eq!(resets.get(), 2);
        assert!(failure.last_error.is_timeout());
        assert_eq!(failure.attempts[2].outcome, AttemptOutcome::Timeout);
        assert!(failure.to_string().contains("after 3 attempt(s)"));
    }

    #[test]
    fn unavailable_stops_immediately() {
        let calls = Cell::new(0);
        let runner = StageRunner::new("lipsync", policy(5));
        let failure = runner
            .run(
                |_| {
                    calls.set(calls.get() + 1);
                    Err(ToolError::unavailable("Wav2Lip"))
                },
                |_| {},
            )
            .unwrap_err();
        assert_eq!(calls.get(), 1);
        assert_eq!(failure.attempt_count(), 1);
    }

    #[test]
    fn overrunning_attempt_counts_as_timeout() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("slow.wav");
        let policy = StagePolicy::new(1, Duration::from_millis(20)).unwrap();
        let runner = StageRunner::new("speech", policy);

        let failure = runner
            .run(
                |_| {
                    thread::sleep(Duration::from_millis(60));
                    fs::write(&out, b"late audio").unwrap();
                    Ok(out.clone())
                },
                |_| {},
            )
            .unwrap_err();

        assert!(failure.last_error.is_timeout());
        assert!(!out.exists());
    }

    #[test]
    fn validate_min_size_reports_missing_file() {
        let dir = tempdir().unwrap();
        let err = validate_min_size(&dir.path().join("nope.wav"), 1).unwrap_err();
        assert!(err.to_string().contains("not created"));
    }
}
