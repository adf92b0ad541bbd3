//! Start, reset and cleanup behaviour of the control surface.

mod common;

use std::collections::HashSet;
use std::fs;
use std::sync::atomic::Ordering;
use std::time::Duration;

use speaker_core::service::{CleanupError, PreviewError, ResultError, StartRejected, PREVIEW_TEXT};
use speaker_core::{JobPhase, JobRequest};
use tempfile::tempdir;

use common::{settings_in, wait_for, write_deck, Gate, MockEncoder, MockLipSync, MockSpeech, Mocks};

const WAIT: Duration = Duration::from_secs(30);

#[test]
fn reset_during_animation_returns_to_idle() {
    let dir = tempdir().unwrap();
    let deck = write_deck(dir.path(), &["One", "Two", "Three", "Four"]);
    let gate = Gate::new();
    let mocks = Mocks::new(
        MockSpeech::default(),
        MockLipSync {
            blocking: Some(("slide_003.mp4".to_string(), gate.clone())),
            ..MockLipSync::available()
        },
        MockEncoder::default(),
    );
    let service = mocks.service(settings_in(dir.path()));

    service
        .start_job(JobRequest::new(&deck.manifest, &deck.face).with_job_id("abandoned"))
        .unwrap();
    let status = wait_for(&service, WAIT, |status| {
        status.state == JobPhase::AnimatingFaces && gate.entered()
    });
    assert!(status.progress >= 55, "progress {}", status.progress);

    service.reset();

    let status = service.status();
    assert_eq!(status.state, JobPhase::Idle);
    assert_eq!(status.progress, 0);
    assert!(status.error.is_none());
    assert!(status.job_id.is_none());

    // The abandoned worker must not publish anything once released.
    gate.open();
    let abandoned = service.wait().unwrap();
    assert!(abandoned.cancelled);
    let status = service.status();
    assert_eq!(status.state, JobPhase::Idle);
    assert_eq!(status.progress, 0);

    // A new job starts cleanly.
    let ticket = service
        .start_job(JobRequest::new(&deck.manifest, &deck.face))
        .unwrap();
    assert!(service.wait().unwrap().success);
    let status = service.status();
    assert_eq!(status.state, JobPhase::Completed);
    assert_eq!(status.job_id.as_deref(), Some(ticket.job_id.as_str()));
}

#[test]
fn reset_job_blocks_new_work_until_its_tool_returns() {
    let dir = tempdir().unwrap();
    let deck = write_deck(dir.path(), &["One", "Two"]);
    let gate = Gate::new();
    let mocks = Mocks::new(
        MockSpeech::default(),
        MockLipSync {
            blocking: Some(("slide_001.mp4".to_string(), gate.clone())),
            ..MockLipSync::available()
        },
        MockEncoder::default(),
    );
    let service = mocks.service(settings_in(dir.path()));

    service
        .start_job(JobRequest::new(&deck.manifest, &deck.face).with_job_id("shared"))
        .unwrap();
    wait_for(&service, WAIT, |_| gate.entered());

    service.reset();
    assert_eq!(service.status().state, JobPhase::Idle);
    assert!(service.is_busy());

    match service.start_job(JobRequest::new(&deck.manifest, &deck.face).with_job_id("shared")) {
        Err(StartRejected::Stopping(id)) => assert_eq!(id, "shared"),
        other => panic!("expected Stopping, got {:?}", other),
    }
    assert!(matches!(service.cleanup(), Err(CleanupError::Busy(_))));

    gate.open();
    assert!(service.wait().unwrap().cancelled);
    assert!(!service.is_busy());

    service
        .start_job(JobRequest::new(&deck.manifest, &deck.face).with_job_id("shared"))
        .unwrap();
    assert!(service.wait().unwrap().success);
    assert_eq!(
        mocks.lipsync.max_in_flight.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[test]
fn second_job_is_rejected_while_one_runs() {
    let dir = tempdir().unwrap();
    let deck = write_deck(dir.path(), &["Blocked narration", "Next"]);
    let gate = Gate::new();
    let mocks = Mocks::new(
        MockSpeech {
            blocking: Some(("Blocked narration".to_string(), gate.clone())),
            ..Default::default()
        },
        MockLipSync::available(),
        MockEncoder::default(),
    );
    let service = mocks.service(settings_in(dir.path()));

    let first = service
        .start_job(JobRequest::new(&deck.manifest, &deck.face).with_job_id("first"))
        .unwrap();
    assert_eq!(first.job_id, "first");
    wait_for(&service, WAIT, |_| gate.entered());

    assert!(service.is_busy());
    match service.start_job(JobRequest::new(&deck.manifest, &deck.face)) {
        Err(StartRejected::Busy(id)) => assert_eq!(id, "first"),
        other => panic!("expected Busy, got {:?}", other),
    }
    assert!(matches!(service.cleanup(), Err(CleanupError::Busy(_))));
    assert!(matches!(
        service.result(),
        Err(ResultError::NotReady(JobPhase::GeneratingAudio))
    ));

    gate.open();
    assert!(service.wait().unwrap().success);
    assert!(!service.is_busy());

    // Finished jobs no longer block new ones.
    let second = service
        .start_job(JobRequest::new(&deck.manifest, &deck.face))
        .unwrap();
    assert_ne!(second.job_id, "first");
    assert!(service.wait().unwrap().success);
}

#[test]
fn cleanup_removes_finished_job_and_resets() {
    let dir = tempdir().unwrap();
    let deck = write_deck(dir.path(), &["Only slide"]);
    let mocks = Mocks::standard();
    let service = mocks.service(settings_in(dir.path()));

    service
        .start_job(JobRequest::new(&deck.manifest, &deck.face).with_job_id("done"))
        .unwrap();
    assert!(service.wait().unwrap().success);
    let artifact = service.result().unwrap();
    drop(artifact.file);

    let report = service.cleanup().unwrap();
    assert_eq!(report.entries_removed, 2);
    assert!(!artifact.path.exists());
    assert!(!dir.path().join("work").join("done").exists());
    assert_eq!(service.status().state, JobPhase::Idle);
    assert!(service.result().unwrap_err().is_not_ready());
}

#[test]
fn voice_preview_speaks_the_sample_sentence() {
    let dir = tempdir().unwrap();
    let mocks = Mocks::standard();
    let service = mocks.service(settings_in(dir.path()));

    let preview = service.preview_voice("English").unwrap();
    assert!(preview.voice_found);
    assert_eq!(preview.path, dir.path().join("previews").join("preview_English.wav"));
    assert!(fs::metadata(&preview.path).unwrap().len() > 0);
    assert_eq!(mocks.speech.calls_for(PREVIEW_TEXT), 1);
    // The lease resets the engine on release.
    assert_eq!(mocks.speech.resets.load(Ordering::SeqCst), 1);

    let fallback = service.preview_voice("Klingon").unwrap();
    assert!(!fallback.voice_found);
    assert!(fallback.path.ends_with("preview_Klingon.wav"));
    assert!(fallback.path.exists());
}

#[test]
fn failed_voice_preview_leaves_no_file() {
    let dir = tempdir().unwrap();
    let mocks = Mocks::new(
        MockSpeech {
            failing: HashSet::from([PREVIEW_TEXT.to_string()]),
            ..Default::default()
        },
        MockLipSync::available(),
        MockEncoder::default(),
    );
    let service = mocks.service(settings_in(dir.path()));

    let err = service.preview_voice("English").unwrap_err();
    assert!(matches!(err, PreviewError::Synthesis(_)));
    assert!(err.to_string().starts_with("Voice preview generation failed"));
    assert!(!dir.path().join("previews").join("preview_English.wav").exists());
    assert!(matches!(service.preview_voice(""), Err(PreviewError::NoVoice)));
}
