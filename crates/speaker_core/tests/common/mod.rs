//! Mock capabilities and fixtures shared by the scenario tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};
use parking_lot::{Condvar, Mutex};

use speaker_core::capabilities::{
    Capabilities, LipSync, ManifestExtractor, SpeechEngine, SpeechHandle, VideoEncoder, Voice,
};
use speaker_core::config::Settings;
use speaker_core::progress::ProgressRecord;
use speaker_core::runner::{ToolError, ToolResult};
use speaker_core::SpeakerService;

/// Size of every artifact the mocks write; above all default minimums.
pub const MOCK_ARTIFACT_BYTES: usize = 4096;

pub fn write_artifact(path: &Path) -> ToolResult<()> {
    fs::write(path, vec![7u8; MOCK_ARTIFACT_BYTES])
        .map_err(|e| ToolError::io(format!("writing {}", path.display()), e))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A blocking point a mock waits on until the test opens it.
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    changed: Condvar,
    entered: AtomicBool,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn pass(&self) {
        self.entered.store(true, Ordering::SeqCst);
        let mut open = self.open.lock();
        while !*open {
            self.changed.wait(&mut open);
        }
    }

    pub fn entered(&self) -> bool {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn open(&self) {
        *self.open.lock() = true;
        self.changed.notify_all();
    }
}

#[derive(Default)]
pub struct MockSpeech {
    /// Narration texts that always fail to synthesize.
    pub failing: HashSet<String>,
    /// Text whose synthesis blocks on `gate`.
    pub blocking: Option<(String, Arc<Gate>)>,
    pub spoken: Mutex<Vec<String>>,
    pub resets: AtomicUsize,
}

impl MockSpeech {
    pub fn calls_for(&self, text: &str) -> usize {
        self.spoken.lock().iter().filter(|t| *t == text).count()
    }

    pub fn total_calls(&self) -> usize {
        self.spoken.lock().len()
    }
}

/// Forwards to a shared mock so the test keeps a handle on the counters.
pub struct SharedSpeech(pub Arc<MockSpeech>);

impl SpeechEngine for SharedSpeech {
    fn is_available(&self) -> bool {
        true
    }

    fn voices(&self) -> ToolResult<Vec<Voice>> {
        Ok(vec![Voice {
            id: "en".to_string(),
            name: "English".to_string(),
        }])
    }

    fn speak(&self, text: &str, _voice: Option<&str>, output: &Path, _timeout: Duration) -> ToolResult<()> {
        self.0.spoken.lock().push(text.to_string());
        if let Some((blocking, gate)) = &self.0.blocking {
            if blocking == text {
                gate.pass();
            }
        }
        if self.0.failing.contains(text) {
            return Err(ToolError::non_zero_exit("mock-tts", Some(1), "engine busy"));
        }
        write_artifact(output)
    }

    fn reset(&self) -> ToolResult<()> {
        self.0.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockLipSync {
    pub available: bool,
    /// Output file names (`slide_NNN.mp4`) whose animation always fails.
    pub failing: HashSet<String>,
    /// Output file name whose animation blocks on the gate.
    pub blocking: Option<(String, Arc<Gate>)>,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    /// Highest number of overlapping `animate` calls seen.
    pub max_in_flight: AtomicUsize,
}

impl MockLipSync {
    pub fn available() -> Self {
        Self {
            available: true,
            failing: HashSet::new(),
            blocking: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::available()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::available()
        }
    }
}

impl LipSync for MockLipSync {
    fn is_available(&self) -> bool {
        self.available
    }

    fn animate(&self, _face: &Path, _audio: &Path, output: &Path, _timeout: Duration) -> ToolResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(ToolError::unavailable("mock lip-sync"));
        }
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let name = file_name(output);
        if let Some((blocking, gate)) = &self.blocking {
            if *blocking == name {
                gate.pass();
            }
        }
        let result = if self.failing.contains(&name) {
            Err(ToolError::non_zero_exit("mock-wav2lip", Some(1), "Face not detected"))
        } else {
            write_artifact(output)
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[derive(Default)]
pub struct MockEncoder {
    /// Segment file names whose composition always fails.
    pub failing_segments: HashSet<String>,
    /// Stderr of a concat that always fails.
    pub concat_error: Option<String>,
    pub compose_calls: AtomicUsize,
    pub still_calls: AtomicUsize,
    /// File names passed to the last concat, in order.
    pub concatenated: Mutex<Vec<String>>,
}

impl VideoEncoder for MockEncoder {
    fn compose(
        &self,
        _image: &Path,
        _clip: &Path,
        output: &Path,
        _max_duration: Duration,
        _timeout: Duration,
    ) -> ToolResult<()> {
        self.compose_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_segments.contains(&file_name(output)) {
            return Err(ToolError::non_zero_exit("mock-ffmpeg", Some(1), "Unknown encoder"));
        }
        write_artifact(output)
    }

    fn concat(&self, segments: &[PathBuf], output: &Path, _timeout: Duration) -> ToolResult<()> {
        if let Some(stderr) = &self.concat_error {
            return Err(ToolError::non_zero_exit("mock-ffmpeg", Some(1), stderr.clone()));
        }
        let mut joined = Vec::new();
        for segment in segments {
            let bytes = fs::read(segment)
                .map_err(|e| ToolError::io(format!("reading {}", segment.display()), e))?;
            joined.extend(bytes);
        }
        *self.concatenated.lock() = segments.iter().map(|s| file_name(s)).collect();
        fs::write(output, joined).map_err(|e| ToolError::io("writing output", e))
    }

    fn still_clip(
        &self,
        _face: &Path,
        _audio: &Path,
        output: &Path,
        _duration_secs: f64,
        _timeout: Duration,
    ) -> ToolResult<()> {
        self.still_calls.fetch_add(1, Ordering::SeqCst);
        write_artifact(output)
    }

    fn probe_duration(&self, _media: &Path, _timeout: Duration) -> ToolResult<f64> {
        Ok(2.0)
    }
}

/// Mocks plus the capability set built from them.
pub struct Mocks {
    pub speech: Arc<MockSpeech>,
    pub lipsync: Arc<MockLipSync>,
    pub encoder: Arc<MockEncoder>,
}

impl Mocks {
    pub fn new(speech: MockSpeech, lipsync: MockLipSync, encoder: MockEncoder) -> Self {
        Self {
            speech: Arc::new(speech),
            lipsync: Arc::new(lipsync),
            encoder: Arc::new(encoder),
        }
    }

    pub fn standard() -> Self {
        Self::new(MockSpeech::default(), MockLipSync::available(), MockEncoder::default())
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            extractor: Arc::new(ManifestExtractor::new()),
            speech: SpeechHandle::new(Box::new(SharedSpeech(Arc::clone(&self.speech)))),
            lipsync: self.lipsync.clone(),
            encoder: self.encoder.clone(),
        }
    }

    pub fn service(&self, settings: Settings) -> SpeakerService {
        SpeakerService::with_capabilities(settings, self.capabilities())
    }
}

/// Settings rooted in `base`, with no retry delays.
pub fn settings_in(base: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.paths.work_root = base.join("work").to_string_lossy().into_owned();
    settings.paths.output_folder = base.join("out").to_string_lossy().into_owned();
    settings.paths.logs_folder = base.join("logs").to_string_lossy().into_owned();
    settings.paths.previews_folder = base.join("previews").to_string_lossy().into_owned();
    settings.animation.retry_delay_ms = 0;
    settings.speech.reset_delay_ms = 0;
    settings.validation.min_image_bytes = 1;
    settings
}

/// Presentation inputs on disk.
pub struct Deck {
    pub manifest: PathBuf,
    pub face: PathBuf,
}

/// Write a manifest with one slide per narration text, plus the images.
pub fn write_deck(dir: &Path, texts: &[&str]) -> Deck {
    fs::create_dir_all(dir.join("slides")).unwrap();
    let mut slides = Vec::new();
    for (i, text) in texts.iter().enumerate() {
        let image = format!("slides/slide{}.png", i + 1);
        write_png(&dir.join(&image), i as u8);
        slides.push(serde_json::json!({ "text": text, "image": image }));
    }
    let manifest = dir.join("deck.json");
    fs::write(
        &manifest,
        serde_json::to_string_pretty(&serde_json::json!({ "slides": slides })).unwrap(),
    )
    .unwrap();

    let face = dir.join("face.png");
    write_png(&face, 200);
    Deck { manifest, face }
}

pub fn write_png(path: &Path, seed: u8) {
    RgbImage::from_fn(32, 24, |x, y| Rgb([x as u8 * 8, y as u8 * 10, seed]))
        .save(path)
        .unwrap();
}

/// Poll until `done` holds for the status, or panic after `timeout`.
pub fn wait_for<F>(service: &SpeakerService, timeout: Duration, done: F) -> Arc<ProgressRecord>
where
    F: Fn(&ProgressRecord) -> bool,
{
    let started = Instant::now();
    loop {
        let status = service.status();
        if done(&status) {
            return status;
        }
        assert!(
            started.elapsed() < timeout,
            "timed out waiting; last status: {:?}",
            status
        );
        std::thread::sleep(Duration::from_millis(5));
    }
}
