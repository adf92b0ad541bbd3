//! Speech synthesis capability.

use std::fmt;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use crate::config::SpeechSettings;
use crate::runner::{is_runnable, run_tool, ToolError, ToolResult};

/// A voice offered by the speech engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Identifier passed back to `speak`.
    pub id: String,
    pub name: String,
}

/// Text-to-speech engine.
///
/// Engines may be stateful; `reset` returns one to a clean state and is
/// called between attempts and between slides.
pub trait SpeechEngine: Send + Sync {
    fn is_available(&self) -> bool;

    fn voices(&self) -> ToolResult<Vec<Voice>>;

    /// Write narration for `text` to `output` as WAV.
    fn speak(
        &self,
        text: &str,
        voice: Option<&str>,
        output: &Path,
        timeout: Duration,
    ) -> ToolResult<()>;

    fn reset(&self) -> ToolResult<()>;
}

/// Shared handle to the speech engine.
///
/// The audio step holds a [`SpeechLease`] per slide, which gives it
/// exclusive use of the engine and resets the engine when released.
#[derive(Clone)]
pub struct SpeechHandle {
    engine: Arc<Mutex<Box<dyn SpeechEngine>>>,
}

impl SpeechHandle {
    pub fn new(engine: Box<dyn SpeechEngine>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Acquire the engine, blocking until it is free.
    pub fn lease(&self) -> SpeechLease<'_> {
        SpeechLease {
            guard: self.engine.lock(),
        }
    }

    /// Reset the engine unless a job is holding it. Returns true if reset.
    pub fn try_reset(&self) -> bool {
        match self.engine.try_lock() {
            Some(engine) => match engine.reset() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Speech engine reset failed: {}", e);
                    false
                }
            },
            None => false,
        }
    }

    pub fn voices(&self) -> ToolResult<Vec<Voice>> {
        self.engine.lock().voices()
    }

    pub fn is_available(&self) -> bool {
        self.engine.lock().is_available()
    }
}

impl fmt::Debug for SpeechHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechHandle").finish_non_exhaustive()
    }
}

/// Exclusive use of the engine; resets it on drop, including on error paths.
pub struct SpeechLease<'a> {
    guard: MutexGuard<'a, Box<dyn SpeechEngine>>,
}

impl std::ops::Deref for SpeechLease<'_> {
    type Target = dyn SpeechEngine;

    fn deref(&self) -> &Self::Target {
        &**self.guard
    }
}

impl Drop for SpeechLease<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.guard.reset() {
            tracing::warn!("Speech engine reset on release failed: {}", e);
        }
    }
}

/// Speech engine driven through a command-line synthesizer
/// (`espeak-ng` compatible: `-v`, `-s`, `-w`, `--voices`).
#[derive(Debug, Clone)]
pub struct CommandSpeechEngine {
    program: String,
    default_voice: Option<String>,
    words_per_minute: u32,
    reset_delay: Duration,
}

impl CommandSpeechEngine {
    pub fn new(settings: &SpeechSettings) -> Self {
        let default_voice = Some(settings.default_voice.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Self {
            program: settings.command.clone(),
            default_voice,
            words_per_minute: settings.words_per_minute,
            reset_delay: settings.reset_delay(),
        }
    }
}

impl SpeechEngine for CommandSpeechEngine {
    fn is_available(&self) -> bool {
        is_runnable(&self.program, "--version", Duration::from_secs(5))
    }

    fn voices(&self) -> ToolResult<Vec<Voice>> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--voices");
        let output = run_tool(&self.program, &mut cmd, Duration::from_secs(10))?;
        Ok(parse_voice_table(&output.stdout))
    }

    fn speak(
        &self,
        text: &str,
        voice: Option<&str>,
        output: &Path,
        timeout: Duration,
    ) -> ToolResult<()> {
        let mut cmd = Command::new(&self.program);
        if let Some(voice) = voice.or(self.default_voice.as_deref()) {
            cmd.arg("-v").arg(voice);
        }
        cmd.arg("-s")
            .arg(self.words_per_minute.to_string())
            .arg("-w")
            .arg(output)
            .arg("--")
            .arg(text);

        run_tool(&self.program, &mut cmd, timeout)?;
        if !output.exists() {
            return Err(ToolError::invalid_output(output, "synthesizer wrote no file"));
        }
        Ok(())
    }

    fn reset(&self) -> ToolResult<()> {
        // Each call is a fresh process; only the settle delay remains.
        if !self.reset_delay.is_zero() {
            thread::sleep(self.reset_delay);
        }
        Ok(())
    }
}

/// Parse `espeak-ng --voices` output.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
/// ```
fn parse_voice_table(stdout: &str) -> Vec<Voice> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [_, language, _, name, ..] => Some(Voice {
                    id: language.to_string(),
                    name: name.replace('_', " "),
                }),
                _ => None,
            }
        })
        .collect()
}

/// Write `seconds` of silence as 16-bit mono WAV. Returns the file size.
pub fn write_silence(path: &Path, seconds: f64) -> ToolResult<u64> {
    const SAMPLE_RATE: u32 = 22_050;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let samples = (seconds.max(0.1) * SAMPLE_RATE as f64).round() as u32;

    let wav_error = |e: hound::Error| {
        ToolError::io(
            "writing placeholder audio",
            std::io::Error::new(std::io::ErrorKind::Other, e),
        )
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(wav_error)?;
    for _ in 0..samples {
        writer.write_sample(0i16).map_err(wav_error)?;
    }
    writer.finalize().map_err(wav_error)?;

    let bytes = std::fs::metadata(path)
        .map_err(|e| ToolError::io("reading placeholder audio", e))?
        .len();
    Ok(bytes)
}
