//! Lip-sync animation capability.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::config::AnimationSettings;
use crate::runner::{is_runnable, run_tool, ToolError, ToolResult};

/// Animates a still face so its lips follow an audio track.
///
/// The capability may be missing entirely, which `is_available` reports
/// without attempting any work.
pub trait LipSync: Send + Sync {
    fn is_available(&self) -> bool;

    fn animate(&self, face: &Path, audio: &Path, output: &Path, timeout: Duration)
        -> ToolResult<()>;
}

/// Wav2Lip run through its `inference.py` script.
#[derive(Debug, Clone)]
pub struct Wav2LipCommand {
    root: PathBuf,
    checkpoint: PathBuf,
    python: String,
    fps: u32,
    batch_size: u32,
    pads: [u32; 4],
}

impl Wav2LipCommand {
    pub fn new(settings: &AnimationSettings) -> Self {
        let root = PathBuf::from(&settings.wav2lip_dir);
        let checkpoint = Path::new(&settings.checkpoint);
        let checkpoint = if checkpoint.is_absolute() {
            checkpoint.to_path_buf()
        } else {
            root.join(checkpoint)
        };
        Self {
            root,
            checkpoint,
            python: settings.python.clone(),
            fps: settings.fps,
            batch_size: settings.batch_size.max(1),
            pads: settings.pads,
        }
    }

    fn script(&self) -> PathBuf {
        self.root.join("inference.py")
    }
}

impl LipSync for Wav2LipCommand {
    fn is_available(&self) -> bool {
        if !self.script().is_file() {
            tracing::info!("Wav2Lip not found at {}", self.root.display());
            return false;
        }
        if !self.checkpoint.is_file() {
            tracing::info!("Wav2Lip checkpoint missing: {}", self.checkpoint.display());
            return false;
        }
        is_runnable(&self.python, "--version", Duration::from_secs(10))
    }

    fn animate(
        &self,
        face: &Path,
        audio: &Path,
        output: &Path,
        timeout: Duration,
    ) -> ToolResult<()> {
        let mut cmd = Command::new(&self.python);
        cmd.arg(self.script())
            .arg("--checkpoint_path")
            .arg(&self.checkpoint)
            .arg("--face")
            .arg(face)
            .arg("--audio")
            .arg(audio)
            .arg("--outfile")
            .arg(output)
            .args(["--static", "True"])
            .arg("--fps")
            .arg(self.fps.to_string())
            .arg("--pads")
            .args(self.pads.iter().map(|p| p.to_string()))
            .args(["--resize_factor", "1"])
            .arg("--wav2lip_batch_size")
            .arg(self.batch_size.to_string());

        run_tool("Wav2Lip", &mut cmd, timeout)?;
        if !output.exists() {
            return Err(ToolError::invalid_output(output, "Wav2Lip wrote no clip"));
        }
        Ok(())
    }
}
