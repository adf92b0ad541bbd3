//! Video encode/mux capability.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::config::Settings;
use crate::runner::{run_tool, ToolError, ToolResult};

/// Video composition, concatenation, and probing.
pub trait VideoEncoder: Send + Sync {
    /// Overlay `clip` on the slide `image`, limited to `max_duration`.
    fn compose(
        &self,
        image: &Path,
        clip: &Path,
        output: &Path,
        max_duration: Duration,
        timeout: Duration,
    ) -> ToolResult<()>;

    /// Join `segments` in the given order.
    fn concat(&self, segments: &[PathBuf], output: &Path, timeout: Duration) -> ToolResult<()>;

    /// Hold the still `face` for `duration_secs` with `audio` underneath.
    fn still_clip(
        &self,
        face: &Path,
        audio: &Path,
        output: &Path,
        duration_secs: f64,
        timeout: Duration,
    ) -> ToolResult<()>;

    /// Media duration in seconds.
    fn probe_duration(&self, media: &Path, timeout: Duration) -> ToolResult<f64>;
}

/// Frame geometry for composed segments and still clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub canvas: (u32, u32),
    pub avatar_size: u32,
    pub avatar_position: (u32, u32),
    pub still: (u32, u32),
}

impl Layout {
    pub fn from_settings(settings: &Settings) -> Self {
        let c = &settings.composition;
        Self {
            canvas: (c.canvas_width, c.canvas_height),
            avatar_size: c.avatar_size,
            avatar_position: (c.avatar_x, c.avatar_y),
            still: (settings.animation.still_width, settings.animation.still_height),
        }
    }

    /// `filter_complex` graph scaling the slide to the canvas and placing
    /// the avatar on top.
    fn overlay_filter(&self) -> String {
        format!(
            "[0:v]scale={}:{}[bg];[1:v]scale={size}:{size}[avatar];[bg][avatar]overlay={}:{}[out]",
            self.canvas.0,
            self.canvas.1,
            self.avatar_position.0,
            self.avatar_position.1,
            size = self.avatar_size
        )
    }
}

/// `ffmpeg`/`ffprobe` backed encoder.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg: String,
    ffprobe: String,
    layout: Layout,
}

impl FfmpegEncoder {
    pub fn new(settings: &Settings) -> Self {
        Self {
            ffmpeg: settings.composition.ffmpeg.clone(),
            ffprobe: settings.composition.ffprobe.clone(),
            layout: Layout::from_settings(settings),
        }
    }

    fn ffmpeg(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-y", "-hide_banner", "-loglevel", "error"]);
        cmd
    }

    fn run(&self, cmd: &mut Command, output: &Path, timeout: Duration) -> ToolResult<()> {
        run_tool(&self.ffmpeg, cmd, timeout)?;
        if !output.exists() {
            return Err(ToolError::invalid_output(output, "ffmpeg wrote no file"));
        }
        Ok(())
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn compose(
        &self,
        image: &Path,
        clip: &Path,
        output: &Path,
        max_duration: Duration,
        timeout: Duration,
    ) -> ToolResult<()> {
        let mut cmd = self.ffmpeg();
        cmd.args(["-loop", "1", "-i"])
            .arg(image)
            .arg("-i")
            .arg(clip)
            .arg("-filter_complex")
            .arg(self.layout.overlay_filter())
            .args(["-map", "[out]", "-map", "1:a"])
            .args(["-c:v", "libx264", "-c:a", "aac", "-pix_fmt", "yuv420p"])
            .arg("-shortest")
            .arg("-t")
            .arg(max_duration.as_secs().max(1).to_string())
            .arg(output);
        self.run(&mut cmd, output, timeout)
    }

    fn concat(&self, segments: &[PathBuf], output: &Path, timeout: Duration) -> ToolResult<()> {
        let list_path = output.with_extension("concat.txt");
        fs::write(&list_path, concat_list(segments))
            .map_err(|e| ToolError::io("writing concat list", e))?;

        let mut cmd = self.ffmpeg();
        cmd.args(["-f", "concat", "-safe", "0", "-i"])
            .arg(&list_path)
            .args(["-c", "copy"])
            .arg(output);
        let result = self.run(&mut cmd, output, timeout);

        let _ = fs::remove_file(&list_path);
        result
    }

    fn still_clip(
        &self,
        face: &Path,
        audio: &Path,
        output: &Path,
        duration_secs: f64,
        timeout: Duration,
    ) -> ToolResult<()> {
        let (width, height) = self.layout.still;
        let mut cmd = self.ffmpeg();
        cmd.args(["-loop", "1", "-i"])
            .arg(face)
            .arg("-i")
            .arg(audio)
            .arg("-vf")
            .arg(format!("scale={}:{}", width, height))
            .args(["-c:v", "libx264", "-c:a", "aac"])
            .arg("-t")
            .arg(format!("{:.3}", duration_secs))
            .args(["-pix_fmt", "yuv420p", "-shortest"])
            .arg(output);
        self.run(&mut cmd, output, timeout)
    }

    fn probe_duration(&self, media: &Path, timeout: Duration) -> ToolResult<f64> {
        let mut cmd = Command::new(&self.ffprobe);
        cmd.args(["-v", "quiet", "-show_entries", "format=duration", "-of", "csv=p=0"])
            .arg(media);
        let output = run_tool(&self.ffprobe, &mut cmd, timeout)?;

        output
            .stdout
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| {
                ToolError::invalid_output(media, format!("unparsable duration '{}'", output.stdout.trim()))
            })
    }
}

/// Concat demuxer list: one `file '<path>'` line per segment.
///
/// ffmpeg resolves relative entries against the list file, so paths
/// are made absolute first.
fn concat_list(segments: &[PathBuf]) -> String {
    let mut list = String::new();
    for segment in segments {
        let absolute = std::path::absolute(segment).unwrap_or_else(|_| segment.clone());
        let path = absolute.display().to_string().replace('\'', "'\\''");
        let _ = writeln!(list, "file '{}'", path);
    }
    list
}
