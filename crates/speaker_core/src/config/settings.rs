//! Settings struct with TOML-based sections.
//!
//! Each section maps to a TOML table and can be written back on its own.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub speech: SpeechSettings,

    #[serde(default)]
    pub animation: AnimationSettings,

    #[serde(default)]
    pub composition: CompositionSettings,

    #[serde(default)]
    pub validation: ValidationSettings,

    #[serde(default)]
    pub processing: ProcessingSettings,
}

/// Working, output and log directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root for per-job working directories.
    #[serde(default = "default_work_root")]
    pub work_root: String,

    /// Root for finished videos (one subfolder per job).
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Voice preview clips.
    #[serde(default = "default_previews_folder")]
    pub previews_folder: String,
}

fn default_work_root() -> String {
    ".work".to_string()
}

fn default_output_folder() -> String {
    "output".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_previews_folder() -> String {
    "previews".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            work_root: default_work_root(),
            output_folder: default_output_folder(),
            logs_folder: default_logs_folder(),
            previews_folder: default_previews_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Rate-limit progress lines in the job log.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Minimum progress step (percent) between logged progress lines.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Number of tool output lines dumped when a tool fails.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_true() -> bool {
    true
}

fn default_progress_step() -> u32 {
    10
}

fn default_error_tail() -> u32 {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            progress_step: default_progress_step(),
            error_tail: default_error_tail(),
            level: default_log_level(),
        }
    }
}

/// Speech synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSettings {
    /// Speech synthesizer executable.
    #[serde(default = "default_speech_command")]
    pub command: String,

    /// Voice used when the request names none (empty = engine default).
    #[serde(default)]
    pub default_voice: String,

    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: u32,

    #[serde(default = "default_speech_attempts")]
    pub max_attempts: u32,

    /// Per-slide attempt timeout in seconds.
    #[serde(default = "default_speech_timeout")]
    pub timeout_secs: u64,

    /// Length of the silent placeholder in seconds.
    #[serde(default = "default_placeholder_secs")]
    pub placeholder_secs: f64,

    /// Pause after resetting the engine, before the next attempt.
    #[serde(default = "default_reset_delay_ms")]
    pub reset_delay_ms: u64,
}

fn default_speech_command() -> String {
    "espeak-ng".to_string()
}

fn default_words_per_minute() -> u32 {
    150
}

fn default_speech_attempts() -> u32 {
    3
}

fn default_speech_timeout() -> u64 {
    30
}

fn default_placeholder_secs() -> f64 {
    1.0
}

fn default_reset_delay_ms() -> u64 {
    500
}

impl SpeechSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            command: default_speech_command(),
            default_voice: String::new(),
            words_per_minute: default_words_per_minute(),
            max_attempts: default_speech_attempts(),
            timeout_secs: default_speech_timeout(),
            placeholder_secs: default_placeholder_secs(),
            reset_delay_ms: default_reset_delay_ms(),
        }
    }
}

/// Lip-sync animation and its still-image fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationSettings {
    /// Wav2Lip checkout containing `inference.py`.
    #[serde(default = "default_wav2lip_dir")]
    pub wav2lip_dir: String,

    /// Model checkpoint, relative to `wav2lip_dir` unless absolute.
    #[serde(default = "default_checkpoint")]
    pub checkpoint: String,

    /// Python interpreter used to run inference.
    #[serde(default = "default_python")]
    pub python: String,

    #[serde(default = "default_animation_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_animation_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_fps")]
    pub fps: u32,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Face padding: top, bottom, left, right.
    #[serde(default = "default_pads")]
    pub pads: [u32; 4],

    /// Frame size of still-image fallback clips.
    #[serde(default = "default_still_width")]
    pub still_width: u32,

    #[serde(default = "default_still_height")]
    pub still_height: u32,

    /// Fallback clip length when the audio duration cannot be probed.
    #[serde(default = "default_fallback_duration")]
    pub fallback_duration_secs: f64,

    #[serde(default = "default_animation_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_wav2lip_dir() -> String {
    "Wav2Lip".to_string()
}

fn default_checkpoint() -> String {
    "checkpoints/wav2lip_gan.pth".to_string()
}

fn default_python() -> String {
    "python".to_string()
}

fn default_animation_attempts() -> u32 {
    2
}

fn default_animation_timeout() -> u64 {
    300
}

fn default_fps() -> u32 {
    25
}

fn default_batch_size() -> u32 {
    2
}

fn default_pads() -> [u32; 4] {
    [0, 20, 0, 0]
}

fn default_still_width() -> u32 {
    426
}

fn default_still_height() -> u32 {
    640
}

fn default_fallback_duration() -> f64 {
    5.0
}

fn default_animation_retry_delay() -> u64 {
    1000
}

impl AnimationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            wav2lip_dir: default_wav2lip_dir(),
            checkpoint: default_checkpoint(),
            python: default_python(),
            max_attempts: default_animation_attempts(),
            timeout_secs: default_animation_timeout(),
            fps: default_fps(),
            batch_size: default_batch_size(),
            pads: default_pads(),
            still_width: default_still_width(),
            still_height: default_still_height(),
            fallback_duration_secs: default_fallback_duration(),
            retry_delay_ms: default_animation_retry_delay(),
        }
    }
}

/// Segment composition and final concatenation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionSettings {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,

    #[serde(default = "default_composition_attempts")]
    pub max_attempts: u32,

    /// Per-invocation encoder timeout in seconds.
    #[serde(default = "default_composition_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on each composed segment's length.
    #[serde(default = "default_max_segment_secs")]
    pub max_segment_secs: u64,

    #[serde(default = "default_canvas_width")]
    pub canvas_width: u32,

    #[serde(default = "default_canvas_height")]
    pub canvas_height: u32,

    /// Square size of the avatar overlay.
    #[serde(default = "default_avatar_size")]
    pub avatar_size: u32,

    #[serde(default = "default_avatar_x")]
    pub avatar_x: u32,

    #[serde(default = "default_avatar_y")]
    pub avatar_y: u32,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_composition_attempts() -> u32 {
    2
}

fn default_composition_timeout() -> u64 {
    60
}

fn default_max_segment_secs() -> u64 {
    30
}

fn default_canvas_width() -> u32 {
    1920
}

fn default_canvas_height() -> u32 {
    1080
}

fn default_avatar_size() -> u32 {
    320
}

fn default_avatar_x() -> u32 {
    1600
}

fn default_avatar_y() -> u32 {
    760
}

impl CompositionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_segment(&self) -> Duration {
        Duration::from_secs(self.max_segment_secs)
    }
}

impl Default for CompositionSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            max_attempts: default_composition_attempts(),
            timeout_secs: default_composition_timeout(),
            max_segment_secs: default_max_segment_secs(),
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
            avatar_size: default_avatar_size(),
            avatar_x: default_avatar_x(),
            avatar_y: default_avatar_y(),
        }
    }
}

/// Minimum artifact sizes per stage, in bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSettings {
    #[serde(default = "default_min_image_bytes")]
    pub min_image_bytes: u64,

    /// A WAV header alone is 44 bytes.
    #[serde(default = "default_min_audio_bytes")]
    pub min_audio_bytes: u64,

    #[serde(default = "default_min_video_bytes")]
    pub min_clip_bytes: u64,

    #[serde(default = "default_min_video_bytes")]
    pub min_segment_bytes: u64,

    #[serde(default = "default_min_video_bytes")]
    pub min_output_bytes: u64,
}

fn default_min_image_bytes() -> u64 {
    100
}

fn default_min_audio_bytes() -> u64 {
    45
}

fn default_min_video_bytes() -> u64 {
    1024
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            min_image_bytes: default_min_image_bytes(),
            min_audio_bytes: default_min_audio_bytes(),
            min_clip_bytes: default_min_video_bytes(),
            min_segment_bytes: default_min_video_bytes(),
            min_output_bytes: default_min_video_bytes(),
        }
    }
}

/// Job processing behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// Reuse artifacts with a valid completion marker.
    #[serde(default = "default_true")]
    pub skip_existing: bool,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            skip_existing: true,
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Speech,
    Animation,
    Composition,
    Validation,
    Processing,
}

impl ConfigSection {
    /// All sections in file order.
    pub const ALL: [ConfigSection; 7] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Speech,
        ConfigSection::Animation,
        ConfigSection::Composition,
        ConfigSection::Validation,
        ConfigSection::Processing,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Speech => "speech",
            ConfigSection::Animation => "animation",
            ConfigSection::Composition => "composition",
            ConfigSection::Validation => "validation",
            ConfigSection::Processing => "processing",
        }
    }

    /// Comment written above the section in generated files.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Working, output and log directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Speech => "Speech synthesis",
            ConfigSection::Animation => "Lip-sync animation and still-image fallback",
            ConfigSection::Composition => "Segment composition and concatenation (ffmpeg)",
            ConfigSection::Validation => "Minimum artifact sizes in bytes",
            ConfigSection::Processing => "Job processing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[speech]"));
        assert!(toml.contains("wav2lip_dir"));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[speech]\ncommand = \"say\"\n\n[animation]\nmax_attempts = 4\n";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.speech.command, "say");
        assert_eq!(parsed.speech.max_attempts, 3);
        assert_eq!(parsed.animation.max_attempts, 4);
        assert_eq!(parsed.animation.pads, [0, 20, 0, 0]);
        assert_eq!(parsed.composition.max_segment_secs, 30);
        assert!(parsed.processing.skip_existing);
    }

    #[test]
    fn timeouts_match_stage_budgets() {
        let settings = Settings::default();
        assert_eq!(settings.speech.timeout(), Duration::from_secs(30));
        assert_eq!(settings.animation.timeout(), Duration::from_secs(300));
        assert_eq!(settings.composition.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn table_names_are_unique() {
        let mut names: Vec<_> = ConfigSection::ALL.iter().map(|s| s.table_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ConfigSection::ALL.len());
    }
}
