//! Logging types and configuration.

use serde::{Deserialize, Serialize};

use crate::config::LoggingSettings;

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name as written in the config (`"debug"`, `"WARN"`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration for logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to output.
    pub level: LogLevel,
    /// Filter progress lines and keep tool output in the tail only.
    pub compact: bool,
    /// Progress step percentage (compact mode logs only at these intervals).
    pub progress_step: u32,
    /// Number of lines kept for the error tail.
    pub error_tail: usize,
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            progress_step: 10,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

impl LogConfig {
    /// Build from the `[logging]` config section.
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            level: LogLevel::from_name(&settings.level).unwrap_or_default(),
            compact: settings.compact,
            progress_step: settings.progress_step.max(1),
            error_tail: settings.error_tail as usize,
            show_timestamps: true,
        }
    }

    /// Verbose configuration: every line, every progress update.
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
            compact: false,
            progress_step: 1,
            error_tail: 50,
            show_timestamps: true,
        }
    }
}

/// Receives each formatted log line (for front ends that mirror the job log).
pub type LineCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Message prefix types for consistent formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePrefix {
    /// Shell command: `$ command`
    Command,
    /// Phase marker: `=== Phase ===`
    Phase,
    Success,
    Warning,
    Error,
    None,
}

impl MessagePrefix {
    pub fn format(&self, message: &str) -> String {
        match self {
            MessagePrefix::Command => format!("$ {}", message),
            MessagePrefix::Phase => format!("=== {} ===", message),
            MessagePrefix::Success => format!("[SUCCESS] {}", message),
            MessagePrefix::Warning => format!("[WARNING] {}", message),
            MessagePrefix::Error => format!("[ERROR] {}", message),
            MessagePrefix::None => message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_parse() {
        assert_eq!(LogLevel::from_name("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_name("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_name("loud"), None);
    }

    #[test]
    fn config_follows_settings() {
        let settings = LoggingSettings {
            compact: false,
            progress_step: 0,
            error_tail: 7,
            level: "bogus".to_string(),
        };
        let config = LogConfig::from_settings(&settings);
        assert!(!config.compact);
        assert_eq!(config.progress_step, 1);
        assert_eq!(config.error_tail, 7);
        assert_eq!(config.level, LogLevel::Info);
    }

    #[test]
    fn prefixes_format() {
        assert_eq!(MessagePrefix::Phase.format("Audio"), "=== Audio ===");
        assert_eq!(MessagePrefix::Command.format("ffmpeg -y"), "$ ffmpeg -y");
    }
}
