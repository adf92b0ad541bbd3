//! Configuration management.
//!
//! - TOML configuration split into sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates that leave other sections untouched
//! - Missing keys fall back to defaults on load
//!
//! # Example
//!
//! ```no_run
//! use speaker_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/settings.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Speech engine: {}", config.settings().speech.command);
//!
//! config.settings_mut().animation.max_attempts = 3;
//! config.update_section(ConfigSection::Animation).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AnimationSettings, CompositionSettings, ConfigSection, LoggingSettings, PathSettings,
    ProcessingSettings, Settings, SpeechSettings, ValidationSettings,
};
