//! Config manager for loading, saving, and atomic updates.
//!
//! Writes go to a temp file that is then renamed over the config, and
//! section updates go through `toml_edit` so the rest of the file is
//! left as it was on disk.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages application configuration.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Create a manager for `config_path`. Call `load()` or
    /// `load_or_create()` before reading settings from disk.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Changes are in memory only until `save()` or `update_section()`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file. Fails if the file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&content)?;
        Ok(())
    }

    /// Load config from file, creating it with defaults if missing.
    ///
    /// An existing file missing keys or carrying unknown sections is
    /// rewritten with the defaults filled in.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let (settings, was_modified) = self.parse_and_check(&content)?;
            self.settings = settings;

            if was_modified {
                tracing::debug!("Filling in defaults in {}", self.config_path.display());
                self.save()?;
            }
        } else {
            self.settings = Settings::default();
            self.save()?;
            tracing::info!("Created default config at {}", self.config_path.display());
        }
        Ok(())
    }

    /// Create the work, output, and logs directories.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let paths = &self.settings.paths;
        for dir in [
            &paths.work_root,
            &paths.output_folder,
            &paths.logs_folder,
            &paths.previews_folder,
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Parse content and report whether it differs from its normalized form.
    fn parse_and_check(&self, content: &str) -> ConfigResult<(Settings, bool)> {
        let doc: DocumentMut = content.parse()?;
        let settings: Settings = toml::from_str(content)?;

        let known: Vec<&str> = ConfigSection::ALL.iter().map(|s| s.table_name()).collect();
        let has_unknown = doc.iter().any(|(key, _)| !known.contains(&key));

        let missing_keys = ConfigSection::ALL.iter().any(|section| {
            let expected = match section_table(&settings, *section) {
                Ok(table) => table,
                Err(_) => return true,
            };
            match doc.get(section.table_name()).and_then(Item::as_table) {
                Some(existing) => expected.iter().any(|(key, _)| !existing.contains_key(key)),
                None => true,
            }
        });

        Ok((settings, has_unknown || missing_keys))
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Rewrite one section on disk, leaving the others untouched.
    ///
    /// The file is re-read first so unrelated in-memory edits are not
    /// written by accident.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current_content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current_content.is_empty() {
            DocumentMut::new()
        } else {
            current_content.parse()?
        };

        let table = section_table(&self.settings, section)?;
        doc[section.table_name()] = Item::Table(table);

        self.atomic_write(&doc.to_string())?;
        Ok(())
    }

    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut output = String::new();

        output.push_str("# Speaker Avatar Configuration\n");
        output.push_str(
            "# This file is auto-generated. Comments may be preserved on section updates.\n",
        );

        for section in ConfigSection::ALL {
            output.push('\n');
            output.push_str(&format!("# {}\n", section.description()));
            output.push_str(&format!("[{}]\n", section.table_name()));
            let body = section_body(&self.settings, section)?;
            for line in body.lines() {
                output.push_str(line);
                output.push('\n');
            }
        }

        Ok(output)
    }

    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.config_path.with_extension("toml.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;
        Ok(())
    }
}

/// Serialize one section's fields (without the table header).
fn section_body(settings: &Settings, section: ConfigSection) -> ConfigResult<String> {
    let body = match section {
        ConfigSection::Paths => toml::to_string_pretty(&settings.paths)?,
        ConfigSection::Logging => toml::to_string_pretty(&settings.logging)?,
        ConfigSection::Speech => toml::to_string_pretty(&settings.speech)?,
        ConfigSection::Animation => toml::to_string_pretty(&settings.animation)?,
        ConfigSection::Composition => toml::to_string_pretty(&settings.composition)?,
        ConfigSection::Validation => toml::to_string_pretty(&settings.validation)?,
        ConfigSection::Processing => toml::to_string_pretty(&settings.processing)?,
    };
    Ok(body)
}

fn section_table(settings: &Settings, section: ConfigSection) -> ConfigResult<toml_edit::Table> {
    let body = section_body(settings, section)?;
    let doc: DocumentMut = body.parse()?;
    Ok(doc.as_table().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_or_create_creates_default() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(".config").join("settings.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        for section in ConfigSection::ALL {
            assert!(content.contains(&format!("[{}]", section.table_name())));
        }

        let mut reloaded = ConfigManager::new(&config_path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().speech.max_attempts, 3);
    }

    #[test]
    fn load_or_create_preserves_existing() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");
        fs::write(&config_path, "[speech]\ndefault_voice = \"en-us\"\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().speech.default_voice, "en-us");
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[composition]"));
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("absent.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn update_section_only_changes_target() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        manager.settings_mut().animation.max_attempts = 5;
        manager.settings_mut().speech.command = "not-saved".to_string();
        manager.update_section(ConfigSection::Animation).unwrap();

        let mut reloaded = ConfigManager::new(&config_path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().animation.max_attempts, 5);
        assert_eq!(reloaded.settings().speech.command, "espeak-ng");
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(!config_path.with_extension("toml.tmp").exists());
    }
}
