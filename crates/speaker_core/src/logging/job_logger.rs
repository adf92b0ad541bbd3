//! Per-job logger with file and callback output.
//!
//! Each job gets its own logger that:
//! - Appends to `<logs_folder>/<job_id>.log` (a resumed job keeps its history)
//! - Mirrors lines to an optional callback
//! - Rate-limits progress lines in compact mode
//! - Keeps a tail of external tool output for failure diagnosis

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LineCallback, LogConfig, LogLevel, MessagePrefix};

/// Per-job logger, shared between steps behind an `Arc`.
pub struct JobLogger {
    job_id: String,
    log_path: PathBuf,
    file_writer: Mutex<Option<BufWriter<File>>>,
    callback: Option<LineCallback>,
    config: LogConfig,
    tail_buffer: Mutex<VecDeque<String>>,
    last_progress: Mutex<Option<u32>>,
}

impl JobLogger {
    pub fn new(
        job_id: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LineCallback>,
    ) -> std::io::Result<Self> {
        let job_id = job_id.into();
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&job_id)));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            job_id,
            log_path,
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            callback,
            tail_buffer: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            config,
            last_progress: Mutex::new(None),
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Command.format(command));
    }

    pub fn phase(&self, phase_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Phase.format(phase_name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Log a progress update (filtered in compact mode).
    ///
    /// Returns true if the line was written.
    pub fn progress(&self, percent: u32) -> bool {
        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step.max(1);

            if let Some(previous) = *last {
                if (percent / step) <= (previous / step) && percent < 100 {
                    return false;
                }
                if previous >= 100 {
                    return false;
                }
            }
            *last = Some(percent);
        }

        self.log(LogLevel::Info, &format!("Progress: {}%", percent));
        true
    }

    /// Record a line of external tool output.
    ///
    /// In compact mode the line only goes to the tail buffer.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        {
            let mut buffer = self.tail_buffer.lock();
            if self.config.error_tail > 0 {
                if buffer.len() >= self.config.error_tail {
                    buffer.pop_front();
                }
                buffer.push_back(line.to_string());
            }
        }

        if self.config.compact {
            return;
        }

        let prefix = if is_stderr { "[stderr] " } else { "" };
        self.output(&self.format_message(&format!("{}{}", prefix, line)));
    }

    /// Dump the tail buffer under a header (typically after a failure).
    pub fn show_tail(&self, header: &str) {
        let buffer = self.tail_buffer.lock();
        if buffer.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in buffer.iter() {
            self.output(&self.format_message(line));
        }
    }

    pub fn clear_tail(&self) {
        self.tail_buffer.lock().clear();
    }

    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = self.callback {
            callback(formatted);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
