//! Logging infrastructure.
//!
//! - Per-job loggers with file and callback output
//! - Compact mode with progress filtering
//! - Tail buffer for failure diagnosis
//! - Global `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use speaker_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("job-1", "/path/to/logs", LogConfig::default(), None).unwrap();
//! logger.phase("Generating audio");
//! logger.command("espeak-ng -w slide_001.wav ...");
//! logger.progress(40);
//! logger.success("Processing complete!");
//! ```

mod job_logger;
mod types;

pub use job_logger::JobLogger;
pub use types::{LineCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_level`. Call once at startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

/// Tracing for tests (warnings and above, captured per test).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
