//! Speaker Avatar Core - turns a slide deck and a face image into a
//! narrated talking-head presentation video.
//!
//! This crate contains all pipeline logic with no terminal or network
//! dependencies. Front ends drive it through [`service::SpeakerService`].

pub mod capabilities;
pub mod config;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod runner;
pub mod service;
pub mod workspace;

pub use models::{JobPhase, JobRequest};
pub use progress::ProgressRecord;
pub use service::SpeakerService;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
