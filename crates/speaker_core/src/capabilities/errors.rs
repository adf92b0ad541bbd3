//! Slide extraction errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::runner::file_label;

/// The presentation could not be turned into slides.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Presentation not found: {}", file_label(.0))]
    NotFound(PathBuf),

    #[error("Unsupported presentation format: {}", file_label(.0))]
    Unsupported(PathBuf),

    #[error("Failed to read {}: {source}", file_label(.path))]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed presentation {}: {message}", file_label(.path))]
    Malformed { path: PathBuf, message: String },

    #[error("No slides found in {}", file_label(.0))]
    Empty(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_file_only() {
        let err = ExtractionError::Empty(PathBuf::from("/uploads/tmp/deck.json"));
        assert_eq!(err.to_string(), "No slides found in deck.json");
    }
}
