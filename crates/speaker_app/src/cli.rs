//! Command-line interface for Speaker Avatar.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Turn a slide deck and a face image into a narrated presentation video.
#[derive(Debug, Parser)]
#[command(name = "speaker-avatar", version, about)]
pub struct Cli {
    /// Settings file (created with defaults if missing)
    #[arg(long, global = true, default_value = ".config/settings.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a job and wait for it to finish
    Run {
        /// Presentation manifest (JSON)
        #[arg(long)]
        presentation: PathBuf,

        /// Face image to animate
        #[arg(long)]
        face: PathBuf,

        /// Voice identifier (see `voices`)
        #[arg(long)]
        voice: Option<String>,

        /// Reuse a previous job's workspace to resume it
        #[arg(long)]
        job_id: Option<String>,

        /// Print status snapshots as JSON lines
        #[arg(long)]
        json: bool,

        /// Milliseconds between status polls
        #[arg(long, default_value_t = 500)]
        poll_ms: u64,
    },

    /// List the speech engine's voices
    Voices,

    /// Speak a short sample sentence with a voice
    Preview {
        /// Voice identifier or name (see `voices`)
        voice: String,
    },

    /// Write the default settings file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Delete all job workspaces and outputs
    Cleanup,
}
