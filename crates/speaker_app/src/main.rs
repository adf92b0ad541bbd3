//! Speaker Avatar command-line front end.
//!
//! Usage:
//!   speaker-avatar run --presentation deck.json --face face.png
//!   speaker-avatar voices
//!   speaker-avatar preview English
//!   speaker-avatar init-config
//!   speaker-avatar cleanup

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use clap::Parser;

use cli::{Cli, Commands};
use speaker_core::config::{ConfigManager, Settings};
use speaker_core::logging::{init_tracing, LogLevel};
use speaker_core::{JobPhase, JobRequest, SpeakerService};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { force } = &cli.command {
        init_tracing(LogLevel::Info);
        return init_config(&cli.config, *force);
    }

    let settings = load_settings(&cli.config)?;
    let level = LogLevel::from_name(&settings.logging.level).unwrap_or_default();
    init_tracing(level);

    match cli.command {
        Commands::Run {
            presentation,
            face,
            voice,
            job_id,
            json,
            poll_ms,
        } => {
            let mut request = JobRequest::new(presentation, face);
            if let Some(voice) = voice {
                request = request.with_voice(voice);
            }
            if let Some(job_id) = job_id {
                request = request.with_job_id(job_id);
            }
            run_job(settings, request, json, Duration::from_millis(poll_ms))
        }
        Commands::Voices => list_voices(settings),
        Commands::Preview { voice } => preview_voice(settings, &voice),
        Commands::Cleanup => {
            let service = SpeakerService::new(settings);
            let report = service.cleanup()?;
            println!("Removed {} entries", report.entries_removed);
            Ok(())
        }
        Commands::InitConfig { .. } => Ok(()),
    }
}

fn load_settings(path: &Path) -> Result<Settings> {
    let mut manager = ConfigManager::new(path);
    manager
        .load_or_create()
        .with_context(|| format!("loading settings from {}", path.display()))?;
    manager.ensure_dirs_exist()?;
    Ok(manager.settings().clone())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let manager = ConfigManager::new(path);
    manager.save()?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

fn list_voices(settings: Settings) -> Result<()> {
    let service = SpeakerService::new(settings);
    let voices = service.voices().context("listing voices")?;
    if voices.is_empty() {
        println!("No voices reported by the speech engine");
    }
    for voice in voices {
        println!("{:<16} {}", voice.id, voice.name);
    }
    Ok(())
}

fn preview_voice(settings: Settings, voice: &str) -> Result<()> {
    let service = SpeakerService::new(settings);
    let preview = service
        .preview_voice(voice)
        .with_context(|| format!("previewing voice '{}'", voice))?;
    if !preview.voice_found {
        eprintln!("warning: voice '{}' not found, default voice used", voice);
    }
    println!("Preview: {}", preview.path.display());
    Ok(())
}

fn run_job(settings: Settings, request: JobRequest, json: bool, poll: Duration) -> Result<()> {
    let service = SpeakerService::new(settings)
        .with_line_callback(Arc::new(|line: &str| tracing::debug!(target: "job", "{}", line)));
    let ticket = service.start_job(request)?;
    tracing::info!("Job {} started", ticket.job_id);

    let mut last_step = String::new();
    loop {
        let status = service.status();
        if json {
            println!("{}", serde_json::to_string(&*status)?);
        } else if status.current_step != last_step {
            println!("[{:>3}%] {}", status.progress, status.current_step);
            last_step = status.current_step.clone();
        }
        if status.is_terminal() || !service.is_busy() {
            break;
        }
        thread::sleep(poll);
    }

    let result = service.wait();
    let status = service.status();
    for warning in &status.warnings {
        eprintln!("warning: {}", warning);
    }

    match status.state {
        JobPhase::Completed => {
            let artifact = service.result()?;
            println!("Final video: {}", artifact.path.display());
            Ok(())
        }
        JobPhase::Failed => {
            if let Some(result) = &result {
                for line in &result.tool_output {
                    eprintln!("  | {}", line);
                }
            }
            bail!(
                "job {} failed: {}",
                ticket.job_id,
                status.error.as_deref().unwrap_or("unknown error")
            )
        }
        state => match result {
            Some(result) if result.cancelled => bail!("job {} was cancelled", ticket.job_id),
            _ => bail!("job {} ended in state {}", ticket.job_id, state),
        },
    }
}
