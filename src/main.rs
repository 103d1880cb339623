//! auditq - resumable, backpressure-aware URL audit queue.
//!
//! Main entry point for the auditq CLI.

mod cli;
mod cmd_run;
mod cmd_state;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use auditq_config::ConfigLoader;

use cli::{Cli, Commands};

/// Get the .auditq directory path.
fn auditq_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".auditq"))
        .unwrap_or_else(|| PathBuf::from(".auditq"))
}

/// Initialize tracing with console and file output.
///
/// Log files are written to ~/.auditq/logs/ with daily rotation.
fn init_tracing(log_level: Option<&str>) -> Result<()> {
    let log_dir = auditq_dir().join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("auditq")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes the file writer when the process exits.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = match log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()?;

    Ok(())
}

async fn run(cli: Cli) -> Result<bool> {
    let config = ConfigLoader::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => cmd_run::run(config, args).await,
        Commands::Resume {
            state_id,
            reprocess,
            output,
        } => cmd_run::resume(config, &state_id, reprocess, output.output.as_deref()).await,
        Commands::State { action } => {
            cmd_state::handle_state_command(&config, action).await?;
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_level.as_deref()) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
