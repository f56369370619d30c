//! Main Entrypoint for the ICS Moderator Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment (with CLI overrides).
//! 2. Initializing logging.
//! 3. Running the moderation loop until shutdown.

use anyhow::Context;
use clap::Parser;
use ics_moderator::{config::Config, runner};
use std::path::PathBuf;
use tracing::info;

/// Moderator-side orchestration service for an interactive-customer-service
/// simulation trial.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory holding TaskInfoNN.json, TaskImageNN.jpg and graspables.json.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Directory where session recordings are written.
    #[arg(long)]
    record_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(config_dir) = args.config_dir {
        config.config_dir = config_dir;
    }
    if let Some(record_dir) = args.record_dir {
        config.record_dir = record_dir;
    }

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Starting the moderator service...");

    runner::run(config).await
}
