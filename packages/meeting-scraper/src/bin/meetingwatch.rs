//! MeetingWatch runner
//!
//! Scrapes every configured source once and publishes the meetings document.
//! Meant to be run on a schedule (cron, CI).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meeting_scraper::{Config, Pipeline};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "meetingwatch")]
#[command(about = "Scrape municipal meeting calendars into a JSON snapshot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape all sources and write the document
    Run {
        #[arg(long, default_value = "config/sources.json")]
        config: PathBuf,

        #[arg(long, default_value = "public/meetings.json")]
        output: PathBuf,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Exit non-zero when any source failed
        #[arg(long)]
        strict: bool,
    },

    /// Load and validate the configuration, then exit
    CheckConfig {
        #[arg(long, default_value = "config/sources.json")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,meeting_scraper=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output,
            json,
            strict,
        } => {
            let config = Config::load(&config)
                .with_context(|| format!("Failed to load config from {}", config.display()))?;
            let pipeline =
                Pipeline::from_config(config).context("Failed to build HTTP client")?;

            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }

            let report = pipeline
                .run_to_file(&output)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            for failure in &report.failed {
                tracing::warn!(source_id = %failure.source_id, error = %failure.error, "Source failed");
            }

            if strict && !report.is_success() {
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckConfig { config } => {
            let loaded = Config::load(&config)
                .with_context(|| format!("Invalid config {}", config.display()))?;

            tracing::info!(
                path = %config.display(),
                sources = loaded.sources.len(),
                timezone = %loaded.settings.timezone,
                model = loaded.settings.model_enabled(),
                "Config OK"
            );
            for source in &loaded.sources {
                println!("{:<24} {:<9} {}", source.id, source.adapter_type.to_string(), source.url);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
