//! chunkenc
//!
//! Batch transcoder that splits each input into segments, encodes every
//! segment with ab-av1 against a minimum VMAF, and remuxes the result with
//! Opus audio, chapters and subtitles carried over from the source.
//!
//! # Usage
//!
//! ```bash
//! chunkenc dirs --base-dir /media/batch
//! chunkenc --base-dir /media/batch --workers 4 --min-vmaf 93
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use chunkenc::adapters::{LogOptions, TomlConfigAdapter, TracingLogAdapter};
use chunkenc::app::{AppContainer, DefaultAppContainer};
use chunkenc::cli::{Cli, Commands};
use chunkenc::config_initialization::resolve_config;
use chunkenc::domain::model::PipelineConfig;
use chunkenc::utils::{Utils, WorkspaceLayout};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if tracing::dispatcher::has_been_set() {
                error!("Fatal: {:#}", e);
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli.pipeline).context("Invalid configuration")?;

    let layout = WorkspaceLayout::new(&config.base_dir);
    layout.create_all()?;

    let log_path = TracingLogAdapter::init(
        &layout.logs,
        &LogOptions {
            level: cli.pipeline.log_level.clone(),
            json: cli.pipeline.log_json,
        },
    )?;
    info!("Logging to {}", log_path.display());

    match cli.selected_command() {
        Commands::Dirs => {
            let config_path = TomlConfigAdapter::default_path(&layout.base);
            // Relative base so the directory can be moved
            let template = PipelineConfig {
                base_dir: PathBuf::from("."),
                ..config
            };
            if TomlConfigAdapter::write_if_missing(&config_path, &template)? {
                info!("Wrote default configuration to {}", config_path.display());
            }
            info!("Directory layout ready under {}", layout.base.display());
            Ok(())
        }
        Commands::Run => {
            let container = DefaultAppContainer::new(config);
            let batch = container.batch_interactor();

            if cli.pipeline.skip_tool_check {
                info!("Skipping tool check");
            } else {
                batch.check_tools().await?;
            }

            let report = batch.run().await?;
            info!(
                "Batch complete: {} file(s) in {}",
                report.files.len(),
                Utils::format_duration(report.total_duration())
            );
            Ok(())
        }
    }
}
