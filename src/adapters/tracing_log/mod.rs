// Tracing log adapter - Console and per-run log file output

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::domain::errors::DomainError;
use crate::error::{PipelineError, PipelineResult};

/// Options for installing the global subscriber
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or `chunkenc=debug`
    pub level: String,
    /// Emit JSON lines on the console instead of coloured text
    pub json: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Tracing log adapter
pub struct TracingLogAdapter;

impl TracingLogAdapter {
    /// `encode_YYYYMMDD_HHMMSS.log`
    pub fn log_file_name(started: DateTime<Local>) -> String {
        format!("encode_{}.log", started.format("%Y%m%d_%H%M%S"))
    }

    fn filter(level: &str) -> Result<EnvFilter, DomainError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(level)
            .map_err(|e| DomainError::BadArgs(format!("Invalid log level '{}': {}", level, e)))
    }

    /// Install the console and file layers; returns the log file path.
    ///
    /// Warnings and errors go to stderr, everything else to stdout.
    pub fn init(logs_dir: &Path, options: &LogOptions) -> PipelineResult<PathBuf> {
        let filter = Self::filter(&options.level)?;

        std::fs::create_dir_all(logs_dir).map_err(|e| PipelineError::io(logs_dir, e))?;
        let log_path = logs_dir.join(Self::log_file_name(Local::now()));
        let file = File::create(&log_path).map_err(|e| PipelineError::io(&log_path, e))?;

        let console = || std::io::stderr.with_max_level(Level::WARN).or_else(std::io::stdout);
        let console_text = (!options.json).then(|| {
            fmt::layer()
                .with_writer(console())
                .with_target(false)
        });
        let console_json = options.json.then(|| {
            fmt::layer()
                .json()
                .with_writer(console())
                .with_current_span(true)
        });
        let file_layer = fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(console_text)
            .with(console_json)
            .with(file_layer)
            .try_init()
            .map_err(|e| DomainError::BadArgs(format!("Failed to install logger: {}", e)))?;

        Ok(log_path)
    }
}
