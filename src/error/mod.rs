//! Error handling module for chunkenc

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::domain::model::Stage;

/// Failure to run an external tool at all (as opposed to a non-zero exit)
#[derive(Error, Debug)]
pub enum ToolError {
    /// Binary could not be started
    #[error("Failed to launch {tool}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Process outlived the stage timeout and was killed
    #[error("{tool} did not finish within {}s", .timeout.as_secs())]
    TimedOut { tool: String, timeout: Duration },

    /// Binary not found on PATH during the startup check
    #[error("Required tool '{tool}' not found in PATH")]
    Missing { tool: String },
}

/// Why an artifact failed validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    #[error("file does not exist")]
    Missing,

    #[error("file size ({size} bytes) is below minimum required size ({min} bytes)")]
    Undersized { size: u64, min: u64 },

    #[error("file could not be probed: {0}")]
    Unparseable(String),

    #[error("expected {expected} artifacts, found {found}")]
    CountMismatch { expected: usize, found: usize },

    #[error("expected {expected} {kind} stream(s), found {found}")]
    StreamCount {
        kind: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// ffprobe could not parse the file or found no streams
    #[error("Failed to probe {}: {reason}", .path.display())]
    Probe { path: PathBuf, reason: String },

    /// An artifact failed the post-stage gate
    #[error("{stage}: validation of {} failed: {reason}", .path.display())]
    Validation {
        stage: Stage,
        path: PathBuf,
        reason: ValidationFailure,
    },

    /// External tool ran and exited non-zero
    #[error("{description} failed: {tool} exited with {}{}", exit_label(.code), stderr_tail(.stderr))]
    ToolFailed {
        tool: String,
        description: String,
        code: Option<i32>,
        stderr: String,
    },

    /// External tool could not be run
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Segmenter produced nothing
    #[error("No segments were produced in {}", .dir.display())]
    NoSegments { dir: PathBuf },

    #[error("Segmentation of {} failed", .path.display())]
    Segmentation {
        path: PathBuf,
        #[source]
        cause: Box<PipelineError>,
    },

    #[error("Encoding of segment {ordinal:04} failed")]
    Encode {
        ordinal: u32,
        #[source]
        cause: Box<PipelineError>,
    },

    /// Encoder task panicked or was cancelled
    #[error("Encoder worker lost: {0}")]
    WorkerLost(String),

    #[error("Concatenation of encoded segments failed")]
    Concatenation {
        #[source]
        cause: Box<PipelineError>,
    },

    #[error("Transcoding of audio track {track} failed")]
    AudioEncode {
        track: usize,
        #[source]
        cause: Box<PipelineError>,
    },

    #[error("Remux into {} failed", .output.display())]
    Remux {
        output: PathBuf,
        #[source]
        cause: Box<PipelineError>,
    },

    #[error("Failed to reset working directory {}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No input files found in {}", .dir.display())]
    NoInputFiles { dir: PathBuf },

    /// Fatal failure of one input file; aborts the batch
    #[error("Processing {} failed during {stage}", .file.display())]
    FileFailed {
        file: PathBuf,
        stage: Stage,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl PipelineError {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (killed by signal)".to_string(),
    }
}

/// Last few stderr lines, enough to identify the failure without flooding the log
fn stderr_tail(stderr: &str) -> String {
    const TAIL_LINES: usize = 8;

    let lines: Vec<&str> = stderr
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = lines.len().saturating_sub(TAIL_LINES);
    format!("\n{}", lines[start..].join("\n"))
}

/// Result type alias for pipeline operations
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
