//! chunkenc library
//!
//! Chunked, quality-targeted batch transcoding: each input is split into
//! fixed-length video segments, every segment is encoded by ab-av1 against a
//! VMAF floor, the results are joined back together and remuxed with
//! per-track Opus audio, chapters and subtitles from the source.
//!
//! All external programs are driven through [`ports::ToolPort`], so every
//! stage can run against a scripted tool runner.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod ports;
pub mod probe;
pub mod streams;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::DomainError;
pub use domain::model::{FileContext, MediaMetadata, PipelineConfig, Stage};
pub use error::{PipelineError, PipelineResult, ToolError};
