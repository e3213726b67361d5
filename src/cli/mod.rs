//! CLI module for chunkenc
//!
//! Command-line parsing; every pipeline option can also come from a
//! `CHUNKENC_*` environment variable.

use clap::{Parser, Subcommand};

pub mod args;

pub use args::PipelineArgs;

/// Chunked, VMAF-targeted batch transcoder
///
/// Encodes every file in `<base-dir>/input` segment by segment with ab-av1,
/// transcodes each audio track to Opus and remuxes the result, with chapters
/// and subtitles, into `<base-dir>/output`.
#[derive(Parser, Debug)]
#[command(name = "chunkenc")]
#[command(about = "Chunked, VMAF-targeted batch transcoder")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// The command to execute; runs the batch when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Process every file in the input directory (default)
    Run,
    /// Create the directory layout and a default config file, then exit
    Dirs,
}

impl Cli {
    pub fn selected_command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }
}
