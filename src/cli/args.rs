//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::domain::model::AudioMapPolicy;

/// Options shared by every command; each overrides the config file
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Directory holding input/, output/, working/, segments/, encoded_segments/ and logs/
    #[arg(long, env = "CHUNKENC_BASE_DIR", global = true)]
    pub base_dir: Option<PathBuf>,

    /// Config file (default: <base-dir>/chunkenc.toml when present)
    #[arg(long, env = "CHUNKENC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Concurrent segment encodes (0 = one per CPU)
    #[arg(long, env = "CHUNKENC_WORKERS", global = true)]
    pub workers: Option<usize>,

    /// Minimum VMAF every segment must reach
    #[arg(long, env = "CHUNKENC_MIN_VMAF", global = true)]
    pub min_vmaf: Option<f32>,

    /// SVT-AV1 preset
    #[arg(long, env = "CHUNKENC_PRESET", global = true)]
    pub preset: Option<u8>,

    /// Segment length in seconds
    #[arg(long, env = "CHUNKENC_SEGMENT_DURATION", global = true)]
    pub segment_duration: Option<u64>,

    /// Kill any external tool running longer than this many seconds
    #[arg(long, env = "CHUNKENC_STAGE_TIMEOUT", global = true)]
    pub stage_timeout: Option<u64>,

    /// How transcoded audio is mapped during remux: optional or required
    #[arg(long, env = "CHUNKENC_AUDIO_MAP_POLICY", global = true)]
    pub audio_map_policy: Option<AudioMapPolicy>,

    /// Logging level or filter directive
    #[arg(long, env = "CHUNKENC_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// JSON log lines on the console
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Do not check for ffmpeg, ffprobe and ab-av1 before starting
    #[arg(long, global = true)]
    pub skip_tool_check: bool,
}
