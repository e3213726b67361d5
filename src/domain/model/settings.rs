// Pipeline settings - values loaded from TOML and overridden from the command line

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// How the remux stage maps transcoded audio inputs.
///
/// `Optional` emits `-map N:a?`, so a track that vanished is left out of the
/// output instead of failing ffmpeg. `Required` emits `-map N:a`. Either way
/// the final audio-count check still runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioMapPolicy {
    Optional,
    Required,
}

impl AudioMapPolicy {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().as_str() {
            "optional" | "lenient" => Ok(AudioMapPolicy::Optional),
            "required" | "strict" => Ok(AudioMapPolicy::Required),
            other => Err(DomainError::BadArgs(format!(
                "Invalid audio map policy: {}. Valid policies: optional, required",
                other
            ))),
        }
    }
}

impl FromStr for AudioMapPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AudioMapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioMapPolicy::Optional => f.write_str("optional"),
            AudioMapPolicy::Required => f.write_str("required"),
        }
    }
}

/// Settings handed to the quality-targeted encoder for every segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// ffmpeg encoder used by ab-av1
    pub encoder: String,
    /// Minimum VMAF score each segment must reach
    pub min_vmaf: f32,
    /// SVT-AV1 preset (lower is slower)
    pub preset: u8,
    pub keyint: String,
    /// Passed through as repeated `--svt key=value`
    pub svt_params: Vec<String>,
    pub vmaf_options: String,
    /// Quality-probe samples per segment
    pub samples: u32,
    pub sample_duration: String,
    /// Keep the input frame timing untouched
    pub passthrough_frame_rate: bool,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            encoder: "libsvtav1".to_string(),
            min_vmaf: 92.0,
            preset: 6,
            keyint: "10s".to_string(),
            svt_params: vec![
                "tune=3".to_string(),
                "film-grain=8".to_string(),
                "film-grain-denoise=1".to_string(),
                "adaptive-film-grain=1".to_string(),
            ],
            vmaf_options: "n_subsample=8:pool=harmonic_mean".to_string(),
            samples: 3,
            sample_duration: "1sec".to_string(),
            passthrough_frame_rate: true,
        }
    }
}

/// One row of the channel-count to bitrate table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitrateRule {
    pub channels: u32,
    pub kbps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub codec: String,
    pub bitrates: Vec<BitrateRule>,
    /// Used for channel counts missing from `bitrates`
    pub fallback_kbps_per_channel: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            codec: "libopus".to_string(),
            bitrates: vec![
                BitrateRule { channels: 1, kbps: 64 },
                BitrateRule { channels: 2, kbps: 128 },
                BitrateRule { channels: 6, kbps: 256 },
                BitrateRule { channels: 8, kbps: 384 },
            ],
            fallback_kbps_per_channel: 48,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemuxSettings {
    pub audio_map_policy: AudioMapPolicy,
    /// Add `-movflags +faststart` for mp4/mov outputs
    pub faststart: bool,
}

impl Default for RemuxSettings {
    fn default() -> Self {
        Self {
            audio_map_policy: AudioMapPolicy::Optional,
            faststart: true,
        }
    }
}

/// External binaries, either bare names resolved on PATH or explicit paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub ab_av1: String,
    pub mediainfo: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            ab_av1: "ab-av1".to_string(),
            mediainfo: "mediainfo".to_string(),
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root holding input/, output/, working/, segments/, encoded_segments/ and logs/
    pub base_dir: PathBuf,
    pub segment_duration_secs: u64,
    /// Artifacts smaller than this are treated as corrupt
    pub min_file_size: u64,
    /// Input extensions picked up from input/; empty accepts every file
    pub supported_extensions: Vec<String>,
    /// Concurrent segment encodes; 0 uses every CPU
    pub workers: usize,
    /// Kill any external tool running longer than this
    pub stage_timeout_secs: Option<u64>,
    pub encoder: EncoderSettings,
    pub audio: AudioSettings,
    pub remux: RemuxSettings,
    pub tools: ToolPaths,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            segment_duration_secs: 60,
            min_file_size: 1024,
            supported_extensions: vec!["mkv".to_string(), "mp4".to_string()],
            workers: 1,
            stage_timeout_secs: None,
            encoder: EncoderSettings::default(),
            audio: AudioSettings::default(),
            remux: RemuxSettings::default(),
            tools: ToolPaths::default(),
        }
    }
}

impl PipelineConfig {
    /// Reject values no stage can work with
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.segment_duration_secs == 0 {
            return Err(DomainError::InvalidConfig(
                "segment_duration_secs must be positive".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.encoder.min_vmaf) {
            return Err(DomainError::InvalidConfig(format!(
                "min_vmaf must be within 0-100, got {}",
                self.encoder.min_vmaf
            )));
        }
        if self.encoder.samples == 0 {
            return Err(DomainError::InvalidConfig(
                "encoder.samples must be at least 1".to_string(),
            ));
        }
        if self.min_file_size == 0 {
            return Err(DomainError::InvalidConfig(
                "min_file_size must be positive".to_string(),
            ));
        }
        if self.stage_timeout_secs == Some(0) {
            return Err(DomainError::InvalidConfig(
                "stage_timeout_secs must be positive when set".to_string(),
            ));
        }
        if self.audio.fallback_kbps_per_channel == 0 {
            return Err(DomainError::InvalidConfig(
                "audio.fallback_kbps_per_channel must be positive".to_string(),
            ));
        }
        if let Some(rule) = self
            .audio
            .bitrates
            .iter()
            .find(|rule| rule.channels == 0 || rule.kbps == 0)
        {
            return Err(DomainError::InvalidConfig(format!(
                "audio bitrate rule {} channels -> {}k is not positive",
                rule.channels, rule.kbps
            )));
        }
        Ok(())
    }

    /// Worker count with 0 resolved to the number of CPUs
    pub fn resolved_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }

    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_secs.map(Duration::from_secs)
    }

    /// Whether `extension` is picked up from input/
    pub fn accepts_extension(&self, extension: Option<&str>) -> bool {
        if self.supported_extensions.is_empty() {
            return true;
        }
        match extension {
            Some(ext) => self
                .supported_extensions
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }
}
