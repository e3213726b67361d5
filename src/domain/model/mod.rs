// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::errors::DomainError;

pub mod settings;

pub use settings::*;

/// Width of the zero-padded ordinal in segment file names
pub const SEGMENT_ORDINAL_WIDTH: usize = 4;

/// Container used for every intermediate artifact
pub const INTERMEDIATE_EXTENSION: &str = "mkv";

/// Pipeline stage, used to tag failures and to drive the per-file state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Probe,
    Segment,
    Encode,
    Concatenate,
    AudioTranscode,
    Remux,
    Cleanup,
}

impl Stage {
    /// Human label used in log lines and fatal messages
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Probe => "probe",
            Stage::Segment => "segmentation",
            Stage::Encode => "segment encoding",
            Stage::Concatenate => "concatenation",
            Stage::AudioTranscode => "audio transcoding",
            Stage::Remux => "remux",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-file processing state.
///
/// Transitions only move forward one step at a time; `Failed` is reachable
/// from every non-terminal state and absorbs everything after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Discovered,
    Probed,
    Segmented,
    Encoded,
    Concatenated,
    AudioDone,
    Remuxed,
    CleanedUp,
    Failed(Stage),
}

impl FileState {
    /// Position in the forward sequence; `None` for `Failed`
    fn position(&self) -> Option<u8> {
        match self {
            FileState::Discovered => Some(0),
            FileState::Probed => Some(1),
            FileState::Segmented => Some(2),
            FileState::Encoded => Some(3),
            FileState::Concatenated => Some(4),
            FileState::AudioDone => Some(5),
            FileState::Remuxed => Some(6),
            FileState::CleanedUp => Some(7),
            FileState::Failed(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FileState::CleanedUp | FileState::Failed(_))
    }

    /// Move to `next`, rejecting anything but a single forward step or a failure
    pub fn advance(self, next: FileState) -> Result<FileState, DomainError> {
        let invalid = || DomainError::InvalidTransition {
            from: format!("{:?}", self),
            to: format!("{:?}", next),
        };

        if self.is_terminal() {
            return Err(invalid());
        }

        match (self.position(), next.position()) {
            (_, None) => Ok(next),
            (Some(from), Some(to)) if to == from + 1 => Ok(next),
            _ => Err(invalid()),
        }
    }
}

/// One source audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTrack {
    /// Ordinal among the source's audio streams (ffmpeg `0:a:N`)
    pub index: usize,
    /// Channel count, always positive
    pub channels: u32,
}

impl AudioTrack {
    pub fn new(index: usize, channels: u32) -> Result<Self, DomainError> {
        if channels == 0 {
            return Err(DomainError::BadArgs(format!(
                "Audio track {} has zero channels",
                index
            )));
        }
        Ok(Self { index, channels })
    }

    /// Intermediate file name keyed by the track index
    pub fn artifact_name(&self) -> String {
        format!("audio-{}.{}", self.index, INTERMEDIATE_EXTENSION)
    }
}

/// Probed, immutable metadata of one media file
#[derive(Debug, Clone, PartialEq)]
pub struct MediaMetadata {
    pub path: PathBuf,
    pub video_streams: usize,
    pub audio_tracks: Vec<AudioTrack>,
    pub subtitle_streams: usize,
    pub has_chapters: bool,
    pub duration_secs: Option<f64>,
    pub container: Option<String>,
}

impl MediaMetadata {
    pub fn has_video(&self) -> bool {
        self.video_streams > 0
    }

    pub fn has_subtitles(&self) -> bool {
        self.subtitle_streams > 0
    }

    pub fn audio_track_count(&self) -> usize {
        self.audio_tracks.len()
    }
}

/// A stream-copied slice of the source video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub ordinal: u32,
    pub path: PathBuf,
}

impl Segment {
    /// Parse the ordinal out of a `0007.mkv` style file name
    pub fn from_path(path: &Path) -> Result<Self, DomainError> {
        let ordinal = parse_ordinal(path)?;
        Ok(Self {
            ordinal,
            path: path.to_path_buf(),
        })
    }
}

/// Quality-targeted re-encode of one segment, keyed by the same ordinal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSegment {
    pub ordinal: u32,
    pub path: PathBuf,
}

impl EncodedSegment {
    pub fn from_path(path: &Path) -> Result<Self, DomainError> {
        let ordinal = parse_ordinal(path)?;
        Ok(Self {
            ordinal,
            path: path.to_path_buf(),
        })
    }
}

/// File name for a segment ordinal
pub fn segment_file_name(ordinal: u32) -> String {
    format!(
        "{:0width$}.{}",
        ordinal,
        INTERMEDIATE_EXTENSION,
        width = SEGMENT_ORDINAL_WIDTH
    )
}

/// ffmpeg segment muxer output pattern matching `segment_file_name`
pub fn segment_file_pattern() -> String {
    format!("%0{}d.{}", SEGMENT_ORDINAL_WIDTH, INTERMEDIATE_EXTENSION)
}

fn parse_ordinal(path: &Path) -> Result<u32, DomainError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let invalid = || DomainError::InvalidOrdinal(name.clone());

    let extension = path.extension().and_then(|e| e.to_str()).ok_or_else(invalid)?;
    if !extension.eq_ignore_ascii_case(INTERMEDIATE_EXTENSION) {
        return Err(invalid());
    }

    // `%04d` pads to four digits and grows past them from 10000 on
    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;
    if stem.len() < SEGMENT_ORDINAL_WIDTH || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if stem.len() > SEGMENT_ORDINAL_WIDTH && stem.starts_with('0') {
        return Err(invalid());
    }
    stem.parse::<u32>().map_err(|_| invalid())
}

/// Everything a stage needs to know about the file being processed.
///
/// Built once after probing and passed by reference to every stage.
#[derive(Debug, Clone)]
pub struct FileContext {
    pub source: PathBuf,
    pub stem: String,
    pub extension: String,
    pub metadata: MediaMetadata,
    /// Result of the dynamic-range detector; logged only
    pub dolby_vision: bool,
    pub segments_dir: PathBuf,
    pub encoded_dir: PathBuf,
    pub working_dir: PathBuf,
    pub output_path: PathBuf,
}

impl FileContext {
    /// Concatenated video-only intermediate
    pub fn video_path(&self) -> PathBuf {
        self.working_dir
            .join(format!("{}.{}", self.stem, INTERMEDIATE_EXTENSION))
    }

    /// Intermediate path for one transcoded audio track
    pub fn audio_path(&self, track: &AudioTrack) -> PathBuf {
        self.working_dir.join(track.artifact_name())
    }
}

#[cfg(test)]
mod tests;
