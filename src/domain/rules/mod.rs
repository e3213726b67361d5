// Domain rules - Business logic and policies

use std::path::Path;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Layouts the audio encoder can always map; `aformat` picks the closest one
pub const CHANNEL_LAYOUT_FILTER: &str = "aformat=channel_layouts=7.1|5.1|stereo|mono";

/// Bitrate policy for transcoded audio tracks
pub struct AudioBitratePolicy;

impl AudioBitratePolicy {
    /// Bitrate in kbps for a track with `channels` channels.
    ///
    /// Table lookup first, then `channels * fallback_kbps_per_channel`.
    pub fn kbps_for(channels: u32, settings: &AudioSettings) -> u32 {
        settings
            .bitrates
            .iter()
            .find(|rule| rule.channels == channels)
            .map(|rule| rule.kbps)
            .unwrap_or_else(|| {
                channels
                    .max(1)
                    .saturating_mul(settings.fallback_kbps_per_channel)
            })
    }

    /// ffmpeg `-b:a` value
    pub fn bitrate_arg(channels: u32, settings: &AudioSettings) -> String {
        format!("{}k", Self::kbps_for(channels, settings))
    }
}

/// Ordering and completeness rules for segment sets
pub struct SegmentRules;

impl SegmentRules {
    /// Ordinals must be exactly 0..n once sorted
    pub fn check_contiguous(ordinals: &[u32]) -> Result<(), DomainError> {
        let mut sorted = ordinals.to_vec();
        sorted.sort_unstable();

        for (expected, found) in sorted.iter().enumerate() {
            let expected = expected as u32;
            if *found == expected {
                continue;
            }
            if expected > 0 && *found == expected - 1 {
                return Err(DomainError::DuplicateOrdinal(*found));
            }
            return Err(DomainError::OrdinalGap {
                expected,
                found: *found,
            });
        }
        Ok(())
    }

    /// Sort segments by ordinal; directory listing order is never trusted
    pub fn sort_encoded(mut segments: Vec<EncodedSegment>) -> Vec<EncodedSegment> {
        segments.sort_by_key(|segment| segment.ordinal);
        segments
    }

    /// Every segment must have exactly one encoded counterpart with the same ordinal
    pub fn check_one_to_one(
        segments: &[Segment],
        encoded: &[EncodedSegment],
    ) -> Result<(), DomainError> {
        let mut wanted: Vec<u32> = segments.iter().map(|s| s.ordinal).collect();
        let mut got: Vec<u32> = encoded.iter().map(|s| s.ordinal).collect();
        wanted.sort_unstable();
        got.sort_unstable();

        if wanted != got {
            return Err(DomainError::BadArgs(format!(
                "Encoded segments {:?} do not match source segments {:?}",
                got, wanted
            )));
        }
        Ok(())
    }
}

/// Rules for the concat demuxer manifest
pub struct ConcatManifest;

impl ConcatManifest {
    /// Quote a path for a `file '...'` line, escaping embedded single quotes
    pub fn quote(path: &Path) -> String {
        format!("'{}'", path.to_string_lossy().replace('\'', "'\\''"))
    }

    /// Manifest body in ordinal order
    pub fn render(segments: &[EncodedSegment]) -> String {
        let mut ordered: Vec<&EncodedSegment> = segments.iter().collect();
        ordered.sort_by_key(|segment| segment.ordinal);

        ordered
            .iter()
            .map(|segment| format!("file {}\n", Self::quote(&segment.path)))
            .collect()
    }
}

/// Output naming rules
pub struct OutputNaming;

impl OutputNaming {
    /// Final output keeps the source's stem and container extension
    pub fn output_file_name(stem: &str, extension: &str) -> String {
        if extension.is_empty() {
            format!("{}.{}", stem, INTERMEDIATE_EXTENSION)
        } else {
            format!("{}.{}", stem, extension)
        }
    }

    /// Containers where `+faststart` applies
    pub fn supports_faststart(extension: &str) -> bool {
        matches!(
            extension.to_lowercase().as_str(),
            "mp4" | "m4v" | "mov"
        )
    }
}
