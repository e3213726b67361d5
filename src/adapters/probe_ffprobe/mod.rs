//! FFprobe adapter for media file probing
//!
//! Runs `ffprobe -print_format json` through the tool port and maps the
//! report onto `MediaMetadata`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::domain::model::*;
use crate::error::{PipelineError, PipelineResult};
use crate::ports::*;

/// Channel count assumed when ffprobe does not report one
const DEFAULT_CHANNELS: u32 = 2;

#[derive(Debug, Deserialize)]
struct FfprobeReport {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    chapters: Vec<serde_json::Value>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    channels: Option<u32>,
    #[serde(default)]
    disposition: FfprobeDisposition,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

/// FFprobe-based probe adapter
pub struct FfprobeAdapter {
    tools: Arc<dyn ToolPort>,
    timeout: Option<Duration>,
}

impl FfprobeAdapter {
    /// Create new FFprobe adapter
    pub fn new(tools: Arc<dyn ToolPort>, timeout: Option<Duration>) -> Self {
        Self { tools, timeout }
    }

    fn invocation(&self, path: &Path) -> ToolInvocation {
        ToolInvocation::builder(Tool::Ffprobe, format!("Probing {}", path.display()))
            .opt("-v", "error")
            .opt("-print_format", "json")
            .flag("-show_streams")
            .flag("-show_chapters")
            .flag("-show_format")
            .path(path)
            .timeout(self.timeout)
            .build()
    }

    /// Map an ffprobe JSON report onto `MediaMetadata`
    pub fn parse_report(path: &Path, json: &str) -> PipelineResult<MediaMetadata> {
        let report: FfprobeReport =
            serde_json::from_str(json).map_err(|e| PipelineError::Probe {
                path: path.to_path_buf(),
                reason: format!("unparseable ffprobe output: {}", e),
            })?;

        if report.streams.is_empty() {
            return Err(PipelineError::Probe {
                path: path.to_path_buf(),
                reason: "file has no streams".to_string(),
            });
        }

        let mut video_streams = 0;
        let mut subtitle_streams = 0;
        let mut audio_tracks = Vec::new();

        for stream in &report.streams {
            match stream.codec_type.as_deref() {
                // Cover art is muxed as a video stream but is not one
                Some("video") if stream.disposition.attached_pic == 0 => video_streams += 1,
                Some("audio") => {
                    let channels = stream
                        .channels
                        .filter(|c| *c > 0)
                        .unwrap_or(DEFAULT_CHANNELS);
                    audio_tracks.push(AudioTrack {
                        index: audio_tracks.len(),
                        channels,
                    });
                }
                Some("subtitle") => subtitle_streams += 1,
                _ => {}
            }
        }

        let (container, duration_secs) = match report.format {
            Some(format) => (
                format.format_name,
                format.duration.and_then(|d| d.trim().parse::<f64>().ok()),
            ),
            None => (None, None),
        };

        Ok(MediaMetadata {
            path: path.to_path_buf(),
            video_streams,
            audio_tracks,
            subtitle_streams,
            has_chapters: !report.chapters.is_empty(),
            duration_secs,
            container,
        })
    }
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe(&self, path: &Path) -> PipelineResult<MediaMetadata> {
        let invocation = self.invocation(path);
        let output = self.tools.run(&invocation).await?;

        if !output.success() {
            return Err(PipelineError::Probe {
                path: path.to_path_buf(),
                reason: format!(
                    "ffprobe exited with {:?}: {}",
                    output.code,
                    output.stderr.trim()
                ),
            });
        }

        let metadata = Self::parse_report(path, &output.stdout)?;
        debug!(
            "Probed {}: {} video, {} audio, {} subtitle, chapters: {}",
            path.display(),
            metadata.video_streams,
            metadata.audio_track_count(),
            metadata.subtitle_streams,
            metadata.has_chapters
        );
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE_REPORT: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "hevc"},
            {"index": 1, "codec_type": "audio", "codec_name": "aac", "channels": 2},
            {"index": 2, "codec_type": "audio", "codec_name": "ac3", "channels": 6},
            {"index": 3, "codec_type": "subtitle", "codec_name": "subrip"},
            {"index": 4, "codec_type": "video", "codec_name": "mjpeg", "disposition": {"attached_pic": 1}}
        ],
        "chapters": [{"id": 0, "start_time": "0.000000"}],
        "format": {"format_name": "matroska,webm", "duration": "300.040000"}
    }"#;

    #[test]
    fn test_parse_full_report() {
        let metadata = FfprobeAdapter::parse_report(Path::new("in.mkv"), SOURCE_REPORT).unwrap();
        assert_eq!(metadata.video_streams, 1);
        assert_eq!(
            metadata.audio_tracks,
            vec![
                AudioTrack { index: 0, channels: 2 },
                AudioTrack { index: 1, channels: 6 }
            ]
        );
        assert_eq!(metadata.subtitle_streams, 1);
        assert!(metadata.has_chapters);
        assert_eq!(metadata.duration_secs, Some(300.04));
        assert_eq!(metadata.container.as_deref(), Some("matroska,webm"));
    }

    #[test]
    fn test_missing_channels_default_to_stereo() {
        let json = r#"{"streams": [{"codec_type": "audio"}, {"codec_type": "audio", "channels": 0}]}"#;
        let metadata = FfprobeAdapter::parse_report(Path::new("a.mkv"), json).unwrap();
        assert!(metadata.audio_tracks.iter().all(|t| t.channels == 2));
        assert_eq!(metadata.audio_tracks[1].index, 1);
        assert!(!metadata.has_chapters);
        assert_eq!(metadata.duration_secs, None);
    }

    #[test]
    fn test_zero_streams_is_a_probe_error() {
        let err = FfprobeAdapter::parse_report(Path::new("empty.mkv"), r#"{"streams": []}"#)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Probe { .. }));
    }

    #[test]
    fn test_garbage_is_a_probe_error() {
        let err = FfprobeAdapter::parse_report(Path::new("x.mkv"), "not json").unwrap_err();
        assert!(matches!(err, PipelineError::Probe { .. }));
    }
}
