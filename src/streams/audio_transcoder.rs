//! Per-track audio transcoding from the source file

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::model::*;
use crate::domain::rules::{AudioBitratePolicy, CHANNEL_LAYOUT_FILTER};
use crate::engine::StageRuntime;
use crate::error::{PipelineError, PipelineResult};
use crate::ports::*;
use crate::probe::Validator;

/// Transcodes each source audio stream into its own intermediate file
pub struct AudioTranscoder {
    runtime: StageRuntime,
    settings: AudioSettings,
}

impl AudioTranscoder {
    pub fn new(runtime: StageRuntime, settings: AudioSettings) -> Self {
        Self { runtime, settings }
    }

    pub fn invocation(&self, source: &Path, track: &AudioTrack, output: &Path) -> ToolInvocation {
        ToolInvocation::builder(
            Tool::Ffmpeg,
            format!(
                "Transcoding audio track {} ({} channels)",
                track.index, track.channels
            ),
        )
        .flag("-hide_banner")
        .flag("-y")
        .input(source)
        .opt("-map", format!("0:a:{}", track.index))
        .opt("-c:a", self.settings.codec.as_str())
        .opt("-af", CHANNEL_LAYOUT_FILTER)
        .opt("-application", "audio")
        .opt("-vbr", "on")
        .opt("-compression_level", "10")
        .opt("-frame_duration", "20")
        .opt(
            "-b:a",
            AudioBitratePolicy::bitrate_arg(track.channels, &self.settings),
        )
        .opt("-avoid_negative_ts", "make_zero")
        .path(output)
        .timeout(self.runtime.timeout)
        .build()
    }

    /// Transcode one track to `output`; the result must hold exactly one audio stream
    pub async fn transcode_track(
        &self,
        source: &Path,
        track: &AudioTrack,
        output: &Path,
    ) -> PipelineResult<PathBuf> {
        self.run_one(source, track, output)
            .await
            .map_err(|cause| PipelineError::AudioEncode {
                track: track.index,
                cause: Box::new(cause),
            })
    }

    async fn run_one(
        &self,
        source: &Path,
        track: &AudioTrack,
        output: &Path,
    ) -> PipelineResult<PathBuf> {
        let invocation = self.invocation(source, track, output);
        self.runtime
            .tools
            .run(&invocation)
            .await?
            .ensure_success(&invocation)?;

        let metadata = self
            .runtime
            .validator
            .validate(output, Stage::AudioTranscode)
            .await?;
        Validator::require_audio_count(Stage::AudioTranscode, &metadata, 1)?;
        Ok(output.to_path_buf())
    }

    /// Transcode every track of the file, in index order.
    ///
    /// The first failing track aborts the rest; no partial set is returned.
    pub async fn transcode_all(&self, context: &FileContext) -> PipelineResult<Vec<PathBuf>> {
        let tracks = &context.metadata.audio_tracks;
        if tracks.is_empty() {
            warn!("Source has no audio tracks");
            return Ok(Vec::new());
        }

        let mut artifacts = Vec::with_capacity(tracks.len());
        for track in tracks {
            let output = context.audio_path(track);
            info!(
                "Audio track {}: {} channels -> {} {}",
                track.index,
                track.channels,
                self.settings.codec,
                AudioBitratePolicy::bitrate_arg(track.channels, &self.settings)
            );
            artifacts.push(
                self.transcode_track(&context.source, track, &output)
                    .await?,
            );
        }

        self.runtime
            .validator
            .validate_set(&artifacts, Stage::AudioTranscode, tracks.len())
            .await?;
        info!("Transcoded {} audio track(s)", artifacts.len());
        Ok(artifacts)
    }
}
