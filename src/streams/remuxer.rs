//! Final remux of the encoded video with the transcoded audio
//!
//! Chapters and subtitles come from the source file, which is only added
//! as an input when it actually has either.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::model::*;
use crate::domain::rules::OutputNaming;
use crate::engine::StageRuntime;
use crate::error::{PipelineError, PipelineResult, ValidationFailure};
use crate::ports::*;
use crate::probe::Validator;

pub struct Remuxer {
    runtime: StageRuntime,
    settings: RemuxSettings,
}

impl Remuxer {
    pub fn new(runtime: StageRuntime, settings: RemuxSettings) -> Self {
        Self { runtime, settings }
    }

    /// Build the join: `[video, audio-0, ..., audio-k-1, source?]`
    pub fn invocation(&self, context: &FileContext, video: &Path, audio: &[PathBuf]) -> ToolInvocation {
        let metadata = &context.metadata;
        let carry_source = metadata.has_chapters || metadata.has_subtitles();
        let source_input = audio.len() + 1;

        let mut builder = ToolInvocation::builder(
            Tool::Ffmpeg,
            format!("Remuxing {}", context.output_path.display()),
        )
        .flag("-hide_banner")
        .flag("-y")
        .input(video);

        for path in audio {
            builder = builder.input(path);
        }
        if carry_source {
            builder = builder.input(&context.source);
        }

        builder = builder.opt("-map", "0:v");
        for input in 1..=audio.len() {
            let selector = match self.settings.audio_map_policy {
                AudioMapPolicy::Optional => format!("{}:a?", input),
                AudioMapPolicy::Required => format!("{}:a", input),
            };
            builder = builder.opt("-map", selector);
        }
        if metadata.has_subtitles() {
            builder = builder.opt("-map", format!("{}:s?", source_input));
        }

        builder = if metadata.has_chapters {
            builder.opt("-map_chapters", source_input.to_string())
        } else {
            builder.opt("-map_chapters", "-1")
        };

        builder = builder.opt("-c", "copy");
        if self.settings.faststart && OutputNaming::supports_faststart(&context.extension) {
            builder = builder.opt("-movflags", "+faststart");
        }

        builder
            .path(&context.output_path)
            .timeout(self.runtime.timeout)
            .build()
    }

    /// Join everything into the final output and check its stream counts
    pub async fn remux(
        &self,
        context: &FileContext,
        video: &Path,
        audio: &[PathBuf],
    ) -> PipelineResult<MediaMetadata> {
        self.run(context, video, audio)
            .await
            .map_err(|cause| PipelineError::Remux {
                output: context.output_path.clone(),
                cause: Box::new(cause),
            })
    }

    async fn run(
        &self,
        context: &FileContext,
        video: &Path,
        audio: &[PathBuf],
    ) -> PipelineResult<MediaMetadata> {
        for path in std::iter::once(video).chain(audio.iter().map(PathBuf::as_path)) {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Err(PipelineError::Validation {
                    stage: Stage::Remux,
                    path: path.to_path_buf(),
                    reason: ValidationFailure::Missing,
                });
            }
        }

        let invocation = self.invocation(context, video, audio);
        self.runtime
            .tools
            .run(&invocation)
            .await?
            .ensure_success(&invocation)?;

        let output = &context.output_path;
        let metadata = self.runtime.validator.validate(output, Stage::Remux).await?;
        Validator::require_video(Stage::Remux, &metadata)?;
        Validator::require_audio_count(
            Stage::Remux,
            &metadata,
            context.metadata.audio_track_count(),
        )?;
        if metadata.subtitle_streams != context.metadata.subtitle_streams {
            return Err(PipelineError::Validation {
                stage: Stage::Remux,
                path: output.clone(),
                reason: ValidationFailure::StreamCount {
                    kind: "subtitle",
                    expected: context.metadata.subtitle_streams,
                    found: metadata.subtitle_streams,
                },
            });
        }

        info!(
            "Wrote {} with {} audio track(s)",
            output.display(),
            metadata.audio_track_count()
        );
        Ok(metadata)
    }
}
