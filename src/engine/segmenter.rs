//! Stream-copy segmentation of the source video

use std::path::Path;

use tracing::info;

use crate::domain::model::*;
use crate::domain::rules::SegmentRules;
use crate::engine::{list_files, StageRuntime};
use crate::error::{PipelineError, PipelineResult};
use crate::ports::*;
use crate::probe::Validator;

/// Splits the first video stream into fixed-duration, independently decodable chunks
pub struct Segmenter {
    runtime: StageRuntime,
    segment_duration_secs: u64,
}

impl Segmenter {
    pub fn new(runtime: StageRuntime, segment_duration_secs: u64) -> Self {
        Self {
            runtime,
            segment_duration_secs,
        }
    }

    /// Video only; audio is transcoded from the source separately
    pub fn invocation(&self, input: &Path, output_dir: &Path) -> ToolInvocation {
        ToolInvocation::builder(Tool::Ffmpeg, format!("Segmenting {}", input.display()))
            .flag("-hide_banner")
            .flag("-y")
            .input(input)
            .opt("-map", "0:v:0")
            .opt("-c:v", "copy")
            .flag("-an")
            .flag("-sn")
            .flag("-dn")
            .opt("-f", "segment")
            .opt("-segment_time", self.segment_duration_secs.to_string())
            .opt("-reset_timestamps", "1")
            .path(output_dir.join(segment_file_pattern()))
            .timeout(self.runtime.timeout)
            .build()
    }

    /// Split `input` into `output_dir`, returning the validated segments in ordinal order
    pub async fn segment(&self, input: &Path, output_dir: &Path) -> PipelineResult<Vec<Segment>> {
        self.run(input, output_dir)
            .await
            .map_err(|cause| PipelineError::Segmentation {
                path: input.to_path_buf(),
                cause: Box::new(cause),
            })
    }

    async fn run(&self, input: &Path, output_dir: &Path) -> PipelineResult<Vec<Segment>> {
        info!(
            "Segmenting into {}s chunks",
            self.segment_duration_secs
        );
        let invocation = self.invocation(input, output_dir);
        self.runtime
            .tools
            .run(&invocation)
            .await?
            .ensure_success(&invocation)?;

        // The directory is reset before segmenting, so every file here is ours
        let mut segments = Vec::new();
        for path in list_files(output_dir, INTERMEDIATE_EXTENSION).await? {
            segments.push(Segment::from_path(&path)?);
        }
        if segments.is_empty() {
            return Err(PipelineError::NoSegments {
                dir: output_dir.to_path_buf(),
            });
        }

        segments.sort_by_key(|s| s.ordinal);
        let ordinals: Vec<u32> = segments.iter().map(|s| s.ordinal).collect();
        SegmentRules::check_contiguous(&ordinals)?;

        let paths: Vec<_> = segments.iter().map(|s| s.path.clone()).collect();
        let probed = self
            .runtime
            .validator
            .validate_set(&paths, Stage::Segment, segments.len())
            .await?;
        for metadata in &probed {
            Validator::require_video(Stage::Segment, metadata)?;
        }

        info!("Created {} segments", segments.len());
        Ok(segments)
    }
}
