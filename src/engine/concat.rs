//! Stream-copy join of encoded segments

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::model::*;
use crate::domain::rules::{ConcatManifest, SegmentRules};
use crate::engine::StageRuntime;
use crate::error::{PipelineError, PipelineResult};
use crate::ports::*;
use crate::probe::Validator;

/// Manifest file name inside the working directory
pub const MANIFEST_FILE: &str = "concat.txt";

pub struct Concatenator {
    runtime: StageRuntime,
}

impl Concatenator {
    pub fn new(runtime: StageRuntime) -> Self {
        Self { runtime }
    }

    pub fn invocation(&self, manifest: &Path, output: &Path) -> ToolInvocation {
        ToolInvocation::builder(Tool::Ffmpeg, "Concatenating encoded segments")
            .flag("-hide_banner")
            .flag("-y")
            .opt("-f", "concat")
            .opt("-safe", "0")
            .input(manifest)
            .opt("-c", "copy")
            .path(output)
            .timeout(self.runtime.timeout)
            .build()
    }

    /// Join `encoded` in ordinal order into `output`.
    ///
    /// `segments` is the source set; every one must have exactly one encoded
    /// counterpart before anything is joined.
    pub async fn concatenate(
        &self,
        segments: &[Segment],
        encoded: &[EncodedSegment],
        working_dir: &Path,
        output: &Path,
    ) -> PipelineResult<MediaMetadata> {
        self.run(segments, encoded, working_dir, output)
            .await
            .map_err(|cause| PipelineError::Concatenation {
                cause: Box::new(cause),
            })
    }

    async fn run(
        &self,
        segments: &[Segment],
        encoded: &[EncodedSegment],
        working_dir: &Path,
        output: &Path,
    ) -> PipelineResult<MediaMetadata> {
        SegmentRules::check_one_to_one(segments, encoded)?;

        // The concat demuxer resolves relative entries against the manifest's directory
        let mut absolute = Vec::with_capacity(encoded.len());
        for segment in encoded {
            let path: PathBuf = tokio::fs::canonicalize(&segment.path)
                .await
                .map_err(|e| PipelineError::io(&segment.path, e))?;
            absolute.push(EncodedSegment {
                ordinal: segment.ordinal,
                path,
            });
        }

        let manifest = working_dir.join(MANIFEST_FILE);
        tokio::fs::write(&manifest, ConcatManifest::render(&absolute))
            .await
            .map_err(|e| PipelineError::io(&manifest, e))?;
        debug!("Wrote {} entries to {}", absolute.len(), manifest.display());

        let invocation = self.invocation(&manifest, output);
        self.runtime
            .tools
            .run(&invocation)
            .await?
            .ensure_success(&invocation)?;

        tokio::fs::remove_file(&manifest)
            .await
            .map_err(|e| PipelineError::io(&manifest, e))?;

        let metadata = self
            .runtime
            .validator
            .validate(output, Stage::Concatenate)
            .await?;
        Validator::require_video(Stage::Concatenate, &metadata)?;

        info!(
            "Concatenated {} segments into {}",
            encoded.len(),
            output.display()
        );
        Ok(metadata)
    }
}
