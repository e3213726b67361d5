//! Post-stage artifact validation
//!
//! Every stage passes its output through here before the next stage may use
//! it. Validation only reads: it never repairs, moves or deletes anything.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::domain::model::{MediaMetadata, Stage};
use crate::error::{PipelineError, PipelineResult, ValidationFailure};
use crate::ports::ProbePort;

/// Existence, size-floor and probe gate for intermediate and final artifacts
pub struct Validator {
    probe: Arc<dyn ProbePort>,
    min_file_size: u64,
}

impl Validator {
    pub fn new(probe: Arc<dyn ProbePort>, min_file_size: u64) -> Self {
        Self {
            probe,
            min_file_size,
        }
    }

    fn failure(stage: Stage, path: &Path, reason: ValidationFailure) -> PipelineError {
        PipelineError::Validation {
            stage,
            path: path.to_path_buf(),
            reason,
        }
    }

    /// Check one artifact and return what the probe saw in it
    pub async fn validate(&self, path: &Path, stage: Stage) -> PipelineResult<MediaMetadata> {
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Err(Self::failure(stage, path, ValidationFailure::Missing)),
        };

        if size < self.min_file_size {
            return Err(Self::failure(
                stage,
                path,
                ValidationFailure::Undersized {
                    size,
                    min: self.min_file_size,
                },
            ));
        }

        let metadata = self.probe.probe(path).await.map_err(|e| {
            Self::failure(stage, path, ValidationFailure::Unparseable(e.to_string()))
        })?;

        debug!("[{}] {} is valid ({} bytes)", stage, path.display(), size);
        Ok(metadata)
    }

    /// Validate every artifact, then require exactly `expected` of them
    pub async fn validate_set(
        &self,
        paths: &[PathBuf],
        stage: Stage,
        expected: usize,
    ) -> PipelineResult<Vec<MediaMetadata>> {
        let mut probed = Vec::with_capacity(paths.len());
        for path in paths {
            probed.push(self.validate(path, stage).await?);
        }

        if probed.len() != expected {
            let location = paths
                .first()
                .and_then(|p| p.parent())
                .map(Path::to_path_buf)
                .unwrap_or_default();
            return Err(Self::failure(
                stage,
                &location,
                ValidationFailure::CountMismatch {
                    expected,
                    found: probed.len(),
                },
            ));
        }
        Ok(probed)
    }

    /// Artifact must carry at least one video stream
    pub fn require_video(stage: Stage, metadata: &MediaMetadata) -> PipelineResult<()> {
        if metadata.has_video() {
            return Ok(());
        }
        Err(Self::failure(
            stage,
            &metadata.path,
            ValidationFailure::StreamCount {
                kind: "video",
                expected: 1,
                found: 0,
            },
        ))
    }

    /// Artifact must carry exactly `expected` audio streams
    pub fn require_audio_count(
        stage: Stage,
        metadata: &MediaMetadata,
        expected: usize,
    ) -> PipelineResult<()> {
        let found = metadata.audio_track_count();
        if found == expected {
            return Ok(());
        }
        Err(Self::failure(
            stage,
            &metadata.path,
            ValidationFailure::StreamCount {
                kind: "audio",
                expected,
                found,
            },
        ))
    }
}
