//! Video stages: segmentation, per-segment encoding and concatenation

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{PipelineError, PipelineResult};
use crate::ports::ToolPort;
use crate::probe::Validator;

pub mod chunk_encoder;
pub mod concat;
pub mod segmenter;

pub use chunk_encoder::ChunkEncoder;
pub use concat::Concatenator;
pub use segmenter::Segmenter;

/// What every stage needs to run tools and check their output
#[derive(Clone)]
pub struct StageRuntime {
    pub tools: Arc<dyn ToolPort>,
    pub validator: Arc<Validator>,
    /// Applied to each external tool call
    pub timeout: Option<Duration>,
}

impl StageRuntime {
    pub fn new(
        tools: Arc<dyn ToolPort>,
        validator: Arc<Validator>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            tools,
            validator,
            timeout,
        }
    }
}

/// Regular files in `dir` with the given extension, unsorted
pub(crate) async fn list_files(dir: &Path, extension: &str) -> PipelineResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| PipelineError::io(dir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PipelineError::io(dir, e))?
    {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

/// Size of a file, 0 when it cannot be read
pub(crate) async fn file_size(path: &Path) -> u64 {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len())
        .unwrap_or(0)
}
