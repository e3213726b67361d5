//! Base-directory layout and input discovery

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::domain::model::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};

/// The six directories the pipeline works in, all under one base directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub base: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub working: PathBuf,
    pub segments: PathBuf,
    pub encoded: PathBuf,
    pub logs: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            input: base.join("input"),
            output: base.join("output"),
            working: base.join("working"),
            segments: base.join("segments"),
            encoded: base.join("encoded_segments"),
            logs: base.join("logs"),
            base,
        }
    }

    fn all(&self) -> [&Path; 6] {
        [
            &self.input,
            &self.output,
            &self.working,
            &self.segments,
            &self.encoded,
            &self.logs,
        ]
    }

    /// Per-file scratch directories; owned by exactly one file at a time
    pub fn scratch(&self) -> [&Path; 3] {
        [&self.segments, &self.encoded, &self.working]
    }

    /// Create every directory that does not exist yet
    pub fn create_all(&self) -> PipelineResult<()> {
        for dir in self.all() {
            std::fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
        }
        Ok(())
    }

    /// Remove and recreate the scratch directories
    pub fn reset_scratch(&self) -> PipelineResult<()> {
        for dir in self.scratch() {
            if dir.exists() {
                std::fs::remove_dir_all(dir).map_err(|source| PipelineError::Cleanup {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
            std::fs::create_dir_all(dir).map_err(|source| PipelineError::Cleanup {
                path: dir.to_path_buf(),
                source,
            })?;
            debug!("Reset {}", dir.display());
        }
        Ok(())
    }

    /// Regular files directly under input/, filtered by extension and sorted by name
    pub fn discover_inputs(&self, config: &PipelineConfig) -> PipelineResult<Vec<PathBuf>> {
        let mut inputs = Vec::new();
        for entry in WalkDir::new(&self.input).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.input).to_path_buf();
                PipelineError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if config.accepts_extension(path.extension().and_then(|e| e.to_str())) {
                inputs.push(path);
            } else {
                debug!("Skipping unsupported input {}", path.display());
            }
        }

        if inputs.is_empty() {
            return Err(PipelineError::NoInputFiles {
                dir: self.input.clone(),
            });
        }
        inputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(inputs)
    }

    /// Final output location for a source stem and extension
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output.join(file_name)
    }
}
