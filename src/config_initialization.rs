//! Configuration hierarchy: CLI > environment > config file > defaults
//!
//! Environment variables reach this module through clap's `env` support, so
//! by the time `PipelineArgs` is built the first two layers are already merged.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::adapters::TomlConfigAdapter;
use crate::cli::PipelineArgs;
use crate::domain::model::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};

/// Resolve the effective configuration for this invocation
pub fn resolve_config(args: &PipelineArgs) -> PipelineResult<PipelineConfig> {
    let lookup_dir = args.base_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut config = TomlConfigAdapter::load_or_default(args.config.as_deref(), &lookup_dir)?;

    apply_overrides(&mut config, args);
    config.base_dir = absolute(&config.base_dir)?;
    config.validate()?;

    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

/// Copy every option given on the command line (or via env) into `config`
pub fn apply_overrides(config: &mut PipelineConfig, args: &PipelineArgs) {
    if let Some(base_dir) = &args.base_dir {
        config.base_dir = base_dir.clone();
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(min_vmaf) = args.min_vmaf {
        config.encoder.min_vmaf = min_vmaf;
    }
    if let Some(preset) = args.preset {
        config.encoder.preset = preset;
    }
    if let Some(seconds) = args.segment_duration {
        config.segment_duration_secs = seconds;
    }
    if let Some(seconds) = args.stage_timeout {
        config.stage_timeout_secs = Some(seconds);
    }
    if let Some(policy) = args.audio_map_policy {
        config.remux.audio_map_policy = policy;
    }
}

/// Tool arguments and concat manifests need paths that do not depend on the cwd
fn absolute(path: &Path) -> PipelineResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| PipelineError::io(path, e))?;
    Ok(cwd.join(path))
}
