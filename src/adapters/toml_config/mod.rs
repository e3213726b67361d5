// TOML config adapter - Pipeline configuration stored as TOML files

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::errors::DomainError;
use crate::domain::model::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};

/// Config file looked up in the base directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "chunkenc.toml";

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Default config location for a base directory
    pub fn default_path(base_dir: &Path) -> PathBuf {
        base_dir.join(DEFAULT_CONFIG_FILE)
    }

    /// Parse a config document; missing keys take their defaults
    pub fn parse(content: &str) -> Result<PipelineConfig, DomainError> {
        toml::from_str(content)
            .map_err(|e| DomainError::InvalidConfig(format!("Failed to parse TOML config: {}", e)))
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> PipelineResult<PipelineConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let config = Self::parse(&content)?;
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `explicit` if given, else the base directory's default file if it exists,
    /// else built-in defaults
    pub fn load_or_default(
        explicit: Option<&Path>,
        base_dir: &Path,
    ) -> PipelineResult<PipelineConfig> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let fallback = Self::default_path(base_dir);
        if fallback.is_file() {
            Self::load(&fallback)
        } else {
            debug!("No config file at {}, using defaults", fallback.display());
            Ok(PipelineConfig::default())
        }
    }

    /// Serialize a config to TOML
    pub fn render(config: &PipelineConfig) -> Result<String, DomainError> {
        toml::to_string_pretty(config)
            .map_err(|e| DomainError::InvalidConfig(format!("Failed to serialize config: {}", e)))
    }

    /// Write a config file unless one already exists; returns whether it was written
    pub fn write_if_missing(path: &Path, config: &PipelineConfig) -> PipelineResult<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        let content = Self::render(config)?;
        std::fs::write(path, content).map_err(|e| PipelineError::io(path, e))?;
        Ok(true)
    }
}
