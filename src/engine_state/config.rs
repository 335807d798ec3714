//! # Engine Configuration
//!
//! Immutable settings shared by the terrain generator, the mesher and the
//! pipeline scheduler. A single `EngineConfig` is built at start-up, validated,
//! wrapped in an `Arc` and handed to every component that needs it.
//!
//! Configuration files are plain JSON. Every field is optional; missing fields
//! fall back to the defaults below.
//!
//! ```json
//! { "seed": 42, "render_radius": 6, "worker_count": 2 }
//! ```

use log::info;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// World and pipeline settings.
///
/// # Fields
/// - `seed`: World seed fed to every noise field
/// - `chunk_size`: Horizontal edge length of a chunk and the height of one section
/// - `section_count`: Number of cubic sections stacked in a chunk column
/// - `render_radius`: Chebyshev radius (in chunks) that gets lit and meshed
/// - `worker_count`: Size of the worker pool; `0` means stages only run through `tick()`
/// - `sea_level`: Highest y that is filled with water when density is too low for stone
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub seed: u32,
    pub chunk_size: usize,
    pub section_count: usize,
    pub render_radius: i32,
    pub worker_count: usize,
    pub sea_level: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 1_639_924_240,
            chunk_size: 32,
            section_count: 8,
            render_radius: 8,
            worker_count: 4,
            sea_level: 96,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a configuration from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Arguments
    /// * `path` - Location of a JSON configuration file
    ///
    /// # Returns
    /// The validated configuration, or the first I/O, parse or validation error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Checks the cross-field constraints the pipeline relies on.
    ///
    /// A chunk must be at least 16 voxels wide so that a level 15 light source
    /// can never reach past the 3x3 neighborhood a light pass works in.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size < 16 {
            return Err(ConfigError::Invalid(format!(
                "chunk_size must be at least 16, got {}",
                self.chunk_size
            )));
        }
        if self.section_count == 0 {
            return Err(ConfigError::Invalid(
                "section_count must be at least 1".to_string(),
            ));
        }
        if self.render_radius < 1 {
            return Err(ConfigError::Invalid(format!(
                "render_radius must be at least 1, got {}",
                self.render_radius
            )));
        }
        if self.sea_level < 0 || self.sea_level >= self.chunk_height() as i32 {
            return Err(ConfigError::Invalid(format!(
                "sea_level {} is outside the column height {}",
                self.sea_level,
                self.chunk_height()
            )));
        }
        Ok(())
    }

    /// Total height of a chunk column in voxels.
    pub fn chunk_height(&self) -> usize {
        self.chunk_size * self.section_count
    }

    /// Number of voxels stored per chunk.
    pub fn chunk_volume(&self) -> usize {
        self.chunk_size * self.chunk_size * self.chunk_height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_height(), 256);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "seed": 7, "worker_count": 0 }"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.worker_count, 0);
        assert_eq!(config.chunk_size, 32);
        assert_eq!(config.render_radius, 8);
    }

    #[test]
    fn rejects_small_chunks() {
        let result = EngineConfig::from_json_str(r#"{ "chunk_size": 8 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_sea_level_above_column() {
        let result =
            EngineConfig::from_json_str(r#"{ "chunk_size": 16, "section_count": 1, "sea_level": 40 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let result = EngineConfig::from_json_str("{ seed: ");
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = EngineConfig::load("/definitely/not/a/config.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
