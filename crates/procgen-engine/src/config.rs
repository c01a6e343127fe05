//! Engine configuration storage
//!
//! Defaults for new procedures and sessions, stored as camelCase JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::evaluation::DEFAULT_MAX_DEPTH;
use crate::undo::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_UNDO_CAPACITY};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Snapshots kept by the undo ring
    pub undo_capacity: usize,
    /// Preview threshold (≤ 0 shows every level)
    pub view_level: i32,
    /// Render threshold (≤ 0 renders every level)
    pub rendering_level: i32,
    /// zstd level used for undo snapshots
    pub snapshot_compression_level: i32,
    /// Nesting limit of an evaluation pass
    pub max_evaluation_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            undo_capacity: DEFAULT_UNDO_CAPACITY,
            view_level: 0,
            rendering_level: 0,
            snapshot_compression_level: DEFAULT_COMPRESSION_LEVEL,
            max_evaluation_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Load configuration from disk; a missing file yields defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Save configuration to disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        log::info!("Configuration saved to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = EngineConfig::from_json_str(r#"{"viewLevel": 2, "undoCapacity": 8}"#).unwrap();
        assert_eq!(config.view_level, 2);
        assert_eq!(config.undo_capacity, 8);
        assert_eq!(config.max_evaluation_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(EngineConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("engine.json");

        assert_eq!(EngineConfig::load(&path).unwrap(), EngineConfig::default());

        let config = EngineConfig {
            rendering_level: 3,
            snapshot_compression_level: 9,
            ..EngineConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }
}
