//! Board configuration.
//!
//! All tunables of the interaction controllers and the persistence layer live
//! here so a host can override them from a JSON file.

use kurbo::Vec2;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Smallest allowed zoom scale.
pub const MIN_SCALE: f64 = 0.3;
/// Largest allowed zoom scale.
pub const MAX_SCALE: f64 = 3.3333;
/// Base of the exponential zoom curve (one "step").
pub const ZOOM_BASE: f64 = 1.08;
/// Default pan bias so the canvas origin does not sit at a viewport edge.
pub const INITIAL_OFFSET: Vec2 = Vec2::new(-10000.0, -10000.0);
/// Default autosave coalescing window.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
/// Default number of undo states to keep.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Tunables for a board instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Minimum zoom scale.
    pub min_scale: f64,
    /// Maximum zoom scale.
    pub max_scale: f64,
    /// Zoom base used for wheel steps and the zoom buttons.
    pub zoom_base: f64,
    /// Constant pan bias applied on top of the user offset.
    pub initial_offset: Vec2,
    /// Snap grid size in canvas units.
    pub grid_size: f64,
    /// Autosave debounce window in milliseconds.
    pub autosave_debounce_ms: u64,
    /// Number of undo snapshots kept.
    pub history_limit: usize,
    /// Minimum side length of a resized image, in canvas units.
    pub image_min_size: f64,
    /// Whether the structured rich-text editor is available.
    /// Selects the save format (3.0 when true, 2.0 otherwise).
    pub structured_text_editor: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            zoom_base: ZOOM_BASE,
            initial_offset: INITIAL_OFFSET,
            grid_size: crate::snap::GRID_SIZE,
            autosave_debounce_ms: DEFAULT_DEBOUNCE_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            image_min_size: crate::groups::IMAGE_MIN_SIZE,
            structured_text_editor: true,
        }
    }
}

impl BoardConfig {
    /// Parse a configuration from JSON text. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Check the invariants the controllers rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_scale > 0.0) {
            return Err(ConfigError::Invalid("min_scale must be positive".into()));
        }
        if self.min_scale > self.max_scale {
            return Err(ConfigError::Invalid(format!(
                "min_scale {} exceeds max_scale {}",
                self.min_scale, self.max_scale
            )));
        }
        if !(self.zoom_base > 1.0) {
            return Err(ConfigError::Invalid("zoom_base must be greater than 1".into()));
        }
        if !(self.grid_size > 0.0) {
            return Err(ConfigError::Invalid("grid_size must be positive".into()));
        }
        if !(self.image_min_size > 0.0) {
            return Err(ConfigError::Invalid("image_min_size must be positive".into()));
        }
        Ok(())
    }

    /// The autosave window as a duration.
    pub fn autosave_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.autosave_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BoardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid_size, 20.0);
        assert_eq!(config.autosave_debounce_ms, 500);
        assert_eq!(config.initial_offset, Vec2::new(-10000.0, -10000.0));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = BoardConfig::from_json(r#"{ "grid_size": 10, "structured_text_editor": false }"#)
            .unwrap();
        assert_eq!(config.grid_size, 10.0);
        assert!(!config.structured_text_editor);
        assert_eq!(config.min_scale, MIN_SCALE);
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let result = BoardConfig::from_json(r#"{ "min_scale": 4.0, "max_scale": 1.0 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(BoardConfig::from_json("{"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        std::fs::write(&path, r#"{ "history_limit": 3 }"#).unwrap();
        let config = BoardConfig::load(&path).unwrap();
        assert_eq!(config.history_limit, 3);
    }
}
