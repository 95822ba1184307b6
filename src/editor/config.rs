use log::warn;
use serde::{Deserialize, Serialize};

use crate::types::Rect;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Max distance, in UI pixels, between a released block and an anchor.
    pub snap_distance: f64,
    pub block_width: f64,
    pub block_height: f64,
    /// Area that accepts dropped blocks; releasing elsewhere deletes the block.
    pub surface: Rect,
    /// Host frame interval for the player, in milliseconds.
    pub tick_ms: u64,
    /// Seed for `pick random`; each sprite offsets it by its index.
    pub seed: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            snap_distance: 25.0,
            block_width: 155.0,
            block_height: 36.0,
            // Between the 260 px palette and the 480 px stage of a 1280x720 window.
            surface: Rect { x: 260.0, y: 66.0, w: 540.0, h: 654.0 },
            tick_ms: 33,
            seed: 0x5eed,
        }
    }
}

impl EditorConfig {
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match std::fs::read_to_string(&config_path) {
            Ok(json) => Self::parse(&json),
            Err(_) => Self::default(),
        }
    }

    /// Parse a config file, falling back to defaults on invalid JSON. Missing
    /// keys take their default values.
    pub fn parse(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(config) => config,
            Err(e) => {
                warn!("invalid editor config ({e}), using defaults");
                Self::default()
            }
        }
    }

    fn config_path() -> std::path::PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        let mut path = std::path::PathBuf::from(home);
        path.push(".config");
        path.push("block-stage");
        path.push("config.json");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = EditorConfig::parse(r#"{"snap_distance": 40}"#);
        assert_eq!(config.snap_distance, 40.0);
        assert_eq!(config.block_height, 36.0);
    }

    #[test]
    fn invalid_config_falls_back() {
        assert_eq!(EditorConfig::parse("{ nope"), EditorConfig::default());
    }
}
