use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "maskpaint.json";

/// Editor settings, read from a JSON file. Missing keys take their defaults.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// Longest side a loaded image may keep before it is downscaled.
    pub max_dimension: u32,
    pub history_capacity: usize,
    /// Initial brush diameter in device pixels.
    pub brush_size: f32,
    pub mask_opacity: f32,
    pub zoom_in_step: f32,
    pub zoom_out_step: f32,
    pub poll_interval_secs: u64,
    pub outbox_dir: PathBuf,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1920,
            history_capacity: 50,
            brush_size: 10.0,
            mask_opacity: 0.5,
            zoom_in_step: 1.2,
            zoom_out_step: 0.8,
            poll_interval_secs: 30,
            outbox_dir: PathBuf::from("outbox"),
        }
    }
}

impl EditorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the editor cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key, reason| Err(ConfigError::Invalid { key, reason });
        if self.max_dimension == 0 {
            return invalid("max_dimension", "must be at least 1");
        }
        if self.history_capacity == 0 {
            return invalid("history_capacity", "must be at least 1");
        }
        if !(self.brush_size.is_finite() && self.brush_size > 0.0) {
            return invalid("brush_size", "must be a positive number");
        }
        if !(0.0..=1.0).contains(&self.mask_opacity) {
            return invalid("mask_opacity", "must be between 0 and 1");
        }
        for (key, step) in [
            ("zoom_in_step", self.zoom_in_step),
            ("zoom_out_step", self.zoom_out_step),
        ] {
            if !(step.is_finite() && step > 0.0) {
                return invalid(key, "must be a positive number");
            }
        }
        if self.poll_interval_secs == 0 {
            return invalid("poll_interval_secs", "must be at least 1");
        }
        Ok(())
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let cfg: EditorConfig = serde_json::from_str(r#"{"brush_size": 24.0}"#).unwrap();
        assert_eq!(cfg.brush_size, 24.0);
        assert_eq!(cfg.max_dimension, 1920);
        assert_eq!(cfg.history_capacity, 50);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EditorConfig::load_or_default(&dir.path().join("nope.json")).unwrap();
        assert_eq!(cfg, EditorConfig::default());
    }

    #[test]
    fn test_broken_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maskpaint.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EditorConfig::load_or_default(&path),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maskpaint.json");
        fs::write(&path, r#"{"max_dimension": 0}"#).unwrap();
        assert!(matches!(
            EditorConfig::load(&path),
            Err(ConfigError::Invalid { key: "max_dimension", .. })
        ));

        for (json, bad_key) in [
            (r#"{"history_capacity": 0}"#, "history_capacity"),
            (r#"{"brush_size": -3.0}"#, "brush_size"),
            (r#"{"mask_opacity": 1.5}"#, "mask_opacity"),
            (r#"{"zoom_out_step": 0.0}"#, "zoom_out_step"),
            (r#"{"poll_interval_secs": 0}"#, "poll_interval_secs"),
        ] {
            let cfg: EditorConfig = serde_json::from_str(json).unwrap();
            match cfg.validate() {
                Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, bad_key),
                other => panic!("{json}: unexpected {other:?}"),
            }
        }
        assert!(EditorConfig::default().validate().is_ok());
    }
}
