// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotator settings.
//!
//! Every field has a default, so a config file only needs the values it
//! changes. Files are read as YAML or JSON depending on their extension.

use crate::models::annotation::Category;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Releases closer than this to the start point (frame pixels) are
    /// treated as plain clicks and create no arrow.
    pub min_arrow_length: f64,
    /// Degrees per rotate key press.
    pub rotation_step_deg: f64,
    /// Selection tolerance around an arrow's start and head (frame pixels).
    pub hit_radius: f64,
    /// Delay between frames while playing.
    pub playback_delay_ms: u64,
    /// Category active when a session opens.
    pub default_category: Category,
    /// Undo steps kept per session.
    pub history_limit: usize,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            min_arrow_length: 20.0,
            rotation_step_deg: 1.0,
            hit_radius: 8.0,
            playback_delay_ms: 60,
            default_category: Category::Blue,
            history_limit: 50,
        }
    }
}

impl AnnotatorConfig {
    /// Load settings from a YAML or JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let extension = path.extension().and_then(|s| s.to_str());
        let config: Self = match extension {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)
                .with_context(|| format!("parsing YAML config {}", path.display()))?,
            Some("json") => serde_json::from_str(&text)
                .with_context(|| format!("parsing JSON config {}", path.display()))?,
            _ => bail!("Unsupported config extension: {:?}", extension),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.min_arrow_length.is_nan() || self.min_arrow_length < 0.0 {
            bail!("min_arrow_length must be >= 0, got {}", self.min_arrow_length);
        }
        if self.hit_radius.is_nan() || self.hit_radius < 0.0 {
            bail!("hit_radius must be >= 0, got {}", self.hit_radius);
        }
        if !self.rotation_step_deg.is_finite() {
            bail!("rotation_step_deg must be finite");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "rotation_step_deg: 5.0\ndefault_category: green").unwrap();

        let config = AnnotatorConfig::load(file.path()).unwrap();

        assert_eq!(config.rotation_step_deg, 5.0);
        assert_eq!(config.default_category, Category::Green);
        assert_eq!(config.min_arrow_length, 20.0);
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn test_json_config() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"hit_radius": 12.5}}"#).unwrap();

        let config = AnnotatorConfig::load(file.path()).unwrap();

        assert_eq!(config.hit_radius, 12.5);
    }

    #[test]
    fn test_rejects_negative_length() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "min_arrow_length: -1").unwrap();

        assert!(AnnotatorConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        assert!(AnnotatorConfig::load(file.path()).is_err());
    }
}
