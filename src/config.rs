//! Canvas configuration.
//!
//! Everything tunable that is not part of a universe profile: canvas size,
//! resource caps, energy constants and the frame rate. Stored as JSON; any
//! field missing from the file takes its default.

use crate::energy::EnergyConfig;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Canvas width in pixels.
    pub width: f32,
    /// Canvas height in pixels.
    pub height: f32,
    /// Hard particle cap; spawning past it drops the oldest particles.
    pub particle_cap: usize,
    /// Overrides the profile's initial particle count when set.
    pub particle_count: Option<usize>,
    /// Upper bound on time-dilation sub-steps per particle per frame.
    pub max_substeps: u32,
    /// Distance outside the canvas before an unbounded particle is recycled.
    pub recycle_margin: f32,
    /// Simulation rate in frames per second.
    pub frame_rate: f32,
    pub energy: EnergyConfig,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            particle_cap: 3000,
            particle_count: None,
            max_substeps: 4,
            recycle_margin: 200.0,
            frame_rate: 60.0,
            energy: EnergyConfig::default(),
        }
    }
}

impl CanvasConfig {
    /// Parse and validate a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Save as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(ConfigError::Invalid("canvas size must be positive"));
        }
        if self.particle_cap == 0 {
            return Err(ConfigError::Invalid("particle_cap must be at least 1"));
        }
        if self.max_substeps == 0 {
            return Err(ConfigError::Invalid("max_substeps must be at least 1"));
        }
        if !(self.frame_rate > 0.0) {
            return Err(ConfigError::Invalid("frame_rate must be positive"));
        }
        if self.recycle_margin < 0.0 {
            return Err(ConfigError::Invalid("recycle_margin must not be negative"));
        }
        if !(self.energy.max_energy > 0.0) {
            return Err(ConfigError::Invalid("energy.max_energy must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(CanvasConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = CanvasConfig::from_json(r#"{ "width": 640, "energy": { "rise_rate": 5 } }"#).unwrap();
        assert_eq!(config.width, 640.0);
        assert_eq!(config.height, 720.0);
        assert_eq!(config.energy.rise_rate, 5.0);
        assert_eq!(config.energy.max_energy, 1000.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = CanvasConfig::from_json(r#"{ "particle_cap": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = CanvasConfig::from_json(r#"{ "height": -1 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("celestial-config-{}.json", std::process::id()));
        let config = CanvasConfig {
            particle_cap: 123,
            ..CanvasConfig::default()
        };
        config.save(&path).unwrap();
        let loaded = CanvasConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }
}
