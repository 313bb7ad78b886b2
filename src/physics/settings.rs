//! Physics configuration
//!
//! Global simulation settings plus the project-level file that persists them
//! together with the collision layer table.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::error::{PhysicsError, Result};
use super::layers::PhysicsLayerManager;

/// Default fixed sub-step length in seconds
pub const DEFAULT_FIXED_TIMESTEP: f32 = 1.0 / 60.0;

/// Longest frame delta fed into the sub-step accumulator
pub const DEFAULT_MAX_FRAME_DELTA: f32 = 0.0333;

/// Simulation settings shared by every physics scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsSettings {
    /// Length of one sub-step in seconds
    pub fixed_timestep: f32,
    /// World gravity in m/s²
    pub gravity: Vec3,
    /// Frame deltas above this are clamped before accumulation
    #[serde(default = "default_max_frame_delta")]
    pub max_frame_delta: f32,
}

fn default_max_frame_delta() -> f32 {
    DEFAULT_MAX_FRAME_DELTA
}

impl PhysicsSettings {
    /// Check the settings can drive a simulation
    pub fn validate(&self) -> Result<()> {
        if !self.fixed_timestep.is_finite() || self.fixed_timestep <= 0.0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "fixed timestep must be positive, got {}",
                self.fixed_timestep
            )));
        }
        if !self.max_frame_delta.is_finite() || self.max_frame_delta <= 0.0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "max frame delta must be positive, got {}",
                self.max_frame_delta
            )));
        }
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidConfig(format!(
                "gravity must be finite, got {}",
                self.gravity
            )));
        }
        Ok(())
    }
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            fixed_timestep: DEFAULT_FIXED_TIMESTEP,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            max_frame_delta: DEFAULT_MAX_FRAME_DELTA,
        }
    }
}

/// Project file holding physics settings and collision layers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhysicsProjectSettings {
    pub settings: PhysicsSettings,
    #[serde(default)]
    pub layers: PhysicsLayerManager,
}

impl PhysicsProjectSettings {
    /// Save to `.ron` or `.json`, chosen by extension (RON otherwise)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_json(path) {
            serde_json::to_string_pretty(self).map_err(|e| PhysicsError::Serialize(e.to_string()))?
        } else {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| PhysicsError::Serialize(e.to_string()))?
        };
        fs::write(path, content)?;
        log::info!("Saved physics settings to {}", path.display());
        Ok(())
    }

    /// Load from `.ron` or `.json`, chosen by extension (RON otherwise)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, deserialization fails, or the
    /// loaded settings or layer table are invalid
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let project: Self = if is_json(path) {
            serde_json::from_str(&content).map_err(|e| PhysicsError::Deserialize(e.to_string()))?
        } else {
            ron::from_str(&content).map_err(|e| PhysicsError::Deserialize(e.to_string()))?
        };
        project.settings.validate()?;
        project.layers.validate()?;
        Ok(project)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = PhysicsSettings::default();

        assert!((settings.fixed_timestep - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(settings.gravity, Vec3::new(0.0, -9.81, 0.0));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_timestep() {
        let zero = PhysicsSettings {
            fixed_timestep: 0.0,
            ..Default::default()
        };
        let nan = PhysicsSettings {
            fixed_timestep: f32::NAN,
            ..Default::default()
        };

        assert!(matches!(zero.validate(), Err(PhysicsError::InvalidConfig(_))));
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_project_settings_ron_roundtrip() {
        let mut project = PhysicsProjectSettings::default();
        project.settings.gravity = Vec3::new(0.0, -3.7, 0.0);
        let player = project.layers.add_layer("Player", false).unwrap();

        let ron_str =
            ron::ser::to_string_pretty(&project, ron::ser::PrettyConfig::default()).unwrap();
        let loaded: PhysicsProjectSettings = ron::from_str(&ron_str).unwrap();

        assert_eq!(loaded.settings, project.settings);
        assert_eq!(loaded.layers.layer_by_name("Player").unwrap().layer_id, player);
    }

    #[test]
    fn test_project_settings_file_roundtrip() {
        let dir = std::env::temp_dir();
        let json_path = dir.join(format!("horizon_physics_{}.json", uuid::Uuid::new_v4()));

        let mut project = PhysicsProjectSettings::default();
        project.layers.add_layer("Enemy", true).unwrap();
        project.save(&json_path).unwrap();

        let loaded = PhysicsProjectSettings::load(&json_path).unwrap();
        assert_eq!(loaded.layers, project.layers);

        let _ = fs::remove_file(&json_path);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = PhysicsProjectSettings::load("/nonexistent/physics.ron");
        assert!(matches!(result, Err(PhysicsError::Io(_))));
    }
}
