//! Physics backend selection

use super::error::Result;
use super::material::PhysicsMaterial;
use super::settings::PhysicsSettings;
use super::world::NativeWorld;

/// Available simulation backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PhysicsApiType {
    #[default]
    Rapier,
}

/// A simulation backend able to create per-scene worlds
pub trait PhysicsApi: Send + Sync {
    fn api_type(&self) -> PhysicsApiType;

    /// Material used for colliders without a resolvable material asset
    fn default_material(&self) -> PhysicsMaterial;

    /// Create an empty native world for one scene
    fn create_world(&self, settings: &PhysicsSettings) -> NativeWorld;
}

/// Backend driving rapier3d
#[derive(Debug)]
pub struct RapierApi {
    default_material: PhysicsMaterial,
}

impl RapierApi {
    /// Initialize the backend.
    ///
    /// # Errors
    ///
    /// Fails when the settings cannot drive a simulation. Callers treat this as fatal.
    pub fn new(settings: &PhysicsSettings) -> Result<Self> {
        settings.validate()?;
        log::info!(
            "Initialized rapier physics backend (timestep {:.4}s, gravity {})",
            settings.fixed_timestep,
            settings.gravity
        );
        Ok(Self {
            default_material: PhysicsMaterial::default(),
        })
    }
}

impl PhysicsApi for RapierApi {
    fn api_type(&self) -> PhysicsApiType {
        PhysicsApiType::Rapier
    }

    fn default_material(&self) -> PhysicsMaterial {
        self.default_material
    }

    fn create_world(&self, settings: &PhysicsSettings) -> NativeWorld {
        NativeWorld::new(settings.gravity, settings.fixed_timestep)
    }
}

/// Create the backend for `api_type`
pub fn create_api(api_type: PhysicsApiType, settings: &PhysicsSettings) -> Result<Box<dyn PhysicsApi>> {
    match api_type {
        PhysicsApiType::Rapier => Ok(Box::new(RapierApi::new(settings)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsError;

    #[test]
    fn test_create_rapier_api() {
        let api = create_api(PhysicsApiType::Rapier, &PhysicsSettings::default()).unwrap();

        assert_eq!(api.api_type(), PhysicsApiType::Rapier);
        assert_eq!(api.default_material(), PhysicsMaterial::new(0.8, 0.7, 0.1));
    }

    #[test]
    fn test_invalid_settings_fail_initialization() {
        let settings = PhysicsSettings {
            fixed_timestep: -1.0,
            ..Default::default()
        };

        assert!(matches!(
            RapierApi::new(&settings),
            Err(PhysicsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_world_uses_settings() {
        let settings = PhysicsSettings {
            fixed_timestep: 1.0 / 120.0,
            ..Default::default()
        };
        let api = RapierApi::new(&settings).unwrap();
        let world = api.create_world(&settings);

        assert!((world.timestep() - 1.0 / 120.0).abs() < 1e-6);
        assert_eq!(world.gravity, settings.gravity);
    }
}
