//! Process-wide physics service
//!
//! Owns the backend, the global settings, the layer table and the material
//! cache, and builds one [`PhysicsScene`] per running scene.

use std::path::Path;
use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;

use super::api::{PhysicsApi, PhysicsApiType, create_api};
use super::error::Result;
use super::layers::PhysicsLayerManager;
use super::material::{MaterialCache, PhysicsMaterial};
use super::scene::{PhysicsScene, SceneContext};
use super::settings::{PhysicsProjectSettings, PhysicsSettings};
use crate::assets::Assets;
use crate::ecs::World;

/// Settings channel into one scene. The scene owns the receiver; once it is
/// dropped the weak handle no longer upgrades.
struct SettingsSubscriber {
    sender: Sender<PhysicsSettings>,
    receiver: Weak<Receiver<PhysicsSettings>>,
}

impl SettingsSubscriber {
    fn is_live(&self) -> bool {
        self.receiver.strong_count() > 0
    }
}

/// Backend, configuration and scene factory
pub struct PhysicsSystem {
    api_type: PhysicsApiType,
    api: Option<Box<dyn PhysicsApi>>,
    settings: PhysicsSettings,
    layers: PhysicsLayerManager,
    materials: Option<MaterialCache>,
    material_assets: Arc<RwLock<Assets<PhysicsMaterial>>>,
    /// One sender per live scene
    subscribers: Vec<SettingsSubscriber>,
}

impl PhysicsSystem {
    /// Create the system. The backend is initialized on first use.
    #[must_use]
    pub fn new(api_type: PhysicsApiType, settings: PhysicsSettings) -> Self {
        Self {
            api_type,
            api: None,
            settings,
            layers: PhysicsLayerManager::new(),
            materials: None,
            material_assets: Arc::default(),
            subscribers: Vec::new(),
        }
    }

    /// Create the system from a saved project file
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or holds invalid settings
    pub fn from_project(api_type: PhysicsApiType, path: impl AsRef<Path>) -> Result<Self> {
        let project = PhysicsProjectSettings::load(path)?;
        let mut system = Self::new(api_type, project.settings);
        system.layers = project.layers;
        Ok(system)
    }

    /// The backend, initialized on first call
    ///
    /// # Errors
    ///
    /// Returns [`super::PhysicsError::InvalidConfig`] if the backend rejects the
    /// current settings. The engine cannot run without it.
    pub fn api(&mut self) -> Result<&dyn PhysicsApi> {
        let api = match self.api.take() {
            Some(api) => api,
            None => {
                let api = create_api(self.api_type, &self.settings)?;
                self.materials = Some(MaterialCache::new(api.default_material()));
                api
            }
        };
        Ok(&**self.api.insert(api))
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.api.is_some()
    }

    #[must_use]
    pub fn api_type(&self) -> PhysicsApiType {
        self.api_type
    }

    /// Build the physics world for a scene that is starting
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be initialized
    pub fn create_scene(&mut self, world: &World) -> Result<PhysicsScene> {
        self.api()?;
        let context = SceneContext {
            settings: self.settings,
            layers: self.layers.clone(),
            materials: self.materials.clone().unwrap_or_default(),
            material_assets: Arc::clone(&self.material_assets),
        };
        let mut scene = PhysicsScene::new(self.api()?, context, world);

        let (sender, receiver) = crossbeam_channel::unbounded();
        let receiver = Arc::new(receiver);
        self.subscribers.retain(SettingsSubscriber::is_live);
        self.subscribers.push(SettingsSubscriber {
            sender,
            receiver: Arc::downgrade(&receiver),
        });
        scene.set_settings_receiver(receiver);

        Ok(scene)
    }

    #[must_use]
    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    /// Replace the global settings and push them to every live scene.
    ///
    /// Scenes apply the new settings before their next sub-step.
    ///
    /// # Errors
    ///
    /// Returns [`super::PhysicsError::InvalidConfig`] and keeps the old settings
    /// if `settings` is invalid
    pub fn set_settings(&mut self, settings: PhysicsSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        self.subscribers
            .retain(|subscriber| subscriber.is_live() && subscriber.sender.send(settings).is_ok());
        log::debug!(
            "Physics settings pushed to {} live scene(s)",
            self.subscribers.len()
        );
        Ok(())
    }

    /// Scenes built by this system that have not been dropped
    #[must_use]
    pub fn live_scene_count(&self) -> usize {
        self.subscribers.iter().filter(|s| s.is_live()).count()
    }

    /// Layer table copied into scenes when they start
    #[must_use]
    pub fn layers(&self) -> &PhysicsLayerManager {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut PhysicsLayerManager {
        &mut self.layers
    }

    /// Material asset storage shared with every scene
    #[must_use]
    pub fn material_assets(&self) -> Arc<RwLock<Assets<PhysicsMaterial>>> {
        Arc::clone(&self.material_assets)
    }

    /// Save settings and layers
    ///
    /// # Errors
    ///
    /// Fails on serialization or I/O errors
    pub fn save_project(&self, path: impl AsRef<Path>) -> Result<()> {
        PhysicsProjectSettings {
            settings: self.settings,
            layers: self.layers.clone(),
        }
        .save(path)
    }

    /// Replace settings and layers from a saved project.
    ///
    /// Live scenes receive the settings; layer changes apply to scenes started
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or holds invalid settings
    pub fn load_project(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let project = PhysicsProjectSettings::load(path)?;
        self.layers = project.layers;
        self.set_settings(project.settings)
    }
}

impl Default for PhysicsSystem {
    fn default() -> Self {
        Self::new(PhysicsApiType::default(), PhysicsSettings::default())
    }
}
