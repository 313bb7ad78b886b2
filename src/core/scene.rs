//! Runtime scene
//!
//! A [`Scene`] owns its entities and, while running or simulating, the physics
//! world built from them.

use hecs::Entity;

use crate::ecs::{CharacterControllerComponent, World};
use crate::physics::{PhysicsScene, PhysicsSystem, Result};

/// How a scene is currently being played
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SceneState {
    #[default]
    Edit,
    /// Full runtime, as in a built game
    Runtime,
    /// Physics only, as in an editor preview
    Simulation,
}

/// A named set of entities with an optional running physics world
pub struct Scene {
    name: String,
    world: World,
    state: SceneState,
    /// Multiplier applied to the frame delta before simulating
    time_scale: f32,
    physics: Option<PhysicsScene>,
}

impl Scene {
    /// Create an empty scene in edit mode
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            world: World::new(),
            state: SceneState::Edit,
            time_scale: 1.0,
            physics: None,
        }
    }

    /// Start the runtime and build the physics world
    ///
    /// # Errors
    ///
    /// Fails if the physics backend cannot be initialized
    pub fn on_runtime_start(&mut self, physics: &mut PhysicsSystem) -> Result<()> {
        self.start(physics, SceneState::Runtime)
    }

    /// Start a physics-only simulation
    ///
    /// # Errors
    ///
    /// Fails if the physics backend cannot be initialized
    pub fn on_simulation_start(&mut self, physics: &mut PhysicsSystem) -> Result<()> {
        self.start(physics, SceneState::Simulation)
    }

    pub fn on_runtime_stop(&mut self) {
        self.stop();
    }

    pub fn on_simulation_stop(&mut self) {
        self.stop();
    }

    fn start(&mut self, physics: &mut PhysicsSystem, state: SceneState) -> Result<()> {
        if self.physics.is_some() {
            self.stop();
        }
        self.physics = Some(physics.create_scene(&self.world)?);
        self.state = state;
        log::info!("Scene '{}' started ({state:?})", self.name);
        Ok(())
    }

    fn stop(&mut self) {
        if self.physics.take().is_some() {
            log::info!("Scene '{}' stopped", self.name);
        }
        self.state = SceneState::Edit;
    }

    /// Advance the scene by one frame
    pub fn on_update(&mut self, dt: f32) {
        if let Some(physics) = self.physics.as_mut() {
            physics.simulate(dt * self.time_scale, &mut self.world);
        }
    }

    /// Register a body and controller for an entity added while running
    pub fn on_entity_created(&mut self, entity: Entity) {
        let Some(physics) = self.physics.as_mut() else {
            return;
        };
        physics.create_body(&self.world, entity);
        if self.world.has::<CharacterControllerComponent>(entity) {
            physics.create_character_controller(&self.world, entity);
        }
    }

    /// Despawn an entity, removing its physics objects first
    pub fn destroy_entity(&mut self, entity: Entity) {
        if let (Some(physics), Some(uuid)) = (self.physics.as_mut(), self.world.uuid(entity)) {
            physics.destroy_body(uuid);
            physics.destroy_character_controller(uuid);
        }
        if self.world.despawn(entity).is_err() {
            log::warn!("Tried to destroy an entity that no longer exists");
        }
    }

    /// `(static, dynamic)` body counts, zero when not running
    #[must_use]
    pub fn physics_body_counts(&self) -> (usize, usize) {
        self.physics.as_ref().map_or((0, 0), |physics| {
            (physics.static_body_count(), physics.dynamic_body_count())
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn state(&self) -> SceneState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state != SceneState::Edit
    }

    #[must_use]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Set the time scale; negative values are clamped to zero
    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale.max(0.0);
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[must_use]
    pub fn physics(&self) -> Option<&PhysicsScene> {
        self.physics.as_ref()
    }

    pub fn physics_mut(&mut self) -> Option<&mut PhysicsScene> {
        self.physics.as_mut()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::ecs::{BoxColliderComponent, RigidbodyComponent, SphereColliderComponent, Transform};

    fn populated_scene() -> (Scene, Entity) {
        let mut scene = Scene::new("Test Scene");
        let world = scene.world_mut();
        world.spawn((BoxColliderComponent {
            half_size: Vec3::new(10.0, 0.5, 10.0),
            ..Default::default()
        },));
        let ball = world.spawn((
            Transform::from_position(Vec3::new(0.0, 5.0, 0.0)),
            RigidbodyComponent::default(),
            SphereColliderComponent::default(),
        ));
        (scene, ball)
    }

    #[test]
    fn test_runtime_lifecycle() {
        let (mut scene, _) = populated_scene();
        let mut physics = PhysicsSystem::default();
        assert_eq!(scene.physics_body_counts(), (0, 0));

        scene.on_runtime_start(&mut physics).unwrap();
        assert_eq!(scene.state(), SceneState::Runtime);
        assert_eq!(scene.physics_body_counts(), (1, 1));

        scene.on_runtime_stop();
        assert!(!scene.is_running());
        assert!(scene.physics().is_none());
    }

    #[test]
    fn test_update_applies_time_scale() {
        let (mut scene, ball) = populated_scene();
        let mut physics = PhysicsSystem::default();
        scene.on_simulation_start(&mut physics).unwrap();

        scene.set_time_scale(0.0);
        scene.on_update(1.0 / 60.0);
        assert_eq!(scene.physics().unwrap().last_substep_count(), 0);
        assert_eq!(scene.world().local_transform(ball).position.y, 5.0);

        scene.set_time_scale(1.0);
        scene.on_update(1.0 / 60.0);
        assert_eq!(scene.physics().unwrap().last_substep_count(), 1);
        assert!(scene.world().local_transform(ball).position.y < 5.0);
    }

    #[test]
    fn test_destroy_entity_removes_body() {
        let (mut scene, ball) = populated_scene();
        let mut physics = PhysicsSystem::default();
        scene.on_runtime_start(&mut physics).unwrap();

        scene.destroy_entity(ball);

        assert_eq!(scene.physics_body_counts(), (1, 0));
        assert!(!scene.world().contains(ball));
    }

    #[test]
    fn test_entities_created_while_running() {
        let (mut scene, _) = populated_scene();
        let mut physics = PhysicsSystem::default();
        scene.on_runtime_start(&mut physics).unwrap();

        let crate_entity = scene.world_mut().spawn((
            RigidbodyComponent::default(),
            BoxColliderComponent::default(),
        ));
        scene.on_entity_created(crate_entity);

        assert_eq!(scene.physics_body_counts(), (1, 2));
    }

    #[test]
    fn test_compound_assembled_while_running() {
        let mut scene = Scene::new("Compound");
        let mut physics = PhysicsSystem::default();
        scene.on_runtime_start(&mut physics).unwrap();

        let world = scene.world_mut();
        let root = world.spawn((RigidbodyComponent::default(),));
        let child = world.spawn((BoxColliderComponent::default(),));
        world.set_parent(child, root).unwrap();
        scene.on_entity_created(root);
        scene.on_entity_created(child);

        assert_eq!(scene.physics_body_counts(), (0, 1));
    }
}
