//! Per-scene physics world
//!
//! A [`PhysicsScene`] mirrors the physics-relevant entities of one scene into a
//! native world, steps it in fixed sub-steps and writes the results back onto
//! the entity transforms.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use glam::{Quat, Vec3};
use hecs::Entity;
use parking_lot::RwLock;
use rapier3d::parry::query::ShapeCastOptions;
use rapier3d::prelude::*;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use super::api::PhysicsApi;
use super::body::{PhysicsBody, has_collider};
use super::character_controller::CharacterController;
use super::error::{PhysicsError, Result};
use super::events::{EventBridge, EventSink};
use super::layers::PhysicsLayerManager;
use super::material::{MaterialCache, PhysicsMaterial};
use super::queries::{HitInfo, MAX_OVERLAP_RESULTS, ShapeCastInfo, ShapeOverlapInfo};
use super::settings::PhysicsSettings;
use super::shapes::ShapeContext;
use super::timestep::SubStepper;
use super::types::LayerMask;
use super::world::{NativeWorld, isometry, rapier_to_vec, vec_to_rapier};
use crate::assets::Assets;
use crate::ecs::{
    CharacterControllerComponent, IdComponent, Inactive, RigidbodyComponent, Transform, World,
};

/// Shared state a physics scene is built from
#[derive(Clone)]
pub struct SceneContext {
    pub settings: PhysicsSettings,
    /// Snapshot of the layer table taken when the scene starts
    pub layers: PhysicsLayerManager,
    pub materials: MaterialCache,
    pub material_assets: Arc<RwLock<Assets<PhysicsMaterial>>>,
}

impl SceneContext {
    /// Context with default settings, layers and materials
    #[must_use]
    pub fn new(settings: PhysicsSettings) -> Self {
        Self {
            settings,
            layers: PhysicsLayerManager::new(),
            materials: MaterialCache::default(),
            material_assets: Arc::default(),
        }
    }
}

/// Whether the collider's layer is one of the layers in `mask`.
///
/// Only the membership bit is tested, so layers that collide with nothing are
/// still visible to queries.
fn in_layer_mask(collider: &Collider, mask: LayerMask) -> bool {
    collider.collision_groups().memberships.bits() & mask.bit_value != 0
}

/// Query filter skipping sensors and, unless `mask` is all layers, colliders
/// rejected by `in_layers`
fn query_filter<'a>(
    mask: LayerMask,
    in_layers: &'a impl Fn(ColliderHandle, &Collider) -> bool,
) -> QueryFilter<'a> {
    let filter = QueryFilter::new().exclude_sensors();
    if mask == LayerMask::ALL {
        return filter;
    }
    filter.predicate(in_layers)
}

/// Whether `entity` only contributes shapes to its parent's compound body
fn is_compound_child(world: &World, entity: Entity) -> bool {
    if world.has::<RigidbodyComponent>(entity) {
        return false;
    }
    world.parent(entity).is_some_and(|parent| {
        world.has::<RigidbodyComponent>(parent) && !has_collider(world, parent)
    })
}

/// Physics world of one running scene
pub struct PhysicsScene {
    native: NativeWorld,
    settings: PhysicsSettings,
    stepper: SubStepper,
    layers: PhysicsLayerManager,
    materials: MaterialCache,
    material_assets: Arc<RwLock<Assets<PhysicsMaterial>>>,
    static_bodies: FxHashMap<Uuid, PhysicsBody>,
    dynamic_bodies: FxHashMap<Uuid, PhysicsBody>,
    character_controllers: FxHashMap<Uuid, CharacterController>,
    events: EventBridge,
    settings_updates: Option<Arc<Receiver<PhysicsSettings>>>,
    last_substeps: u32,
}

impl PhysicsScene {
    /// Create the native world and build bodies and controllers for `world`
    pub fn new(api: &dyn PhysicsApi, context: SceneContext, world: &World) -> Self {
        let SceneContext {
            settings,
            layers,
            materials,
            material_assets,
        } = context;

        let mut scene = Self {
            native: api.create_world(&settings),
            settings,
            stepper: SubStepper::from_settings(&settings),
            layers,
            materials,
            material_assets,
            static_bodies: FxHashMap::default(),
            dynamic_bodies: FxHashMap::default(),
            character_controllers: FxHashMap::default(),
            events: EventBridge::new(),
            settings_updates: None,
            last_substeps: 0,
        };

        let entities: Vec<Entity> = world
            .query::<&IdComponent>()
            .iter()
            .map(|(entity, _)| entity)
            .filter(|&entity| !world.has::<Inactive>(entity))
            .collect();

        for &entity in &entities {
            let wants_body =
                world.has::<RigidbodyComponent>(entity) || has_collider(world, entity);
            if wants_body && !is_compound_child(world, entity) {
                scene.insert_body(world, entity);
            }
        }
        for &entity in &entities {
            if world.has::<CharacterControllerComponent>(entity) {
                scene.insert_character_controller(world, entity);
            }
        }
        scene.native.update_queries();

        log::info!(
            "Physics scene started: {} static, {} dynamic, {} controller(s)",
            scene.static_bodies.len(),
            scene.dynamic_bodies.len(),
            scene.character_controllers.len()
        );
        scene
    }

    /// Receive settings pushed by the physics system
    pub(crate) fn set_settings_receiver(&mut self, receiver: Arc<Receiver<PhysicsSettings>>) {
        self.settings_updates = Some(receiver);
    }

    // -------------------------------------------------------------------------
    // Stepping
    // -------------------------------------------------------------------------

    /// Advance the scene by one frame of `dt` seconds.
    ///
    /// Runs zero or more fixed sub-steps, dispatching events after each one,
    /// then writes body and controller poses back onto `world`.
    pub fn simulate(&mut self, dt: f32, world: &mut World) {
        self.pre_simulate();

        let substeps = self.stepper.advance(dt);
        self.last_substeps = substeps;
        let fixed_timestep = self.stepper.fixed_timestep();
        let collector = self.events.collector();

        for _ in 0..substeps {
            for controller in self.character_controllers.values_mut() {
                controller.simulate(fixed_timestep, &mut self.native);
            }
            for body in self.dynamic_bodies.values_mut() {
                body.apply_pending(&mut self.native, fixed_timestep);
            }

            self.native.step(&collector);
            self.native.reset_forces();

            self.post_simulate(world);
        }

        if substeps > 0 {
            self.sync_transforms(world);
        }
    }

    fn pre_simulate(&mut self) {
        let latest = self
            .settings_updates
            .as_ref()
            .and_then(|receiver| receiver.try_iter().last());
        if let Some(settings) = latest {
            self.apply_settings(settings);
        }
        self.events.clear();
    }

    fn post_simulate(&mut self, world: &World) {
        self.events.collect();
        self.events.dispatch(world);
    }

    fn apply_settings(&mut self, settings: PhysicsSettings) {
        log::info!(
            "Applying physics settings: timestep {:.4}s, gravity {}",
            settings.fixed_timestep,
            settings.gravity
        );
        self.native.gravity = settings.gravity;
        self.native.set_timestep(settings.fixed_timestep);
        self.stepper.set_fixed_timestep(settings.fixed_timestep);
        self.stepper.set_max_frame_delta(settings.max_frame_delta);
        self.settings = settings;
    }

    /// Copy simulated poses back onto entity transforms.
    ///
    /// Native poses are world space; entities with a parent are converted back
    /// into their parent's space. Scale is never simulated and is preserved.
    fn sync_transforms(&self, world: &mut World) {
        for body in self.dynamic_bodies.values() {
            let Some(entity) = world.try_entity_with_uuid(body.entity()) else {
                continue;
            };
            let position = body.position(&self.native);
            let rotation = body.rotation(&self.native);
            write_world_pose(world, entity, position, rotation);
        }

        for controller in self.character_controllers.values() {
            let Some(entity) = world.try_entity_with_uuid(controller.entity()) else {
                continue;
            };
            let rotation = world.world_transform(entity).rotation();
            write_world_pose(
                world,
                entity,
                controller.position() - controller.offset(),
                rotation,
            );
        }
    }

    // -------------------------------------------------------------------------
    // Bodies and controllers
    // -------------------------------------------------------------------------

    /// Build the body for an entity created while the scene runs.
    ///
    /// Any existing body of the entity is replaced. A collider child of a
    /// compound root rebuilds the root's body instead. Returns whether a body
    /// was registered; entities without shapes get none.
    pub fn create_body(&mut self, world: &World, entity: Entity) -> bool {
        let target = if is_compound_child(world, entity) {
            world.parent(entity).unwrap_or(entity)
        } else {
            entity
        };
        let created = self.insert_body(world, target);
        self.native.update_queries();
        created
    }

    fn insert_body(&mut self, world: &World, entity: Entity) -> bool {
        let Some(uuid) = world.uuid(entity) else {
            return false;
        };
        self.release_body(uuid);

        let assets = self.material_assets.read();
        let ctx = ShapeContext {
            layers: &self.layers,
            materials: &self.materials,
            material_assets: &assets,
        };
        let Some(body) = PhysicsBody::new(&ctx, world, entity, &mut self.native) else {
            return false;
        };

        if body.is_static() {
            self.static_bodies.insert(uuid, body);
        } else {
            self.dynamic_bodies.insert(uuid, body);
        }
        true
    }

    /// Remove the body of an entity. Returns whether one existed.
    pub fn destroy_body(&mut self, entity: Uuid) -> bool {
        let removed = self.release_body(entity);
        if removed {
            self.native.update_queries();
        }
        removed
    }

    fn release_body(&mut self, entity: Uuid) -> bool {
        let body = self
            .static_bodies
            .remove(&entity)
            .or_else(|| self.dynamic_bodies.remove(&entity));
        let Some(body) = body else {
            return false;
        };
        body.release(&mut self.native);
        self.events.forget(entity);
        log::debug!("Destroyed physics body of {entity}");
        true
    }

    /// Build the character controller for an entity created while the scene runs
    pub fn create_character_controller(&mut self, world: &World, entity: Entity) -> bool {
        let created = self.insert_character_controller(world, entity);
        self.native.update_queries();
        created
    }

    fn insert_character_controller(&mut self, world: &World, entity: Entity) -> bool {
        let Some(uuid) = world.uuid(entity) else {
            return false;
        };
        self.release_character_controller(uuid);

        let Some(controller) = CharacterController::new(&self.layers, world, entity, &mut self.native)
        else {
            return false;
        };
        self.character_controllers.insert(uuid, controller);
        true
    }

    /// Remove the character controller of an entity. Returns whether one existed.
    pub fn destroy_character_controller(&mut self, entity: Uuid) -> bool {
        let removed = self.release_character_controller(entity);
        if removed {
            self.native.update_queries();
        }
        removed
    }

    fn release_character_controller(&mut self, entity: Uuid) -> bool {
        let Some(controller) = self.character_controllers.remove(&entity) else {
            return false;
        };
        controller.release(&mut self.native);
        self.events.forget(entity);
        true
    }

    /// Body of an entity, static or dynamic
    #[must_use]
    pub fn physics_body(&self, entity: Uuid) -> Option<&PhysicsBody> {
        self.static_bodies
            .get(&entity)
            .or_else(|| self.dynamic_bodies.get(&entity))
    }

    /// Body of an entity together with the native world its accessors need
    pub fn physics_body_mut(&mut self, entity: Uuid) -> Option<(&mut PhysicsBody, &mut NativeWorld)> {
        let body = match self.static_bodies.get_mut(&entity) {
            Some(body) => body,
            None => self.dynamic_bodies.get_mut(&entity)?,
        };
        Some((body, &mut self.native))
    }

    #[must_use]
    pub fn character_controller(&self, entity: Uuid) -> Option<&CharacterController> {
        self.character_controllers.get(&entity)
    }

    /// Controller of an entity together with the native world
    pub fn character_controller_mut(
        &mut self,
        entity: Uuid,
    ) -> Option<(&mut CharacterController, &mut NativeWorld)> {
        let controller = self.character_controllers.get_mut(&entity)?;
        Some((controller, &mut self.native))
    }

    /// Overwrite a dynamic body's pose without going through the solver
    ///
    /// # Errors
    ///
    /// Fails when the entity has no body or its body is static
    pub fn teleport(&mut self, entity: Uuid, position: Vec3, rotation: Quat) -> Result<()> {
        if self.static_bodies.contains_key(&entity) {
            return Err(PhysicsError::NotDynamic(entity));
        }
        let body = self
            .dynamic_bodies
            .get(&entity)
            .ok_or(PhysicsError::BodyNotFound(entity))?;
        body.teleport(&mut self.native, position, rotation);
        self.native.update_queries();
        Ok(())
    }

    /// Push every dynamic body within `radius` of `origin` away from it
    pub fn add_radial_impulse(&mut self, origin: Vec3, radius: f32, strength: f32) {
        let mut found = Vec::new();
        let native = &self.native;
        native.query_pipeline.intersections_with_shape(
            &native.bodies,
            &native.colliders,
            &isometry(origin, Quat::IDENTITY),
            &Ball::new(radius),
            QueryFilter::exclude_fixed(),
            |handle| {
                if let Some(collider) = native.colliders.get(handle) {
                    let entity = Uuid::from_u128(collider.user_data);
                    if !found.contains(&entity) {
                        found.push(entity);
                    }
                }
                true
            },
        );

        for entity in found {
            if let Some(body) = self.dynamic_bodies.get(&entity) {
                body.add_radial_impulse(&mut self.native, origin, radius, strength);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Closest hit along a ray, against every layer
    #[must_use]
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<HitInfo> {
        self.raycast_with_mask(origin, direction, max_distance, LayerMask::ALL)
    }

    /// Closest hit along a ray, against the layers in `mask`
    #[must_use]
    pub fn raycast_with_mask(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<HitInfo> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }
        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            vec_to_rapier(direction),
        );

        let in_layers = |_: ColliderHandle, collider: &Collider| in_layer_mask(collider, mask);
        let native = &self.native;
        let (handle, hit) = native.query_pipeline.cast_ray_and_get_normal(
            &native.bodies,
            &native.colliders,
            &ray,
            max_distance,
            true,
            query_filter(mask, &in_layers),
        )?;
        let collider = native.colliders.get(handle)?;
        let point = ray.point_at(hit.time_of_impact);

        Some(HitInfo {
            entity: Uuid::from_u128(collider.user_data),
            position: Vec3::new(point.x, point.y, point.z),
            normal: rapier_to_vec(&hit.normal),
            distance: hit.time_of_impact,
        })
    }

    /// Sweep a shape and return the first hit
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::UnsupportedQueryShape`] for mesh shapes
    pub fn shape_cast(&self, info: &ShapeCastInfo) -> Result<Option<HitInfo>> {
        let shape = info.shape.to_shared_shape()?;
        let direction = info.direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return Ok(None);
        }
        let pose = isometry(info.origin, info.rotation);
        let options = ShapeCastOptions {
            max_time_of_impact: info.max_distance,
            stop_at_penetration: true,
            ..ShapeCastOptions::default()
        };

        let mask = info.layer_mask;
        let in_layers = |_: ColliderHandle, collider: &Collider| in_layer_mask(collider, mask);
        let native = &self.native;
        let Some((handle, hit)) = native.query_pipeline.cast_shape(
            &native.bodies,
            &native.colliders,
            &pose,
            &vec_to_rapier(direction),
            &*shape,
            options,
            query_filter(mask, &in_layers),
        ) else {
            return Ok(None);
        };
        let Some(collider) = native.colliders.get(handle) else {
            return Ok(None);
        };

        Ok(Some(HitInfo {
            entity: Uuid::from_u128(collider.user_data),
            position: info.origin + direction * hit.time_of_impact,
            normal: rapier_to_vec(&hit.normal1),
            distance: hit.time_of_impact,
        }))
    }

    /// Entities overlapping a shape, at most [`MAX_OVERLAP_RESULTS`]
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::UnsupportedQueryShape`] for mesh shapes
    pub fn overlap_shape(&self, info: &ShapeOverlapInfo) -> Result<Vec<Uuid>> {
        let shape = info.shape.to_shared_shape()?;
        let pose = isometry(info.origin, info.rotation);
        let mut found = Vec::new();

        let mask = info.layer_mask;
        let in_layers = |_: ColliderHandle, collider: &Collider| in_layer_mask(collider, mask);
        let native = &self.native;
        native.query_pipeline.intersections_with_shape(
            &native.bodies,
            &native.colliders,
            &pose,
            &*shape,
            query_filter(mask, &in_layers),
            |handle| {
                if let Some(collider) = native.colliders.get(handle) {
                    let entity = Uuid::from_u128(collider.user_data);
                    if !found.contains(&entity) {
                        found.push(entity);
                    }
                }
                found.len() < MAX_OVERLAP_RESULTS
            },
        );

        Ok(found)
    }

    // -------------------------------------------------------------------------
    // Settings and state
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn gravity(&self) -> Vec3 {
        self.native.gravity
    }

    /// Change gravity for this scene immediately
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.native.gravity = gravity;
        self.settings.gravity = gravity;
        for body in self.dynamic_bodies.values() {
            if let Some(rb) = self.native.body_mut(body.handle()) {
                rb.wake_up(true);
            }
        }
    }

    #[must_use]
    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    #[must_use]
    pub fn layers(&self) -> &PhysicsLayerManager {
        &self.layers
    }

    /// Register the single receiver of collision and trigger events
    pub fn set_event_sink(&mut self, sink: EventSink) {
        self.events.set_sink(sink);
    }

    pub fn clear_event_sink(&mut self) {
        self.events.clear_sink();
    }

    /// Sub-steps run by the last call to [`Self::simulate`]
    #[must_use]
    pub fn last_substep_count(&self) -> u32 {
        self.last_substeps
    }

    #[must_use]
    pub fn static_body_count(&self) -> usize {
        self.static_bodies.len()
    }

    #[must_use]
    pub fn dynamic_body_count(&self) -> usize {
        self.dynamic_bodies.len()
    }

    #[must_use]
    pub fn character_controller_count(&self) -> usize {
        self.character_controllers.len()
    }

    #[must_use]
    pub fn native_world(&self) -> &NativeWorld {
        &self.native
    }

    pub fn native_world_mut(&mut self) -> &mut NativeWorld {
        &mut self.native
    }
}

/// Write a world-space pose onto an entity, keeping its local scale
fn write_world_pose(world: &mut World, entity: Entity, position: Vec3, rotation: Quat) {
    let scale = {
        let Ok(mut transform) = world.get_mut::<Transform>(entity) else {
            return;
        };
        transform.position = position;
        transform.rotation = rotation;
        transform.scale
    };

    world.convert_to_local_space(entity);

    if let Ok(mut transform) = world.get_mut::<Transform>(entity) {
        transform.scale = scale;
    }
}
