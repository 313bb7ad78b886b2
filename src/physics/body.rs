//! Physics bodies
//!
//! A [`PhysicsBody`] owns one native rigid body and the shapes attached to it.
//! The native state lives in the scene's [`NativeWorld`], so accessors take the
//! world explicitly.

use glam::{Quat, Vec3};
use hecs::Entity;
use rapier3d::prelude::*;
use uuid::Uuid;

use super::shapes::{PhysicsShape, ShapeContext};
use super::types::{ForceMode, PhysicsAxis};
use super::world::{
    NativeWorld, isometry, quat_to_rapier, rapier_to_quat, rapier_to_vec, vec_to_rapier,
};
use crate::ecs::{
    BoxColliderComponent, CapsuleColliderComponent, RigidbodyComponent, SphereColliderComponent,
    World,
};

/// Whether an entity carries any collider component
pub(crate) fn has_collider(world: &World, entity: Entity) -> bool {
    world.has::<BoxColliderComponent>(entity)
        || world.has::<SphereColliderComponent>(entity)
        || world.has::<CapsuleColliderComponent>(entity)
}

/// A static or dynamic rigid body built from an entity subtree
#[derive(Debug)]
pub struct PhysicsBody {
    entity: Uuid,
    is_static: bool,
    shapes: Vec<PhysicsShape>,
    handle: RigidBodyHandle,
    /// Angular acceleration applied over the next step
    pending_angular_acceleration: Vec3,
}

impl PhysicsBody {
    /// Build the body for `entity` and insert it into `native`.
    ///
    /// An entity with a rigidbody but no collider collects shapes from its direct
    /// children (a compound body). Returns `None` when no shape was found.
    pub fn new(
        ctx: &ShapeContext<'_>,
        world: &World,
        entity: Entity,
        native: &mut NativeWorld,
    ) -> Option<Self> {
        let uuid = world.uuid(entity)?;
        let rigidbody = world.get::<RigidbodyComponent>(entity).ok().map(|rb| *rb);
        let owns_colliders = has_collider(world, entity);

        let mut shapes = Vec::new();
        if rigidbody.is_some() && !owns_colliders {
            for child in world.children(entity) {
                if world.has::<RigidbodyComponent>(child) {
                    continue;
                }
                shapes.extend(PhysicsShape::collect(ctx, world, child, true));
            }
        }
        if owns_colliders {
            shapes.extend(PhysicsShape::collect(ctx, world, entity, false));
        }
        if shapes.is_empty() {
            log::debug!("Entity {uuid} has no collision shapes, skipping body");
            return None;
        }

        let global = world.world_transform(entity);
        let (position, rotation) = (global.position(), global.rotation());
        let user_data = uuid.as_u128();

        let builder = match rigidbody {
            Some(rb) => RigidBodyBuilder::dynamic()
                .linear_damping(rb.linear_drag)
                .angular_damping(rb.angular_drag)
                .gravity_scale(if rb.use_gravity { 1.0 } else { 0.0 })
                .locked_axes(LockedAxes::from_bits_truncate(rb.constraints.bits()))
                // Initial velocities are authored in the body's local space
                .linvel(vec_to_rapier(rotation * rb.initial_linear_velocity))
                .angvel(vec_to_rapier(rotation * rb.initial_angular_velocity)),
            None => RigidBodyBuilder::fixed(),
        };
        let handle = native.insert_body(
            builder
                .position(isometry(position, rotation))
                .user_data(user_data)
                .build(),
        );

        let mass_share = rigidbody.map(|rb| rb.mass / shapes.len() as f32);
        for shape in &mut shapes {
            let collider = shape.to_collider(mass_share, user_data);
            shape.handle = Some(native.insert_collider(collider, handle));
        }
        if rigidbody.is_some()
            && let Some(rb) = native.bodies.get_mut(handle)
        {
            rb.recompute_mass_properties_from_colliders(&native.colliders);
        }

        log::debug!(
            "Created {} body for {uuid} with {} shape(s)",
            if rigidbody.is_some() { "dynamic" } else { "static" },
            shapes.len()
        );

        Some(Self {
            entity: uuid,
            is_static: rigidbody.is_none(),
            shapes,
            handle,
            pending_angular_acceleration: Vec3::ZERO,
        })
    }

    /// Remove the native body and all of its colliders
    pub fn release(self, native: &mut NativeWorld) {
        native.remove_body(self.handle);
    }

    /// Identity of the owning entity
    #[must_use]
    pub fn entity(&self) -> Uuid {
        self.entity
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        !self.is_static
    }

    #[must_use]
    pub fn shapes(&self) -> &[PhysicsShape] {
        &self.shapes
    }

    #[must_use]
    pub fn handle(&self) -> RigidBodyHandle {
        self.handle
    }

    fn rb<'w>(&self, native: &'w NativeWorld) -> Option<&'w RigidBody> {
        native.body(self.handle)
    }

    /// Native body, only for dynamic bodies
    fn dynamic_rb<'w>(&self, native: &'w mut NativeWorld) -> Option<&'w mut RigidBody> {
        if self.is_static {
            log::warn!("Cannot change dynamics of static body {}", self.entity);
            return None;
        }
        native.body_mut(self.handle)
    }

    // -------------------------------------------------------------------------
    // Pose
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn position(&self, native: &NativeWorld) -> Vec3 {
        self.rb(native)
            .map(|rb| rapier_to_vec(rb.translation()))
            .unwrap_or_default()
    }

    /// Move the body, keeping its rotation
    pub fn set_position(&self, native: &mut NativeWorld, position: Vec3) {
        if let Some(rb) = native.body_mut(self.handle) {
            rb.set_translation(vec_to_rapier(position), true);
        }
    }

    #[must_use]
    pub fn rotation(&self, native: &NativeWorld) -> Quat {
        self.rb(native)
            .map(|rb| rapier_to_quat(rb.rotation()))
            .unwrap_or_default()
    }

    /// Rotate the body, keeping its position
    pub fn set_rotation(&self, native: &mut NativeWorld, rotation: Quat) {
        if let Some(rb) = native.body_mut(self.handle) {
            rb.set_rotation(quat_to_rapier(rotation), true);
        }
    }

    /// Overwrite the global pose directly, bypassing integration
    pub fn teleport(&self, native: &mut NativeWorld, position: Vec3, rotation: Quat) {
        if let Some(rb) = native.body_mut(self.handle) {
            rb.set_position(isometry(position, rotation), true);
        }
    }

    // -------------------------------------------------------------------------
    // Mass and damping
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn mass(&self, native: &NativeWorld) -> f32 {
        self.rb(native).map(RigidBody::mass).unwrap_or_default()
    }

    /// Set the total mass; inertia is recomputed from the shapes
    pub fn set_mass(&self, native: &mut NativeWorld, mass: f32) {
        if self.is_static {
            log::warn!("Cannot set mass of static body {}", self.entity);
            return;
        }
        let share = mass / self.shapes.len() as f32;
        for handle in self.shapes.iter().filter_map(PhysicsShape::handle) {
            if let Some(collider) = native.collider_mut(handle) {
                collider.set_mass(share);
            }
        }
        if let Some(rb) = native.bodies.get_mut(self.handle) {
            rb.recompute_mass_properties_from_colliders(&native.colliders);
        }
    }

    #[must_use]
    pub fn gravity_enabled(&self, native: &NativeWorld) -> bool {
        self.rb(native).is_some_and(|rb| rb.gravity_scale() != 0.0)
    }

    pub fn set_gravity_enabled(&self, native: &mut NativeWorld, enabled: bool) {
        if let Some(rb) = self.dynamic_rb(native) {
            rb.set_gravity_scale(if enabled { 1.0 } else { 0.0 }, true);
        }
    }

    #[must_use]
    pub fn linear_drag(&self, native: &NativeWorld) -> f32 {
        self.rb(native).map(RigidBody::linear_damping).unwrap_or_default()
    }

    pub fn set_linear_drag(&self, native: &mut NativeWorld, drag: f32) {
        if let Some(rb) = self.dynamic_rb(native) {
            rb.set_linear_damping(drag);
        }
    }

    #[must_use]
    pub fn angular_drag(&self, native: &NativeWorld) -> f32 {
        self.rb(native).map(RigidBody::angular_damping).unwrap_or_default()
    }

    pub fn set_angular_drag(&self, native: &mut NativeWorld, drag: f32) {
        if let Some(rb) = self.dynamic_rb(native) {
            rb.set_angular_damping(drag);
        }
    }

    // -------------------------------------------------------------------------
    // Velocity and constraints
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn linear_velocity(&self, native: &NativeWorld) -> Vec3 {
        self.rb(native)
            .map(|rb| rapier_to_vec(rb.linvel()))
            .unwrap_or_default()
    }

    pub fn set_linear_velocity(&self, native: &mut NativeWorld, velocity: Vec3) {
        if let Some(rb) = self.dynamic_rb(native) {
            rb.set_linvel(vec_to_rapier(velocity), true);
        }
    }

    #[must_use]
    pub fn angular_velocity(&self, native: &NativeWorld) -> Vec3 {
        self.rb(native)
            .map(|rb| rapier_to_vec(rb.angvel()))
            .unwrap_or_default()
    }

    pub fn set_angular_velocity(&self, native: &mut NativeWorld, velocity: Vec3) {
        if let Some(rb) = self.dynamic_rb(native) {
            rb.set_angvel(vec_to_rapier(velocity), true);
        }
    }

    #[must_use]
    pub fn constraints(&self, native: &NativeWorld) -> PhysicsAxis {
        self.rb(native)
            .map(|rb| PhysicsAxis::from_bits_truncate(rb.locked_axes().bits()))
            .unwrap_or_default()
    }

    pub fn set_constraints(&self, native: &mut NativeWorld, axes: PhysicsAxis) {
        if let Some(rb) = self.dynamic_rb(native) {
            rb.set_locked_axes(LockedAxes::from_bits_truncate(axes.bits()), true);
        }
    }

    // -------------------------------------------------------------------------
    // Forces
    // -------------------------------------------------------------------------

    /// Apply a force through the center of mass
    pub fn add_force(&self, native: &mut NativeWorld, force: Vec3, mode: ForceMode) {
        let Some(rb) = self.dynamic_rb(native) else {
            return;
        };
        let force = vec_to_rapier(force);
        match mode {
            ForceMode::Force => rb.add_force(force, true),
            ForceMode::Impulse => rb.apply_impulse(force, true),
            ForceMode::VelocityChange => {
                let linvel = *rb.linvel() + force;
                rb.set_linvel(linvel, true);
            }
            ForceMode::Acceleration => {
                let mass = rb.mass();
                rb.add_force(force * mass, true);
            }
        }
    }

    /// Apply a force at a world-space point, producing torque about the center of mass
    pub fn add_force_at_position(
        &self,
        native: &mut NativeWorld,
        force: Vec3,
        position: Vec3,
        mode: ForceMode,
    ) {
        let Some(rb) = self.dynamic_rb(native) else {
            return;
        };
        let force = vec_to_rapier(force);
        let point = point![position.x, position.y, position.z];
        let mass = rb.mass();
        match mode {
            ForceMode::Force => rb.add_force_at_point(force, point, true),
            ForceMode::Impulse => rb.apply_impulse_at_point(force, point, true),
            ForceMode::VelocityChange => rb.apply_impulse_at_point(force * mass, point, true),
            ForceMode::Acceleration => rb.add_force_at_point(force * mass, point, true),
        }
    }

    pub fn add_torque(&mut self, native: &mut NativeWorld, torque: Vec3, mode: ForceMode) {
        if mode == ForceMode::Acceleration && self.is_dynamic() {
            self.pending_angular_acceleration += torque;
            return;
        }
        let Some(rb) = self.dynamic_rb(native) else {
            return;
        };
        let torque = vec_to_rapier(torque);
        match mode {
            ForceMode::Force => rb.add_torque(torque, true),
            ForceMode::Impulse => rb.apply_torque_impulse(torque, true),
            ForceMode::VelocityChange => {
                let angvel = *rb.angvel() + torque;
                rb.set_angvel(angvel, true);
            }
            ForceMode::Acceleration => {}
        }
    }

    /// Push the body away from `origin` with an impulse of magnitude `strength`.
    ///
    /// Bodies further than `radius` are untouched; the boundary is inclusive and
    /// there is no falloff with distance.
    pub fn add_radial_impulse(
        &self,
        native: &mut NativeWorld,
        origin: Vec3,
        radius: f32,
        strength: f32,
    ) {
        let delta = self.position(native) - origin;
        if delta.length() > radius {
            return;
        }
        let direction = delta.normalize_or_zero();
        self.add_force(native, direction * strength, ForceMode::Impulse);
    }

    /// Apply per-step state queued by acceleration torques
    pub(crate) fn apply_pending(&mut self, native: &mut NativeWorld, dt: f32) {
        if self.pending_angular_acceleration == Vec3::ZERO {
            return;
        }
        let delta = self.pending_angular_acceleration * dt;
        self.pending_angular_acceleration = Vec3::ZERO;
        if let Some(rb) = native.body_mut(self.handle) {
            let angvel = *rb.angvel() + vec_to_rapier(delta);
            rb.set_angvel(angvel, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Assets;
    use crate::ecs::Transform;
    use crate::physics::layers::PhysicsLayerManager;
    use crate::physics::material::{MaterialCache, PhysicsMaterial};

    struct Fixture {
        layers: PhysicsLayerManager,
        materials: MaterialCache,
        assets: Assets<PhysicsMaterial>,
        native: NativeWorld,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                layers: PhysicsLayerManager::new(),
                materials: MaterialCache::default(),
                assets: Assets::new(),
                native: NativeWorld::new(Vec3::ZERO, 1.0 / 60.0),
            }
        }

        fn build(&mut self, world: &World, entity: Entity) -> Option<PhysicsBody> {
            let ctx = ShapeContext {
                layers: &self.layers,
                materials: &self.materials,
                material_assets: &self.assets,
            };
            PhysicsBody::new(&ctx, world, entity, &mut self.native)
        }
    }

    #[test]
    fn test_collider_without_rigidbody_is_static() {
        let mut fixture = Fixture::new();
        let mut world = World::new();
        let entity = world.spawn((BoxColliderComponent::default(),));

        let body = fixture.build(&world, entity).unwrap();

        assert!(body.is_static());
        assert_eq!(body.shapes().len(), 1);
        assert!(fixture.native.body(body.handle()).unwrap().is_fixed());
    }

    #[test]
    fn test_rigidbody_without_shapes_is_invalid() {
        let mut fixture = Fixture::new();
        let mut world = World::new();
        let entity = world.spawn((RigidbodyComponent::default(),));

        assert!(fixture.build(&world, entity).is_none());
        assert_eq!(fixture.native.body_count(), 0);
    }

    #[test]
    fn test_compound_body_collects_children() {
        let mut fixture = Fixture::new();
        let mut world = World::new();
        let root = world.spawn((RigidbodyComponent::default(),));
        for x in [-1.0, 0.0, 1.0] {
            let child = world.spawn((
                Transform::from_position(Vec3::new(x, 0.0, 0.0)),
                BoxColliderComponent::default(),
            ));
            world.set_parent(child, root).unwrap();
        }

        let body = fixture.build(&world, root).unwrap();

        assert!(body.is_dynamic());
        assert_eq!(body.shapes().len(), 3);
        assert_eq!(fixture.native.collider_count(), 3);
        assert!((body.shapes()[0].offset() - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_mass_split_across_shapes() {
        let mut fixture = Fixture::new();
        let mut world = World::new();
        let entity = world.spawn((
            RigidbodyComponent {
                mass: 6.0,
                ..Default::default()
            },
            BoxColliderComponent::default(),
            SphereColliderComponent::default(),
        ));

        let body = fixture.build(&world, entity).unwrap();
        assert!((body.mass(&fixture.native) - 6.0).abs() < 1e-4);

        body.set_mass(&mut fixture.native, 2.0);
        assert!((body.mass(&fixture.native) - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_initial_velocity_is_rotated_to_world() {
        let mut fixture = Fixture::new();
        let mut world = World::new();
        let entity = world.spawn((
            Transform::from_position_rotation(
                Vec3::ZERO,
                Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            ),
            RigidbodyComponent {
                initial_linear_velocity: Vec3::X,
                ..Default::default()
            },
            SphereColliderComponent::default(),
        ));

        let body = fixture.build(&world, entity).unwrap();
        let velocity = body.linear_velocity(&fixture.native);

        assert!((velocity - Vec3::NEG_Z).length() < 1e-4);
    }

    #[test]
    fn test_position_setter_keeps_rotation() {
        let mut fixture = Fixture::new();
        let mut world = World::new();
        let rotation = Quat::from_rotation_x(0.3);
        let entity = world.spawn((
            Transform::from_position_rotation(Vec3::ZERO, rotation),
            RigidbodyComponent::default(),
            BoxColliderComponent::default(),
        ));
        let body = fixture.build(&world, entity).unwrap();

        body.set_position(&mut fixture.native, Vec3::new(1.0, 2.0, 3.0));
        assert!(body.rotation(&fixture.native).dot(rotation).abs() > 0.9999);

        body.set_rotation(&mut fixture.native, Quat::IDENTITY);
        assert!((body.position(&fixture.native) - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn test_force_modes() {
        let mut fixture = Fixture::new();
        let mut world = World::new();
        let entity = world.spawn((
            RigidbodyComponent {
                mass: 2.0,
                linear_drag: 0.0,
                ..Default::default()
            },
            SphereColliderComponent::default(),
        ));
        let body = fixture.build(&world, entity).unwrap();

        body.add_force(&mut fixture.native, Vec3::X * 4.0, ForceMode::Impulse);
        assert!((body.linear_velocity(&fixture.native) - Vec3::X * 2.0).length() < 1e-4);

        body.add_force(&mut fixture.native, Vec3::Y, ForceMode::VelocityChange);
        assert!((body.linear_velocity(&fixture.native) - Vec3::new(2.0, 1.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_constraints_roundtrip() {
        let mut fixture = Fixture::new();
        let mut world = World::new();
        let entity = world.spawn((
            RigidbodyComponent {
                constraints: PhysicsAxis::ROTATION,
                ..Default::default()
            },
            BoxColliderComponent::default(),
        ));
        let body = fixture.build(&world, entity).unwrap();

        assert_eq!(body.constraints(&fixture.native), PhysicsAxis::ROTATION);
        body.set_constraints(&mut fixture.native, PhysicsAxis::TRANSLATION_Y);
        assert_eq!(body.constraints(&fixture.native), PhysicsAxis::TRANSLATION_Y);
    }

    #[test]
    fn test_static_body_ignores_forces() {
        let mut fixture = Fixture::new();
        let mut world = World::new();
        let entity = world.spawn((BoxColliderComponent::default(),));
        let body = fixture.build(&world, entity).unwrap();

        body.add_force(&mut fixture.native, Vec3::X * 100.0, ForceMode::Impulse);
        body.set_linear_velocity(&mut fixture.native, Vec3::ONE);

        assert_eq!(body.linear_velocity(&fixture.native), Vec3::ZERO);
    }

    #[test]
    fn test_release_removes_native_objects() {
        let mut fixture = Fixture::new();
        let mut world = World::new();
        let entity = world.spawn((
            BoxColliderComponent::default(),
            CapsuleColliderComponent::default(),
        ));
        let body = fixture.build(&world, entity).unwrap();
        assert_eq!(fixture.native.collider_count(), 2);

        body.release(&mut fixture.native);

        assert_eq!(fixture.native.body_count(), 0);
        assert_eq!(fixture.native.collider_count(), 0);
    }
}
