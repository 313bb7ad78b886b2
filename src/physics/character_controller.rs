//! Kinematic character controllers
//!
//! A controller is a capsule on a kinematic body. Gameplay code queues
//! displacement with [`CharacterController::move_by`]; the scene resolves the
//! queued displacement against the world once per sub-step.

use glam::Vec3;
use hecs::Entity;
use rapier3d::control::{CharacterAutostep, CharacterLength, KinematicCharacterController};
use rapier3d::prelude::*;
use uuid::Uuid;

use super::layers::{CollisionFilter, PhysicsLayerManager};
use super::world::{NativeWorld, rapier_to_vec, vec_to_rapier};
use crate::ecs::{CharacterControllerComponent, World};

/// Gap kept between the capsule and obstacles
const SKIN_WIDTH: f32 = 0.01;

/// Half the cylindrical part of a capsule with the given visual height
fn capsule_half_height(height: f32, radius: f32) -> f32 {
    ((height - 2.0 * radius) * 0.5).max(0.0)
}

/// A kinematic capsule moved by explicit displacement
#[derive(Debug)]
pub struct CharacterController {
    entity: Uuid,
    body: RigidBodyHandle,
    collider: ColliderHandle,
    controller: KinematicCharacterController,
    filter: CollisionFilter,
    radius: f32,
    /// Full height including both caps
    height: f32,
    /// Capsule center relative to the entity position
    offset: Vec3,
    step_offset: f32,
    /// Cosine of the maximum walkable slope
    slope_limit_cos: f32,
    /// World position of the capsule center
    position: Vec3,
    /// Displacement queued since the last sub-step
    displacement: Vec3,
    grounded: bool,
}

impl CharacterController {
    /// Build the controller for `entity` and insert it into `native`.
    ///
    /// Returns `None` when the entity has no controller component.
    pub fn new(
        layers: &PhysicsLayerManager,
        world: &World,
        entity: Entity,
        native: &mut NativeWorld,
    ) -> Option<Self> {
        let uuid = world.uuid(entity)?;
        let component = *world.get::<CharacterControllerComponent>(entity).ok()?;
        let filter = layers.filter_for(component.layer_id);
        let position = world.world_transform(entity).position() + component.offset;

        let body = native.insert_body(
            RigidBodyBuilder::kinematic_position_based()
                .translation(vec_to_rapier(position))
                .user_data(uuid.as_u128())
                .build(),
        );
        let collider = native.insert_collider(
            ColliderBuilder::capsule_y(
                capsule_half_height(component.height, component.radius),
                component.radius,
            )
            .collision_groups(filter.interaction_groups())
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(uuid.as_u128())
            .build(),
            body,
        );

        let mut controller = Self {
            entity: uuid,
            body,
            collider,
            controller: KinematicCharacterController {
                offset: CharacterLength::Absolute(SKIN_WIDTH),
                snap_to_ground: Some(CharacterLength::Absolute(
                    component.step_offset.max(SKIN_WIDTH),
                )),
                ..KinematicCharacterController::default()
            },
            filter,
            radius: component.radius,
            height: component.height,
            offset: component.offset,
            step_offset: component.step_offset,
            slope_limit_cos: 1.0,
            position,
            displacement: Vec3::ZERO,
            grounded: false,
        };
        controller.set_step_offset(component.step_offset);
        controller.set_slope_limit(component.slope_limit);

        log::debug!("Created character controller for {uuid}");
        Some(controller)
    }

    /// Remove the kinematic body and its capsule
    pub fn release(self, native: &mut NativeWorld) {
        native.remove_body(self.body);
    }

    /// Queue a displacement; calls within one frame add up
    pub fn move_by(&mut self, displacement: Vec3) {
        self.displacement += displacement;
    }

    /// Displacement queued for the next sub-step
    #[must_use]
    pub fn pending_displacement(&self) -> Vec3 {
        self.displacement
    }

    /// Resolve the queued displacement against the world and clear it
    pub fn simulate(&mut self, dt: f32, native: &mut NativeWorld) {
        let desired = std::mem::take(&mut self.displacement);

        let Some(collider) = native.colliders.get(self.collider) else {
            return;
        };
        let pose = Isometry::translation(self.position.x, self.position.y, self.position.z);
        let filter = QueryFilter::new()
            .groups(self.filter.interaction_groups())
            .exclude_sensors()
            .exclude_rigid_body(self.body);

        let movement = self.controller.move_shape(
            dt,
            &native.bodies,
            &native.colliders,
            &native.query_pipeline,
            collider.shape(),
            &pose,
            vec_to_rapier(desired),
            filter,
            |_| {},
        );

        self.grounded = movement.grounded;
        self.position += rapier_to_vec(&movement.translation);
        if let Some(rb) = native.body_mut(self.body) {
            rb.set_next_kinematic_translation(vec_to_rapier(self.position));
        }
    }

    /// Place the capsule center directly
    pub fn set_position(&mut self, native: &mut NativeWorld, position: Vec3) {
        self.position = position;
        if let Some(rb) = native.body_mut(self.body) {
            rb.set_translation(vec_to_rapier(position), true);
        }
    }

    /// Change the visual height, keeping the capsule bottom in place
    pub fn resize(&mut self, native: &mut NativeWorld, height: f32) {
        let lift = (height - self.height) * 0.5;
        self.height = height;
        if let Some(collider) = native.collider_mut(self.collider) {
            collider.set_shape(SharedShape::capsule_y(
                capsule_half_height(height, self.radius),
                self.radius,
            ));
        }
        self.set_position(native, self.position + Vec3::Y * lift);
    }

    #[must_use]
    pub fn entity(&self) -> Uuid {
        self.entity
    }

    /// World position of the capsule center
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Offset between the entity position and the capsule center
    #[must_use]
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Whether the last resolved move ended on the ground
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[must_use]
    pub fn step_offset(&self) -> f32 {
        self.step_offset
    }

    pub fn set_step_offset(&mut self, step_offset: f32) {
        self.step_offset = step_offset;
        self.controller.autostep = (step_offset > 0.0).then_some(CharacterAutostep {
            max_height: CharacterLength::Absolute(step_offset),
            min_width: CharacterLength::Relative(0.5),
            include_dynamic_bodies: false,
        });
    }

    /// Maximum walkable slope in degrees
    #[must_use]
    pub fn slope_limit(&self) -> f32 {
        self.slope_limit_cos.clamp(-1.0, 1.0).acos().to_degrees()
    }

    pub fn set_slope_limit(&mut self, degrees: f32) {
        self.slope_limit_cos = degrees.to_radians().cos();
        let angle = degrees.to_radians();
        self.controller.max_slope_climb_angle = angle;
        self.controller.min_slope_slide_angle = angle;
    }

    #[must_use]
    pub fn body_handle(&self) -> RigidBodyHandle {
        self.body
    }

    #[must_use]
    pub fn collider_handle(&self) -> ColliderHandle {
        self.collider
    }
}
