//! Native rigid-body world backed by rapier3d

use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;

/// Convert glam Vec3 to a rapier vector
pub(crate) fn vec_to_rapier(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

/// Convert a rapier vector to glam Vec3
pub(crate) fn rapier_to_vec(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// Convert glam Quat to rapier3d UnitQuaternion
pub(crate) fn quat_to_rapier(q: Quat) -> UnitQuaternion<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

/// Convert rapier3d UnitQuaternion to glam Quat
pub(crate) fn rapier_to_quat(uq: &UnitQuaternion<Real>) -> Quat {
    let q = uq.quaternion();
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

/// Build a rapier pose from a glam position and rotation
pub(crate) fn isometry(position: Vec3, rotation: Quat) -> Isometry<Real> {
    Isometry::from_parts(
        Translation3::new(position.x, position.y, position.z),
        quat_to_rapier(rotation),
    )
}

/// The rapier sets, pipeline and solver state of one physics scene
pub struct NativeWorld {
    /// Gravity vector
    pub gravity: Vec3,
    pipeline: PhysicsPipeline,
    pub(crate) island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    pub(crate) impulse_joints: ImpulseJointSet,
    pub(crate) multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    pub(crate) query_pipeline: QueryPipeline,
    integration_parameters: IntegrationParameters,
}

impl NativeWorld {
    /// Create an empty world stepping `fixed_timestep` seconds at a time
    pub fn new(gravity: Vec3, fixed_timestep: f32) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: fixed_timestep,
            ..IntegrationParameters::default()
        };
        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            integration_parameters,
        }
    }

    /// Length of one step in seconds
    pub fn timestep(&self) -> f32 {
        self.integration_parameters.dt
    }

    pub fn set_timestep(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
    }

    /// Advance the simulation by exactly one timestep.
    ///
    /// Contact and intersection events are delivered to `events` synchronously,
    /// before this call returns.
    pub fn step(&mut self, events: &dyn EventHandler) {
        self.pipeline.step(
            &vec_to_rapier(self.gravity),
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            events,
        );
    }

    /// Refresh the query acceleration structure after adding or moving colliders
    pub fn update_queries(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    /// Insert a rigid body
    pub fn insert_body(&mut self, body: RigidBody) -> RigidBodyHandle {
        self.bodies.insert(body)
    }

    /// Attach a collider to a body
    pub fn insert_collider(&mut self, collider: Collider, parent: RigidBodyHandle) -> ColliderHandle {
        self.colliders
            .insert_with_parent(collider, parent, &mut self.bodies)
    }

    /// Remove a rigid body together with every collider attached to it
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    pub fn collider_mut(&mut self, handle: ColliderHandle) -> Option<&mut Collider> {
        self.colliders.get_mut(handle)
    }

    /// Clear user forces and torques on every body
    pub fn reset_forces(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            if body.is_dynamic() {
                body.reset_forces(false);
                body.reset_torques(false);
            }
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoEvents;

    impl EventHandler for NoEvents {
        fn handle_collision_event(
            &self,
            _bodies: &RigidBodySet,
            _colliders: &ColliderSet,
            _event: CollisionEvent,
            _contact_pair: Option<&ContactPair>,
        ) {
        }

        fn handle_contact_force_event(
            &self,
            _dt: Real,
            _bodies: &RigidBodySet,
            _colliders: &ColliderSet,
            _contact_pair: &ContactPair,
            _total_force_magnitude: Real,
        ) {
        }
    }

    #[test]
    fn test_quat_conversion() {
        let q = Quat::from_rotation_y(0.7);
        let back = rapier_to_quat(&quat_to_rapier(q));

        assert!(q.dot(back).abs() > 0.9999);
    }

    #[test]
    fn test_step_applies_gravity() {
        let mut world = NativeWorld::new(Vec3::new(0.0, -9.81, 0.0), 1.0 / 60.0);
        let handle = world.insert_body(
            RigidBodyBuilder::dynamic()
                .translation(vector![0.0, 10.0, 0.0])
                .build(),
        );
        world.insert_collider(ColliderBuilder::ball(0.5).build(), handle);

        for _ in 0..30 {
            world.step(&NoEvents);
        }

        let y = world.body(handle).unwrap().translation().y;
        assert!(y < 10.0);
    }

    #[test]
    fn test_remove_body_releases_colliders() {
        let mut world = NativeWorld::new(Vec3::ZERO, 1.0 / 60.0);
        let handle = world.insert_body(RigidBodyBuilder::fixed().build());
        world.insert_collider(ColliderBuilder::cuboid(1.0, 1.0, 1.0).build(), handle);
        world.insert_collider(ColliderBuilder::ball(1.0).build(), handle);

        world.remove_body(handle);

        assert_eq!(world.body_count(), 0);
        assert_eq!(world.collider_count(), 0);
    }
}
