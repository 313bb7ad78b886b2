//! Common ECS components

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assets::AssetHandle;
use crate::physics::PhysicsAxis;

/// Stable identity of an entity, preserved across scene runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdComponent(pub Uuid);

/// Transform component for position, rotation, and scale.
///
/// Values are relative to the entity's parent, or world space for root entities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position relative to the parent
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
    /// Scale factor
    pub scale: Vec3,
}

impl Transform {
    /// Create a new transform at the origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with just a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Create a transform from all three parts
    pub fn from_parts(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Decompose a matrix into a transform
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Get the transformation matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Get the forward direction (negative Z in local space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Get the right direction (positive X in local space)
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Get the up direction (positive Y in local space)
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Translate by a delta
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Rotate by euler angles (in radians)
    pub fn rotate_euler(&mut self, euler: Vec3) {
        self.rotation = Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z) * self.rotation;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Name component for debugging
#[derive(Debug, Clone)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Marker for entities excluded from physics when a scene starts
#[derive(Debug, Clone, Copy, Default)]
pub struct Inactive;

// ============================================================================
// Physics Components
// ============================================================================

/// Makes an entity (or its collider children) a dynamic rigid body.
///
/// Entities with colliders but no rigidbody become static bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidbodyComponent {
    /// Total mass in kilograms
    pub mass: f32,
    /// Linear damping
    pub linear_drag: f32,
    /// Angular damping
    pub angular_drag: f32,
    /// Whether gravity affects the body
    pub use_gravity: bool,
    /// Locked translation/rotation axes
    pub constraints: PhysicsAxis,
    /// Initial linear velocity in the body's local space
    pub initial_linear_velocity: Vec3,
    /// Initial angular velocity in the body's local space
    pub initial_angular_velocity: Vec3,
}

impl Default for RigidbodyComponent {
    fn default() -> Self {
        Self {
            mass: 1.0,
            linear_drag: 0.01,
            angular_drag: 0.05,
            use_gravity: true,
            constraints: PhysicsAxis::empty(),
            initial_linear_velocity: Vec3::ZERO,
            initial_angular_velocity: Vec3::ZERO,
        }
    }
}

/// Box collision shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxColliderComponent {
    pub half_size: Vec3,
    pub offset: Vec3,
    pub layer_id: u32,
    pub physics_material: AssetHandle,
    pub is_trigger: bool,
}

impl Default for BoxColliderComponent {
    fn default() -> Self {
        Self {
            half_size: Vec3::splat(0.5),
            offset: Vec3::ZERO,
            layer_id: 0,
            physics_material: AssetHandle::NULL,
            is_trigger: false,
        }
    }
}

/// Sphere collision shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereColliderComponent {
    pub radius: f32,
    pub offset: Vec3,
    pub layer_id: u32,
    pub physics_material: AssetHandle,
    pub is_trigger: bool,
}

impl Default for SphereColliderComponent {
    fn default() -> Self {
        Self {
            radius: 0.5,
            offset: Vec3::ZERO,
            layer_id: 0,
            physics_material: AssetHandle::NULL,
            is_trigger: false,
        }
    }
}

/// Capsule collision shape, `height` is the full height including both caps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleColliderComponent {
    pub radius: f32,
    pub height: f32,
    pub offset: Vec3,
    pub layer_id: u32,
    pub physics_material: AssetHandle,
    pub is_trigger: bool,
}

impl Default for CapsuleColliderComponent {
    fn default() -> Self {
        Self {
            radius: 0.5,
            height: 2.0,
            offset: Vec3::ZERO,
            layer_id: 0,
            physics_material: AssetHandle::NULL,
            is_trigger: false,
        }
    }
}

/// Kinematic capsule moved by explicit displacement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterControllerComponent {
    /// Maximum walkable slope in degrees
    pub slope_limit: f32,
    /// Maximum obstacle height the controller steps over
    pub step_offset: f32,
    pub radius: f32,
    /// Full visual height including both caps
    pub height: f32,
    /// Capsule center relative to the entity position
    pub offset: Vec3,
    pub layer_id: u32,
}

impl Default for CharacterControllerComponent {
    fn default() -> Self {
        Self {
            slope_limit: 45.0,
            step_offset: 0.3,
            radius: 0.5,
            height: 2.0,
            offset: Vec3::ZERO,
            layer_id: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_matrix_roundtrip() {
        let transform = Transform::from_parts(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(0.5),
            Vec3::splat(2.0),
        );

        let restored = Transform::from_matrix(transform.matrix());

        assert!((restored.position - transform.position).length() < 0.001);
        assert!((restored.scale - transform.scale).length() < 0.001);
        assert!(restored.rotation.dot(transform.rotation).abs() > 0.999);
    }

    #[test]
    fn test_transform_directions() {
        let transform = Transform::new();

        assert!((transform.forward() - Vec3::NEG_Z).length() < 0.001);
        assert!((transform.right() - Vec3::X).length() < 0.001);
        assert!((transform.up() - Vec3::Y).length() < 0.001);
    }

    #[test]
    fn test_collider_defaults_use_default_layer() {
        assert_eq!(BoxColliderComponent::default().layer_id, 0);
        assert_eq!(SphereColliderComponent::default().layer_id, 0);
        assert_eq!(CapsuleColliderComponent::default().layer_id, 0);
        assert!(CapsuleColliderComponent::default().physics_material.is_null());
    }
}
