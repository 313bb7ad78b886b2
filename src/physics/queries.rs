//! Scene query requests and results

use glam::{Quat, Vec3};
use rapier3d::prelude::SharedShape;
use uuid::Uuid;

use super::error::{PhysicsError, Result};
use super::types::LayerMask;

/// Upper bound on entities returned by one overlap query
pub const MAX_OVERLAP_RESULTS: usize = 50;

/// First hit of a ray or shape cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitInfo {
    /// Entity owning the collider that was hit
    pub entity: Uuid,
    /// World-space contact point
    pub position: Vec3,
    /// Surface normal at the contact point
    pub normal: Vec3,
    /// Distance travelled along the ray or cast direction
    pub distance: f32,
}

/// Shapes accepted by cast and overlap queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryShape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// Upright capsule; `height` includes both caps
    Capsule { radius: f32, height: f32 },
    /// Triangle meshes cannot be used as query shapes
    Mesh,
}

impl QueryShape {
    /// Build the native query shape, rejecting meshes
    pub(crate) fn to_shared_shape(&self) -> Result<SharedShape> {
        match *self {
            Self::Box { half_extents } => Ok(SharedShape::cuboid(
                half_extents.x,
                half_extents.y,
                half_extents.z,
            )),
            Self::Sphere { radius } => Ok(SharedShape::ball(radius)),
            Self::Capsule { radius, height } => Ok(SharedShape::capsule_y(
                ((height - 2.0 * radius) * 0.5).max(0.0),
                radius,
            )),
            Self::Mesh => {
                log::error!("Mesh shapes are not supported in scene queries");
                Err(PhysicsError::UnsupportedQueryShape("Mesh"))
            }
        }
    }
}

/// Sweep a shape along a direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeCastInfo {
    pub shape: QueryShape,
    pub origin: Vec3,
    pub rotation: Quat,
    /// Sweep direction, normalized by the query
    pub direction: Vec3,
    pub max_distance: f32,
    pub layer_mask: LayerMask,
}

impl ShapeCastInfo {
    #[must_use]
    pub fn new(shape: QueryShape, origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Self {
            shape,
            origin,
            rotation: Quat::IDENTITY,
            direction,
            max_distance,
            layer_mask: LayerMask::ALL,
        }
    }
}

/// Find every collider overlapping a shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeOverlapInfo {
    pub shape: QueryShape,
    pub origin: Vec3,
    pub rotation: Quat,
    pub layer_mask: LayerMask,
}

impl ShapeOverlapInfo {
    #[must_use]
    pub fn new(shape: QueryShape, origin: Vec3) -> Self {
        Self {
            shape,
            origin,
            rotation: Quat::IDENTITY,
            layer_mask: LayerMask::ALL,
        }
    }
}
