//! Physics subsystem of a 3D game engine
//!
//! This crate provides:
//! - Rigid bodies and compound shapes built from entity components
//! - Kinematic character controllers
//! - Fixed sub-step simulation with transform write-back
//! - Collision and trigger events resolved to entity identities
//! - Named collision layers and scene queries
//! - Entity Component System (ECS) scene graph built on hecs

pub mod assets;
pub mod core;
pub mod ecs;
pub mod physics;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::assets::{AssetHandle, Assets};
    pub use crate::core::{Scene, SceneState};
    pub use crate::ecs::{
        BoxColliderComponent, CapsuleColliderComponent, CharacterControllerComponent, Inactive,
        Name, RigidbodyComponent, SphereColliderComponent, Transform, World,
    };
    pub use crate::physics::{
        CharacterController, ForceMode, HitInfo, LayerMask, PhysicsAxis, PhysicsBody,
        PhysicsError, PhysicsEventType, PhysicsMaterial, PhysicsScene, PhysicsSettings,
        PhysicsSystem, QueryShape, ShapeCastInfo, ShapeOverlapInfo,
    };
    pub use glam::{Mat4, Quat, Vec3};
}
