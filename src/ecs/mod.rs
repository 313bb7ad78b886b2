//! Entity Component System module
//!
//! Built on top of the hecs ECS library

mod components;
mod hierarchy;
mod world;

pub use components::{
    BoxColliderComponent, CapsuleColliderComponent, CharacterControllerComponent, IdComponent,
    Inactive, Name, RigidbodyComponent, SphereColliderComponent, Transform,
};
pub use hierarchy::{Children, GlobalTransform, Parent};
pub use world::World;
