//! Physics simulation module
//!
//! Built on top of rapier3d. A process-wide [`PhysicsSystem`] owns settings,
//! collision layers and materials and creates one [`PhysicsScene`] per running
//! scene. Entities with rigidbody or collider components become
//! [`PhysicsBody`]s; entities with a character controller component become
//! [`CharacterController`]s.

mod api;
mod body;
mod character_controller;
mod error;
mod events;
mod layers;
mod material;
mod queries;
mod scene;
mod settings;
mod shapes;
mod system;
mod timestep;
mod types;
mod world;

pub use api::{PhysicsApi, PhysicsApiType, RapierApi, create_api};
pub use body::PhysicsBody;
pub use character_controller::CharacterController;
pub use error::{PhysicsError, Result};
pub use events::{EventBridge, EventSink};
pub use layers::{CollisionFilter, DEFAULT_LAYER, MAX_LAYERS, PhysicsLayer, PhysicsLayerManager};
pub use material::{MaterialCache, PhysicsMaterial};
pub use queries::{HitInfo, MAX_OVERLAP_RESULTS, QueryShape, ShapeCastInfo, ShapeOverlapInfo};
pub use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};
pub use scene::{PhysicsScene, SceneContext};
pub use settings::{
    DEFAULT_FIXED_TIMESTEP, DEFAULT_MAX_FRAME_DELTA, PhysicsProjectSettings, PhysicsSettings,
};
pub use shapes::{PhysicsShape, ShapeContext, ShapeKind};
pub use system::PhysicsSystem;
pub use timestep::SubStepper;
pub use types::{ForceMode, LayerMask, PhysicsAxis, PhysicsEventType, ShapeType};
pub use world::NativeWorld;
