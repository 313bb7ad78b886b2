//! Error types for the physics system

use thiserror::Error;
use uuid::Uuid;

/// Physics system errors
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// Settings rejected by the backend
    #[error("Invalid physics configuration: {0}")]
    InvalidConfig(String),

    /// Query issued with a shape the backend cannot cast or overlap
    #[error("Unsupported query shape: {0}")]
    UnsupportedQueryShape(&'static str),

    /// Another layer already uses this name
    #[error("Layer name already in use: {0}")]
    LayerNameInUse(String),

    /// Built-in layers cannot be removed or renamed
    #[error("Layer {0} is reserved")]
    ReservedLayer(u32),

    /// All layer slots are taken
    #[error("No free collision layer slots (capacity {0})")]
    LayerCapacityExceeded(usize),

    /// Layer id does not refer to a registered layer
    #[error("Invalid collision layer: {0}")]
    InvalidLayer(u32),

    /// Entity has no physics body in this scene
    #[error("Entity {0} has no physics body")]
    BodyNotFound(Uuid),

    /// Operation requires a dynamic body
    #[error("Entity {0} has a static body")]
    NotDynamic(Uuid),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

/// Result type for physics operations
pub type Result<T> = std::result::Result<T, PhysicsError>;
