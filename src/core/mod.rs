//! Core engine module
//!
//! Contains the runtime scene that ties entities to their physics world

mod scene;

pub use scene::{Scene, SceneState};
