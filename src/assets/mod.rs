//! Asset management
//!
//! Provides:
//! - Copyable asset handles
//! - Typed asset storage used to resolve physics materials

mod handle;
mod storage;

pub use handle::AssetHandle;
pub use storage::Assets;
