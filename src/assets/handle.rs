//! Asset handle implementation
//!
//! Handles are plain identifiers; the asset itself lives in an [`Assets`](super::Assets)
//! storage and is looked up on demand.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Global counter for generating unique asset IDs
static NEXT_ASSET_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of an asset. Handle `0` never refers to an asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetHandle(pub u64);

impl AssetHandle {
    /// The handle that refers to nothing
    pub const NULL: Self = Self(0);

    /// Generate a new unique handle
    #[must_use]
    pub fn generate() -> Self {
        Self(NEXT_ASSET_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Whether this is the null handle
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_handles_are_unique() {
        let a = AssetHandle::generate();
        let b = AssetHandle::generate();

        assert_ne!(a, b);
        assert!(!a.is_null());
        assert!(!b.is_null());
    }

    #[test]
    fn test_null_handle() {
        assert!(AssetHandle::NULL.is_null());
        assert_eq!(AssetHandle::default(), AssetHandle::NULL);
    }
}
