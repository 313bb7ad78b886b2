//! Physics materials and the process-wide material cache

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::assets::{AssetHandle, Assets};

/// Surface response of a collider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsMaterial {
    pub static_friction: f32,
    /// Friction coefficient handed to the solver
    pub dynamic_friction: f32,
    pub restitution: f32,
}

impl PhysicsMaterial {
    #[must_use]
    pub const fn new(static_friction: f32, dynamic_friction: f32, restitution: f32) -> Self {
        Self {
            static_friction,
            dynamic_friction,
            restitution,
        }
    }
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self::new(0.8, 0.7, 0.1)
    }
}

/// Materials resolved by asset handle, shared between scenes.
///
/// Entries are created on first use and live for the whole session.
#[derive(Debug, Clone, Default)]
pub struct MaterialCache {
    default_material: PhysicsMaterial,
    materials: Arc<RwLock<FxHashMap<AssetHandle, PhysicsMaterial>>>,
}

impl MaterialCache {
    #[must_use]
    pub fn new(default_material: PhysicsMaterial) -> Self {
        Self {
            default_material,
            materials: Arc::default(),
        }
    }

    /// Fallback used for null or unresolved handles
    #[must_use]
    pub fn default_material(&self) -> PhysicsMaterial {
        self.default_material
    }

    /// Resolve a material handle, falling back to the default material
    pub fn resolve(&self, handle: AssetHandle, assets: &Assets<PhysicsMaterial>) -> PhysicsMaterial {
        if handle.is_null() {
            return self.default_material;
        }
        if let Some(material) = self.materials.read().get(&handle) {
            return *material;
        }

        match assets.get(handle) {
            Some(material) => {
                self.materials.write().insert(handle, *material);
                *material
            }
            None => {
                log::warn!("Physics material {handle} not found, using the default material");
                self.default_material
            }
        }
    }

    /// Number of cached materials
    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handle_uses_default() {
        let cache = MaterialCache::default();
        let assets = Assets::new();

        assert_eq!(cache.resolve(AssetHandle::NULL, &assets), PhysicsMaterial::default());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_resolved_material_is_cached() {
        let cache = MaterialCache::default();
        let mut assets = Assets::new();
        let ice = PhysicsMaterial::new(0.1, 0.05, 0.0);
        let handle = assets.add(ice);

        assert_eq!(cache.resolve(handle, &assets), ice);

        // Cached entries survive the asset being unloaded
        assets.remove(handle);
        assert_eq!(cache.resolve(handle, &assets), ice);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unknown_handle_falls_back() {
        let cache = MaterialCache::new(PhysicsMaterial::new(1.0, 1.0, 0.0));
        let assets = Assets::new();

        let resolved = cache.resolve(AssetHandle(42), &assets);
        assert_eq!(resolved, PhysicsMaterial::new(1.0, 1.0, 0.0));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = MaterialCache::default();
        let shared = cache.clone();
        let mut assets = Assets::new();
        let handle = assets.add(PhysicsMaterial::new(0.5, 0.5, 0.5));

        shared.resolve(handle, &assets);
        assert_eq!(cache.len(), 1);
    }
}
