//! Asset storage
//!
//! Typed storage for assets keyed by [`AssetHandle`].

use rustc_hash::FxHashMap;

use super::handle::AssetHandle;

/// Storage for all assets of a specific type
#[derive(Debug)]
pub struct Assets<T> {
    assets: FxHashMap<AssetHandle, T>,
}

impl<T> Assets<T> {
    /// Create a new empty asset storage
    #[must_use]
    pub fn new() -> Self {
        Self {
            assets: FxHashMap::default(),
        }
    }

    /// Add an asset under a freshly generated handle
    pub fn add(&mut self, asset: T) -> AssetHandle {
        let handle = AssetHandle::generate();
        self.assets.insert(handle, asset);
        handle
    }

    /// Store an asset under a known handle, returning the previous asset.
    ///
    /// The null handle is rejected and the asset handed back.
    pub fn insert(&mut self, handle: AssetHandle, asset: T) -> Result<Option<T>, T> {
        if handle.is_null() {
            return Err(asset);
        }
        Ok(self.assets.insert(handle, asset))
    }

    /// Get an asset by handle
    #[must_use]
    pub fn get(&self, handle: AssetHandle) -> Option<&T> {
        self.assets.get(&handle)
    }

    /// Get an asset mutably by handle
    pub fn get_mut(&mut self, handle: AssetHandle) -> Option<&mut T> {
        self.assets.get_mut(&handle)
    }

    /// Check if a handle refers to a stored asset
    #[must_use]
    pub fn contains(&self, handle: AssetHandle) -> bool {
        self.assets.contains_key(&handle)
    }

    /// Remove an asset by handle
    pub fn remove(&mut self, handle: AssetHandle) -> Option<T> {
        self.assets.remove(&handle)
    }

    /// Get the number of stored assets
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Check if storage is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Iterate over all stored assets
    pub fn iter(&self) -> impl Iterator<Item = (AssetHandle, &T)> {
        self.assets.iter().map(|(&handle, asset)| (handle, asset))
    }
}

impl<T> Default for Assets<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut assets = Assets::<String>::new();
        let handle = assets.add("hello".to_string());

        assert_eq!(assets.get(handle).map(String::as_str), Some("hello"));
        assert!(assets.contains(handle));
    }

    #[test]
    fn test_insert_rejects_null_handle() {
        let mut assets = Assets::<i32>::new();

        assert_eq!(assets.insert(AssetHandle::NULL, 42), Err(42));
        assert!(assets.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut assets = Assets::<u32>::new();
        let handle = assets.add(100);

        assert_eq!(assets.remove(handle), Some(100));
        assert!(assets.get(handle).is_none());
    }
}
