//! World wrapper around hecs
//!
//! Adds stable entity identities and the parent/child hierarchy on top of the
//! raw hecs storage.

use glam::Mat4;
use hecs::Entity;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use super::components::{IdComponent, Transform};
use super::hierarchy::{Children, GlobalTransform, Parent};

/// Game world containing all entities and components
pub struct World {
    /// The underlying hecs world
    pub inner: hecs::World,
    /// Stable identity lookup
    uuid_index: FxHashMap<Uuid, Entity>,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
            uuid_index: FxHashMap::default(),
        }
    }

    /// Spawn an entity with a fresh identity and a default transform
    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> Entity {
        self.spawn_with_uuid(Uuid::new_v4(), components)
    }

    /// Spawn an entity with a known identity.
    ///
    /// A `Transform` is added when the bundle does not provide one.
    pub fn spawn_with_uuid(&mut self, uuid: Uuid, components: impl hecs::DynamicBundle) -> Entity {
        let entity = self.inner.spawn(components);
        let _ = self.inner.insert_one(entity, IdComponent(uuid));
        if !self.has::<Transform>(entity) {
            let _ = self.inner.insert_one(entity, Transform::default());
        }
        if let Some(previous) = self.uuid_index.insert(uuid, entity) {
            log::warn!("Entity {uuid} spawned twice, replacing {previous:?}");
        }
        entity
    }

    /// Despawn an entity, detaching it from its parent and orphaning its children
    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        if !self.inner.contains(entity) {
            return Err(hecs::NoSuchEntity);
        }

        self.unparent(entity);
        for child in self.children(entity) {
            let _ = self.inner.remove_one::<Parent>(child);
        }
        if let Some(uuid) = self.uuid(entity) {
            self.uuid_index.remove(&uuid);
        }
        self.inner.despawn(entity)
    }

    /// Get a reference to a component
    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<'_, T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    /// Get a mutable reference to a component
    pub fn get_mut<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<hecs::RefMut<'_, T>, hecs::ComponentError> {
        self.inner.get::<&mut T>(entity)
    }

    /// Check whether an entity carries a component
    pub fn has<T: hecs::Component>(&self, entity: Entity) -> bool {
        self.inner
            .entity(entity)
            .map(|e| e.has::<T>())
            .unwrap_or(false)
    }

    /// Add or replace a component
    pub fn insert_one(
        &mut self,
        entity: Entity,
        component: impl hecs::Component,
    ) -> Result<(), hecs::NoSuchEntity> {
        self.inner.insert_one(entity, component)
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Resolve a stable identity to a live entity
    pub fn try_entity_with_uuid(&self, uuid: Uuid) -> Option<Entity> {
        self.uuid_index
            .get(&uuid)
            .copied()
            .filter(|&entity| self.inner.contains(entity))
    }

    /// Get the stable identity of an entity
    pub fn uuid(&self, entity: Entity) -> Option<Uuid> {
        self.get::<IdComponent>(entity).ok().map(|id| id.0)
    }

    // -------------------------------------------------------------------------
    // Hierarchy
    // -------------------------------------------------------------------------

    /// Attach `child` under `parent`. The local transform is kept as-is.
    pub fn set_parent(&mut self, child: Entity, parent: Entity) -> Result<(), hecs::NoSuchEntity> {
        if !self.inner.contains(child) || !self.inner.contains(parent) {
            return Err(hecs::NoSuchEntity);
        }

        self.unparent(child);
        self.inner.insert_one(child, Parent(parent))?;

        if let Ok(mut children) = self.inner.get::<&mut Children>(parent) {
            children.add(child);
            return Ok(());
        }
        let mut children = Children::default();
        children.add(child);
        self.inner.insert_one(parent, children)
    }

    /// Detach an entity from its parent, if it has one
    pub fn unparent(&mut self, child: Entity) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if let Ok(mut children) = self.inner.get::<&mut Children>(parent) {
            children.remove(child);
        }
        let _ = self.inner.remove_one::<Parent>(child);
    }

    /// Get the live parent of an entity
    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.get::<Parent>(entity)
            .ok()
            .map(|p| p.entity())
            .filter(|&parent| self.inner.contains(parent))
    }

    /// Get the live direct children of an entity
    pub fn children(&self, entity: Entity) -> Vec<Entity> {
        self.get::<Children>(entity)
            .map(|children| {
                children
                    .iter()
                    .copied()
                    .filter(|&child| self.inner.contains(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get the local transform of an entity, or identity when it has none
    pub fn local_transform(&self, entity: Entity) -> Transform {
        self.get::<Transform>(entity)
            .map(|t| *t)
            .unwrap_or_default()
    }

    /// Resolve the world-space transform by composing the parent chain
    pub fn world_transform(&self, entity: Entity) -> GlobalTransform {
        let mut matrix = self.local_transform(entity).matrix();
        let mut current = entity;
        while let Some(parent) = self.parent(current) {
            matrix = self.local_transform(parent).matrix() * matrix;
            current = parent;
        }
        GlobalTransform::new(matrix)
    }

    /// Re-express an entity's transform, currently holding world-space values,
    /// relative to its parent. Root entities are left untouched.
    pub fn convert_to_local_space(&mut self, entity: Entity) {
        let Some(parent) = self.parent(entity) else {
            return;
        };
        let parent_matrix: Mat4 = self.world_transform(parent).matrix;
        if let Ok(mut transform) = self.inner.get::<&mut Transform>(entity) {
            let local = parent_matrix.inverse() * transform.matrix();
            *transform = Transform::from_matrix(local);
        }
    }

    /// Get the number of entities
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Check if the world is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Clear all entities from the world
    pub fn clear(&mut self) {
        self.inner.clear();
        self.uuid_index.clear();
    }

    /// Query for entities with specific components
    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<'_, Q> {
        self.inner.query::<Q>()
    }

    /// Query for entities with specific components (mutable)
    pub fn query_mut<Q: hecs::Query>(&mut self) -> hecs::QueryMut<'_, Q> {
        self.inner.query_mut::<Q>()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn test_uuid_lookup() {
        let mut world = World::new();
        let uuid = Uuid::new_v4();
        let entity = world.spawn_with_uuid(uuid, (Transform::default(),));

        assert_eq!(world.try_entity_with_uuid(uuid), Some(entity));
        assert_eq!(world.uuid(entity), Some(uuid));

        world.despawn(entity).unwrap();
        assert_eq!(world.try_entity_with_uuid(uuid), None);
    }

    #[test]
    fn test_spawn_adds_transform() {
        let mut world = World::new();
        let entity = world.spawn(());

        assert!(world.has::<Transform>(entity));
        assert!(world.has::<IdComponent>(entity));
    }

    #[test]
    fn test_world_transform_composes_parents() {
        let mut world = World::new();
        let parent = world.spawn((Transform::from_position(Vec3::new(10.0, 0.0, 0.0)),));
        let child = world.spawn((Transform::from_position(Vec3::new(0.0, 2.0, 0.0)),));
        world.set_parent(child, parent).unwrap();

        let global = world.world_transform(child);
        assert!((global.position() - Vec3::new(10.0, 2.0, 0.0)).length() < 0.001);
        assert_eq!(world.children(parent), vec![child]);
        assert_eq!(world.parent(child), Some(parent));
    }

    #[test]
    fn test_convert_to_local_space() {
        let mut world = World::new();
        let parent = world.spawn((Transform::from_position_rotation(
            Vec3::new(5.0, 0.0, 0.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        ),));
        let child = world.spawn(());
        world.set_parent(child, parent).unwrap();

        // Child transform currently holds a world-space position
        world.get_mut::<Transform>(child).unwrap().position = Vec3::new(5.0, 1.0, -3.0);
        world.convert_to_local_space(child);

        let global = world.world_transform(child);
        assert!((global.position() - Vec3::new(5.0, 1.0, -3.0)).length() < 0.001);
    }

    #[test]
    fn test_despawn_detaches_hierarchy() {
        let mut world = World::new();
        let parent = world.spawn(());
        let child = world.spawn(());
        let grandchild = world.spawn(());
        world.set_parent(child, parent).unwrap();
        world.set_parent(grandchild, child).unwrap();

        world.despawn(child).unwrap();

        assert!(world.children(parent).is_empty());
        assert_eq!(world.parent(grandchild), None);
    }
}
