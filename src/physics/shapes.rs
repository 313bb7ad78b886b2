//! Shape factory
//!
//! Builds collision shapes from collider components. Sizes are scaled by the
//! entity's world scale; layer and material references are resolved here so that
//! bodies only deal with finished shapes.

use glam::{Quat, Vec3};
use hecs::Entity;
use rapier3d::prelude::*;

use super::layers::{CollisionFilter, PhysicsLayerManager};
use super::material::{MaterialCache, PhysicsMaterial};
use super::types::ShapeType;
use super::world::isometry;
use crate::assets::{AssetHandle, Assets};
use crate::ecs::{
    BoxColliderComponent, CapsuleColliderComponent, SphereColliderComponent, Transform, World,
};

/// Scaled geometry of a collision primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeKind {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// Capsule along local Y; `half_height` excludes the caps
    Capsule { radius: f32, half_height: f32 },
}

impl ShapeKind {
    #[must_use]
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Self::Box { .. } => ShapeType::Box,
            Self::Sphere { .. } => ShapeType::Sphere,
            Self::Capsule { .. } => ShapeType::Capsule,
        }
    }

    /// Build the native shape.
    ///
    /// Capsules are built along X and turned upright by [`Self::axis_rotation`].
    pub(crate) fn to_shared_shape(&self) -> SharedShape {
        match *self {
            Self::Box { half_extents } => {
                SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Self::Sphere { radius } => SharedShape::ball(radius),
            Self::Capsule {
                radius,
                half_height,
            } => SharedShape::capsule_x(half_height, radius),
        }
    }

    /// Extra local rotation aligning the native primitive with local Y
    #[must_use]
    pub fn axis_rotation(&self) -> Quat {
        match self {
            Self::Capsule { .. } => Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            _ => Quat::IDENTITY,
        }
    }
}

/// Layer table and material lookups used while building shapes
#[derive(Clone, Copy)]
pub struct ShapeContext<'a> {
    pub layers: &'a PhysicsLayerManager,
    pub materials: &'a MaterialCache,
    pub material_assets: &'a Assets<PhysicsMaterial>,
}

impl ShapeContext<'_> {
    fn filter(&self, layer_id: u32) -> CollisionFilter {
        self.layers.filter_for(layer_id)
    }

    fn material(&self, handle: AssetHandle) -> PhysicsMaterial {
        self.materials.resolve(handle, self.material_assets)
    }
}

/// A collision primitive owned by one physics body
#[derive(Debug, Clone)]
pub struct PhysicsShape {
    kind: ShapeKind,
    /// Offset from the body origin
    offset: Vec3,
    /// Rotation relative to the body
    rotation: Quat,
    material: PhysicsMaterial,
    filter: CollisionFilter,
    is_trigger: bool,
    /// Set once the shape is attached to a native body
    pub(crate) handle: Option<ColliderHandle>,
}

impl PhysicsShape {
    /// Create a detached shape
    #[must_use]
    pub fn new(kind: ShapeKind, material: PhysicsMaterial, filter: CollisionFilter) -> Self {
        Self {
            kind,
            offset: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            material,
            filter,
            is_trigger: false,
            handle: None,
        }
    }

    /// Place the shape relative to its body
    #[must_use]
    pub fn with_local_pose(mut self, offset: Vec3, rotation: Quat) -> Self {
        self.offset = offset;
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub fn with_trigger(mut self, is_trigger: bool) -> Self {
        self.is_trigger = is_trigger;
        self
    }

    /// Build the shape for one collider component on `entity`.
    ///
    /// Compound shapes live on a child of the body's entity and are offset by
    /// the child's local transform. Returns `None` when the component is missing.
    pub fn from_collider(
        ctx: &ShapeContext<'_>,
        world: &World,
        entity: Entity,
        shape_type: ShapeType,
        compound: bool,
    ) -> Option<Self> {
        let scale = world.world_transform(entity).scale();

        let (kind, offset, layer_id, material, is_trigger) = match shape_type {
            ShapeType::Box => {
                let collider = *world.get::<BoxColliderComponent>(entity).ok()?;
                let kind = ShapeKind::Box {
                    half_extents: collider.half_size * scale,
                };
                (
                    kind,
                    collider.offset,
                    collider.layer_id,
                    collider.physics_material,
                    collider.is_trigger,
                )
            }
            ShapeType::Sphere => {
                let collider = *world.get::<SphereColliderComponent>(entity).ok()?;
                let kind = ShapeKind::Sphere {
                    radius: collider.radius * scale.max_element(),
                };
                (
                    kind,
                    collider.offset,
                    collider.layer_id,
                    collider.physics_material,
                    collider.is_trigger,
                )
            }
            ShapeType::Capsule => {
                let collider = *world.get::<CapsuleColliderComponent>(entity).ok()?;
                let radius = collider.radius * scale.x.max(scale.z);
                let half_height = ((collider.height * scale.y - 2.0 * radius) * 0.5).max(0.0);
                let kind = ShapeKind::Capsule {
                    radius,
                    half_height,
                };
                (
                    kind,
                    collider.offset,
                    collider.layer_id,
                    collider.physics_material,
                    collider.is_trigger,
                )
            }
        };

        let (offset, rotation) = if compound {
            let local: Transform = world.local_transform(entity);
            (local.position + local.rotation * offset, local.rotation)
        } else {
            (offset, Quat::IDENTITY)
        };

        Some(
            Self::new(kind, ctx.material(material), ctx.filter(layer_id))
                .with_local_pose(offset, rotation)
                .with_trigger(is_trigger),
        )
    }

    /// Build every collider component found on `entity`
    pub fn collect(
        ctx: &ShapeContext<'_>,
        world: &World,
        entity: Entity,
        compound: bool,
    ) -> Vec<Self> {
        [ShapeType::Box, ShapeType::Sphere, ShapeType::Capsule]
            .into_iter()
            .filter_map(|shape_type| Self::from_collider(ctx, world, entity, shape_type, compound))
            .collect()
    }

    /// Build the native collider.
    ///
    /// `mass` is this shape's share of the body mass; static bodies pass `None`.
    pub(crate) fn to_collider(&self, mass: Option<f32>, user_data: u128) -> Collider {
        let mut builder = ColliderBuilder::new(self.kind.to_shared_shape())
            .position(isometry(
                self.offset,
                self.rotation * self.kind.axis_rotation(),
            ))
            .friction(self.material.dynamic_friction)
            .restitution(self.material.restitution)
            .collision_groups(self.filter.interaction_groups())
            .sensor(self.is_trigger)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(user_data);

        if self.is_trigger {
            builder = builder.active_collision_types(
                ActiveCollisionTypes::default()
                    | ActiveCollisionTypes::KINEMATIC_FIXED
                    | ActiveCollisionTypes::KINEMATIC_KINEMATIC,
            );
        }
        if let Some(mass) = mass {
            // Sets mass and derives inertia from the shape
            builder = builder.mass(mass);
        }

        builder.build()
    }

    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    #[must_use]
    pub fn shape_type(&self) -> ShapeType {
        self.kind.shape_type()
    }

    #[must_use]
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    #[must_use]
    pub fn material(&self) -> PhysicsMaterial {
        self.material
    }

    #[must_use]
    pub fn filter(&self) -> CollisionFilter {
        self.filter
    }

    #[must_use]
    pub fn is_trigger(&self) -> bool {
        self.is_trigger
    }

    /// Native collider, once attached
    #[must_use]
    pub fn handle(&self) -> Option<ColliderHandle> {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        layers: PhysicsLayerManager,
        materials: MaterialCache,
        assets: Assets<PhysicsMaterial>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                layers: PhysicsLayerManager::new(),
                materials: MaterialCache::default(),
                assets: Assets::new(),
            }
        }

        fn ctx(&self) -> ShapeContext<'_> {
            ShapeContext {
                layers: &self.layers,
                materials: &self.materials,
                material_assets: &self.assets,
            }
        }
    }

    #[test]
    fn test_box_scaled_by_world_scale() {
        let fixture = Fixture::new();
        let mut world = World::new();
        let entity = world.spawn((
            Transform::from_parts(Vec3::ZERO, Quat::IDENTITY, Vec3::new(2.0, 1.0, 4.0)),
            BoxColliderComponent::default(),
        ));

        let shape =
            PhysicsShape::from_collider(&fixture.ctx(), &world, entity, ShapeType::Box, false)
                .unwrap();

        match shape.kind() {
            ShapeKind::Box { half_extents } => {
                assert!((half_extents - Vec3::new(1.0, 0.5, 2.0)).length() < 1e-5);
            }
            other => panic!("expected box, got {other:?}"),
        }
        assert_eq!(shape.material(), PhysicsMaterial::default());
    }

    #[test]
    fn test_sphere_uses_largest_scale() {
        let fixture = Fixture::new();
        let mut world = World::new();
        let entity = world.spawn((
            Transform::from_parts(Vec3::ZERO, Quat::IDENTITY, Vec3::new(1.0, 3.0, 2.0)),
            SphereColliderComponent::default(),
        ));

        let shape =
            PhysicsShape::from_collider(&fixture.ctx(), &world, entity, ShapeType::Sphere, false)
                .unwrap();

        assert_eq!(shape.kind(), ShapeKind::Sphere { radius: 1.5 });
    }

    #[test]
    fn test_capsule_height_excludes_caps() {
        let fixture = Fixture::new();
        let mut world = World::new();
        let entity = world.spawn((CapsuleColliderComponent {
            radius: 0.5,
            height: 3.0,
            ..Default::default()
        },));

        let shape =
            PhysicsShape::from_collider(&fixture.ctx(), &world, entity, ShapeType::Capsule, false)
                .unwrap();

        assert_eq!(
            shape.kind(),
            ShapeKind::Capsule {
                radius: 0.5,
                half_height: 1.0
            }
        );
        // Native X axis is turned onto local Y
        let axis = shape.kind().axis_rotation() * Vec3::X;
        assert!((axis - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_invalid_layer_falls_back_to_default() {
        let fixture = Fixture::new();
        let mut world = World::new();
        let entity = world.spawn((BoxColliderComponent {
            layer_id: 9,
            ..Default::default()
        },));

        let shape =
            PhysicsShape::from_collider(&fixture.ctx(), &world, entity, ShapeType::Box, false)
                .unwrap();

        assert_eq!(shape.filter(), fixture.layers.filter_for(0));
    }

    #[test]
    fn test_compound_shape_uses_local_transform() {
        let fixture = Fixture::new();
        let mut world = World::new();
        let root = world.spawn((Transform::from_position(Vec3::new(100.0, 0.0, 0.0)),));
        let child = world.spawn((
            Transform::from_position_rotation(Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_y(0.5)),
            SphereColliderComponent {
                offset: Vec3::new(0.0, 0.5, 0.0),
                ..Default::default()
            },
        ));
        world.set_parent(child, root).unwrap();

        let shape =
            PhysicsShape::from_collider(&fixture.ctx(), &world, child, ShapeType::Sphere, true)
                .unwrap();

        assert!((shape.offset() - Vec3::new(1.0, 0.5, 0.0)).length() < 1e-5);
        assert!(shape.rotation().dot(Quat::from_rotation_y(0.5)).abs() > 0.9999);
    }

    #[test]
    fn test_missing_component_yields_none() {
        let fixture = Fixture::new();
        let mut world = World::new();
        let entity = world.spawn(());

        assert!(
            PhysicsShape::from_collider(&fixture.ctx(), &world, entity, ShapeType::Box, false)
                .is_none()
        );
        assert!(PhysicsShape::collect(&fixture.ctx(), &world, entity, false).is_empty());
    }

    #[test]
    fn test_trigger_collider_is_sensor() {
        let shape = PhysicsShape::new(
            ShapeKind::Sphere { radius: 1.0 },
            PhysicsMaterial::default(),
            CollisionFilter::ALL,
        )
        .with_trigger(true);

        let collider = shape.to_collider(None, 7);
        assert!(collider.is_sensor());
        assert_eq!(collider.user_data, 7);
    }
}
