//! Headless demo: a player walks through a trigger while crates fall onto a floor

use horizon_physics::prelude::*;

const FRAME_DT: f32 = 1.0 / 144.0;
const FRAMES: usize = 600;

fn build_scene(physics: &mut PhysicsSystem) -> Result<Scene, PhysicsError> {
    let layers = physics.layers_mut();
    let player_layer = layers.add_layer("Player", false)?;
    let enemy_layer = layers.add_layer("Enemy", false)?;
    layers.set_layer_collision(player_layer, 0, true);
    layers.set_layer_collision(player_layer, enemy_layer, true);

    let mut scene = Scene::new("Demo");
    let world = scene.world_mut();

    world.spawn((
        Name::new("Floor"),
        BoxColliderComponent {
            half_size: Vec3::new(20.0, 0.5, 20.0),
            ..Default::default()
        },
    ));

    world.spawn((
        Name::new("Goal"),
        Transform::from_position(Vec3::new(6.0, 1.5, 0.0)),
        BoxColliderComponent {
            half_size: Vec3::new(1.0, 1.0, 3.0),
            is_trigger: true,
            ..Default::default()
        },
    ));

    world.spawn((
        Name::new("Player"),
        Transform::from_position(Vec3::new(0.0, 0.5, 0.0)),
        CharacterControllerComponent {
            offset: Vec3::new(0.0, 1.0, 0.0),
            layer_id: player_layer,
            ..Default::default()
        },
    ));

    for i in 0..3 {
        world.spawn((
            Name::new(format!("Crate {i}")),
            Transform::from_position(Vec3::new(-3.0, 2.0 + i as f32 * 1.5, 0.0)),
            RigidbodyComponent {
                mass: 5.0,
                ..Default::default()
            },
            BoxColliderComponent {
                layer_id: enemy_layer,
                ..Default::default()
            },
        ));
    }

    Ok(scene)
}

fn main() {
    env_logger::init();

    let mut physics = PhysicsSystem::default();
    let mut scene = match build_scene(&mut physics) {
        Ok(scene) => scene,
        Err(e) => {
            eprintln!("Failed to build scene: {e}");
            return;
        }
    };

    if let Err(e) = scene.on_runtime_start(&mut physics) {
        eprintln!("Physics error: {e}");
        return;
    }

    let player = scene
        .world()
        .query::<&Name>()
        .iter()
        .find(|(_, name)| name.0 == "Player")
        .and_then(|(entity, _)| scene.world().uuid(entity));

    if let Some(physics_scene) = scene.physics_mut() {
        physics_scene.set_event_sink(Box::new(|event, a, b| {
            log::info!("{event:?}: {a} -> {b}");
        }));
    }

    for frame in 0..FRAMES {
        if let (Some(physics_scene), Some(player)) = (scene.physics_mut(), player)
            && let Some((controller, _)) = physics_scene.character_controller_mut(player)
        {
            controller.move_by(Vec3::new(3.0 * FRAME_DT, -9.81 * FRAME_DT, 0.0));
        }

        scene.on_update(FRAME_DT);

        if frame % 144 == 0
            && let Some(hit) = scene
                .physics()
                .and_then(|p| p.raycast(Vec3::new(-3.0, 20.0, 0.0), Vec3::NEG_Y, 50.0))
        {
            log::info!("Frame {frame}: top crate at {:.2}", hit.position.y);
        }
    }

    let (statics, dynamics) = scene.physics_body_counts();
    log::info!("Finished with {statics} static and {dynamics} dynamic bodies");
    scene.on_runtime_stop();
}
