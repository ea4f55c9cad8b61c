use avian2d::prelude::*;
use bevy::prelude::*;
use bevy_tnua::prelude::*;
use bevy_tnua_avian2d::prelude::*;

use crate::assets::GameAssets;
use crate::enemy::{Crush, Enemy};
use crate::level::GameLayer;

const WALK_SPEED: f32 = 4.0;
const JUMP_HEIGHT: f32 = 2.6;
/// Upwards kick the player gets from a successful stomp.
const STOMP_BOUNCE: f32 = 6.0;
/// How far below the capsule center the stomp probes reach.
const STOMP_REACH: f32 = 0.95;

#[derive(Component, Default)]
#[require(Transform, Visibility)]
pub struct PlayerRoot;

pub fn on_player_spawn(on: On<Add, PlayerRoot>, mut commands: Commands, assets: Res<GameAssets>) {
    commands.entity(on.event_target()).insert((
        Sprite {
            image: assets.player.clone(),
            custom_size: Some(Vec2::new(0.9, 1.4)),
            ..default()
        },
        RigidBody::Dynamic,
        Collider::capsule(0.35, 0.7),
        CollisionLayers::new(GameLayer::Player, LayerMask::ALL),
        LockedAxes::ROTATION_LOCKED,
        TnuaController::default(),
        TnuaAvian2dSensorShape(Collider::rectangle(0.65, 0.0)),
    ));
}

pub fn apply_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut controller_query: Query<&mut TnuaController>,
) {
    let Ok(mut controller) = controller_query.single_mut() else {
        return;
    };

    let mut direction = 0.0;
    if keyboard.pressed(KeyCode::KeyA) || keyboard.pressed(KeyCode::ArrowLeft) {
        direction -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) || keyboard.pressed(KeyCode::ArrowRight) {
        direction += 1.0;
    }

    // Feed the basis every frame, even when idle, so tnua keeps floating the
    // capsule at its height.
    controller.basis(TnuaBuiltinWalk {
        desired_velocity: Vec3::new(direction * WALK_SPEED, 0.0, 0.0),
        // Must be a little more than the distance between the capsule center
        // and its lowest point (0.7 here).
        float_height: 0.75,
        ..Default::default()
    });

    if keyboard.pressed(KeyCode::Space) {
        controller.action(TnuaBuiltinJump {
            height: JUMP_HEIGHT,
            ..Default::default()
        });
    }
}

/// Landing on top of an enemy crushes it and bounces the player. Probes only
/// fire while moving downward, so walking into an enemy never counts.
pub fn stomp_enemies(
    mut commands: Commands,
    spatial: SpatialQuery,
    mut players: Query<(&Transform, &mut LinearVelocity), With<PlayerRoot>>,
    enemies: Query<(), With<Enemy>>,
) {
    let Ok((transform, mut velocity)) = players.single_mut() else {
        return;
    };
    if velocity.y >= 0.0 {
        return;
    }

    let filter = SpatialQueryFilter::from_mask(GameLayer::Enemy);
    let pos = transform.translation;
    for offset in [-0.3, 0.0, 0.3] {
        let origin = Vec2::new(pos.x + offset, pos.y);
        let Some(hit) = spatial.cast_ray(origin, Dir2::NEG_Y, STOMP_REACH, true, &filter) else {
            continue;
        };
        if enemies.contains(hit.entity) {
            commands.trigger(Crush { entity: hit.entity });
            velocity.y = STOMP_BOUNCE;
            break;
        }
    }
}

pub fn face_travel_direction(mut players: Query<(&LinearVelocity, &mut Sprite), With<PlayerRoot>>) {
    for (velocity, mut sprite) in players.iter_mut() {
        if velocity.x.abs() > 0.05 {
            sprite.flip_x = velocity.x < 0.0;
        }
    }
}
