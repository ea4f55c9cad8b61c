use avian2d::prelude::*;
use bevy::prelude::*;
use bevy_kira_audio::prelude::*;

use crate::assets::GameAssets;
use crate::game::GameOver;
use crate::level::{floor_filter, wall_filter};
use crate::player::PlayerRoot;

use super::{Active, DeathCountdown, Enemy, EnemyMotion, EnemyState};

const HALF_WIDTH: f32 = 0.5;
const HALF_HEIGHT: f32 = 0.5;
/// Landing probes sit this far inside the left/right box edges, wall probes
/// this far inside the top/bottom edges.
const PROBE_INSET: f32 = 0.2;
/// Horizontal offset of the wall probe origins towards the leading edge.
const WALL_PROBE_OFFSET: f32 = 0.4;

/// Enemies spawn dormant and start ticking once they first come into view,
/// so off-screen ones cost nothing.
pub(crate) fn activate_visible_enemies(
    mut commands: Commands,
    enemies: Query<(Entity, &ViewVisibility), (With<Enemy>, Without<Active>)>,
) {
    for (entity, visibility) in enemies.iter() {
        if visibility.get() {
            debug!("enemy {entity} entered view, activating");
            commands.entity(entity).insert(Active);
        }
    }
}

/// Per-frame simulation of every live enemy: integrate the current state,
/// then resolve the landing and turn-around probes.
pub(crate) fn tick_enemies(
    spatial: SpatialQuery,
    mut enemies: Query<
        (
            &mut Enemy,
            &mut EnemyState,
            &mut EnemyMotion,
            &mut Transform,
        ),
        With<Active>,
    >,
    players: Query<(), With<PlayerRoot>>,
    aabbs: Query<&ColliderAabb>,
    mut game_over: MessageWriter<GameOver>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();

    for (mut enemy, mut state, mut motion, mut transform) in enemies.iter_mut() {
        // Terminal state: only the death countdown still runs.
        if *state == EnemyState::Dead {
            continue;
        }

        let mut pos = transform.translation;
        let mut scale = transform.scale;
        // The horizontal speed is configuration; only velocity.y is dynamic.
        motion.velocity.x = enemy.walk_speed;

        match *state {
            EnemyState::Falling => {
                pos.y += motion.velocity.y * dt;
                motion.velocity.y -= enemy.gravity * dt;
            }
            EnemyState::Walking => {
                if enemy.walking_left {
                    pos.x -= motion.velocity.x * dt;
                    scale.x = -1.0;
                } else {
                    pos.x += motion.velocity.x * dt;
                    scale.x = 1.0;
                }
            }
            EnemyState::Dead => continue,
        }

        // One landing probe per frame, whatever the vertical velocity. The
        // ray only reaches as far as this frame's fall distance.
        let fall_distance = -motion.velocity.y * dt;
        let ground_hit = if fall_distance > 0.0 {
            let origins = [
                Vec2::new(pos.x - HALF_WIDTH + PROBE_INSET, pos.y - HALF_HEIGHT),
                Vec2::new(pos.x, pos.y - HALF_HEIGHT),
                Vec2::new(pos.x + HALF_WIDTH - PROBE_INSET, pos.y - HALF_HEIGHT),
            ];
            select_hit(
                origins
                    .map(|origin| spatial.cast_ray(origin, Dir2::NEG_Y, fall_distance, true, &floor_filter())),
            )
        } else {
            None
        };

        match ground_hit {
            Some(hit) => {
                if players.contains(hit.entity) {
                    // Walked-into or fallen-onto player: the level is over.
                    game_over.write(GameOver);
                }
                match aabbs.get(hit.entity) {
                    // Land flush on the surface we hit.
                    Ok(aabb) => pos.y = aabb.max.y + HALF_HEIGHT,
                    Err(_) => warn!("landing surface {} has no AABB", hit.entity),
                }
                motion.velocity.y = 0.0;
                motion.grounded = true;
                *state = EnemyState::Walking;
            }
            None => {
                if *state != EnemyState::Falling {
                    enter_fall(&mut state, &mut motion);
                }
            }
        }

        // Turn-around probe, in the facing direction, reaching as far as this
        // frame's walk distance. Runs in every live state, like the landing
        // probe.
        let travel = motion.velocity.x * dt;
        if travel > 0.0 {
            let (direction, sign) = if enemy.walking_left {
                (Dir2::NEG_X, -1.0)
            } else {
                (Dir2::X, 1.0)
            };
            let x = pos.x + sign * WALL_PROBE_OFFSET;
            let origins = [
                Vec2::new(x, pos.y + HALF_HEIGHT - PROBE_INSET),
                Vec2::new(x, pos.y),
                Vec2::new(x, pos.y - HALF_HEIGHT + PROBE_INSET),
            ];
            let wall_hit = select_hit(
                origins.map(|origin| spatial.cast_ray(origin, direction, travel, true, &wall_filter())),
            );
            if let Some(hit) = wall_hit {
                if players.contains(hit.entity) {
                    game_over.write(GameOver);
                }
                // Turn around no matter what was hit.
                enemy.walking_left = !enemy.walking_left;
            }
        }

        transform.translation = pos;
        transform.scale = scale;
    }
}

/// First-match priority between the three probe rays: an earlier probe wins
/// even when a later one has a nearer hit.
fn select_hit<T>(hits: [Option<T>; 3]) -> Option<T> {
    hits.into_iter().flatten().next()
}

fn enter_fall(state: &mut EnemyState, motion: &mut EnemyMotion) {
    motion.velocity.y = 0.0;
    motion.grounded = false;
    *state = EnemyState::Falling;
}

pub(crate) fn advance_death_countdowns(
    mut commands: Commands,
    mut enemies: Query<(Entity, &mut DeathCountdown)>,
    time: Res<Time>,
) {
    for (entity, mut countdown) in enemies.iter_mut() {
        if countdown.advance(time.delta_secs()) {
            debug!("enemy {entity} removed after crush countdown");
            commands.entity(entity).despawn();
        }
    }
}

/// Swaps in the squashed sprite and plays the stomp sound the moment an
/// enemy goes terminal.
pub(crate) fn apply_crushed_visuals(
    mut enemies: Query<(&EnemyState, &mut Sprite), (With<Enemy>, Changed<EnemyState>)>,
    assets: Res<GameAssets>,
    audio: Res<Audio>,
) {
    for (state, mut sprite) in enemies.iter_mut() {
        if *state == EnemyState::Dead {
            sprite.image = assets.enemy_crushed.clone();
            audio.play(assets.stomp.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use avian2d::prelude::*;
    use bevy::prelude::*;
    use bevy::time::TimeUpdateStrategy;
    use bevy::transform::TransformPlugin;

    use crate::enemy::{Active, Crush, DeathCountdown, Enemy, EnemyMotion, EnemyState, on_crush};
    use crate::game::GameOver;
    use crate::level::GameLayer;
    use crate::player::PlayerRoot;

    use super::{advance_death_countdowns, select_hit, tick_enemies};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    /// Headless app with real physics so the probes cast against real
    /// colliders. Fixed manual delta keeps every frame deterministic.
    fn physics_app(dt: f32) -> App {
        let mut app = App::new();
        app.add_plugins((
            MinimalPlugins,
            TransformPlugin,
            bevy::asset::AssetPlugin::default(),
            bevy::scene::ScenePlugin,
            PhysicsPlugins::default(),
        ));
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f32(
            dt,
        )));
        app.add_message::<GameOver>();
        app.add_observer(on_crush);
        app.add_systems(Update, (tick_enemies, advance_death_countdowns).chain());
        // `app.update()` alone never runs `Plugin::finish`, which avian needs
        // to register its diagnostics resources.
        app.finish();
        app.cleanup();
        app
    }

    fn spawn_enemy(app: &mut App, pos: Vec2) -> Entity {
        app.world_mut()
            .spawn((
                Enemy::default(),
                Transform::from_xyz(pos.x, pos.y, 0.0),
                Active,
            ))
            .id()
    }

    fn spawn_surface(app: &mut App, pos: Vec2, size: Vec2, layer: GameLayer) -> Entity {
        app.world_mut()
            .spawn((
                RigidBody::Static,
                Collider::rectangle(size.x, size.y),
                CollisionLayers::new(layer, LayerMask::ALL),
                Transform::from_xyz(pos.x, pos.y, 0.0),
            ))
            .id()
    }

    #[test]
    fn probe_precedence_is_first_match() {
        assert_eq!(select_hit([Some(1), Some(2), Some(3)]), Some(1));
        assert_eq!(select_hit([None, Some(2), Some(3)]), Some(2));
        assert_eq!(select_hit([None, None, Some(3)]), Some(3));
        assert_eq!(select_hit::<u32>([None, None, None]), None);
    }

    #[test]
    fn countdown_fires_on_the_eleventh_tick() {
        let mut countdown = DeathCountdown::default();
        countdown.arm();
        for _ in 0..10 {
            assert!(!countdown.advance(0.1));
        }
        // Timer is now at the threshold; the next advance fires, once.
        assert!(countdown.advance(0.1));
        assert!(!countdown.advance(0.1));
    }

    #[test]
    fn countdown_does_nothing_while_unarmed() {
        let mut countdown = DeathCountdown::default();
        for _ in 0..50 {
            assert!(!countdown.advance(0.1));
        }
    }

    #[test]
    fn crush_is_idempotent() {
        let mut app = App::new();
        app.add_observer(on_crush);
        let enemy = app
            .world_mut()
            .spawn((Enemy::default(), Transform::default()))
            .id();

        app.world_mut().trigger(Crush { entity: enemy });
        app.world_mut().flush();
        assert_eq!(
            *app.world().get::<EnemyState>(enemy).unwrap(),
            EnemyState::Dead
        );
        assert!(app.world().get::<ColliderDisabled>(enemy).is_some());
        assert!(app.world().get::<DeathCountdown>(enemy).unwrap().is_armed());

        // Progress the countdown, then crush again: elapsed time must be
        // kept, so expiry still happens 1.0s after the first crush.
        assert!(
            !app.world_mut()
                .get_mut::<DeathCountdown>(enemy)
                .unwrap()
                .advance(0.5)
        );
        app.world_mut().trigger(Crush { entity: enemy });
        app.world_mut().flush();
        assert_eq!(
            *app.world().get::<EnemyState>(enemy).unwrap(),
            EnemyState::Dead
        );
        let mut countdown = app.world_mut().get_mut::<DeathCountdown>(enemy).unwrap();
        assert!(!countdown.advance(0.5));
        assert!(countdown.advance(0.1));
    }

    #[test]
    fn falling_accumulates_gravity_without_ground() {
        let dt = 0.016;
        let mut app = physics_app(dt);
        let enemy = spawn_enemy(&mut app, Vec2::new(0.0, 50.0));

        // The very first update has no measurable delta yet; measure from
        // the state after it.
        app.update();
        let v0 = app.world().get::<EnemyMotion>(enemy).unwrap().velocity.y;
        for _ in 0..10 {
            app.update();
        }

        let motion = app.world().get::<EnemyMotion>(enemy).unwrap();
        assert_eq!(
            *app.world().get::<EnemyState>(enemy).unwrap(),
            EnemyState::Falling
        );
        assert!(approx(motion.velocity.y, v0 - 9.8 * dt * 10.0));
        assert!(app.world().get::<Transform>(enemy).unwrap().translation.y < 50.0);
    }

    #[test]
    fn lands_snapped_onto_the_floor_and_walks() {
        let mut app = physics_app(0.1);
        spawn_surface(
            &mut app,
            Vec2::new(0.0, -0.5),
            Vec2::new(40.0, 1.0),
            GameLayer::Ground,
        );
        let enemy = spawn_enemy(&mut app, Vec2::new(0.0, 3.0));

        for _ in 0..60 {
            app.update();
        }

        let transform = app.world().get::<Transform>(enemy).unwrap();
        assert!(
            approx(transform.translation.y, 0.5),
            "expected the enemy to rest on the floor, y = {}",
            transform.translation.y
        );
        // Default facing is left, so the patrol went that way.
        assert!(transform.translation.x < 0.0);
        assert_ne!(
            *app.world().get::<EnemyState>(enemy).unwrap(),
            EnemyState::Dead
        );
    }

    #[test]
    fn wall_contact_flips_facing() {
        let mut app = physics_app(0.1);
        spawn_surface(
            &mut app,
            Vec2::new(0.0, -0.5),
            Vec2::new(40.0, 1.0),
            GameLayer::Ground,
        );
        spawn_surface(
            &mut app,
            Vec2::new(-3.0, 1.5),
            Vec2::new(1.0, 4.0),
            GameLayer::Wall,
        );
        let enemy = spawn_enemy(&mut app, Vec2::new(-1.0, 1.0));

        let mut flipped = false;
        for _ in 0..200 {
            app.update();
            if !app.world().get::<Enemy>(enemy).unwrap().walking_left {
                flipped = true;
                break;
            }
        }
        assert!(flipped, "enemy never turned around at the wall");

        let x0 = app.world().get::<Transform>(enemy).unwrap().translation.x;
        for _ in 0..40 {
            app.update();
        }
        let transform = app.world().get::<Transform>(enemy).unwrap();
        assert!(
            transform.translation.x > x0,
            "expected rightward patrol after the flip"
        );
        // Facing flag and sprite mirror stay in sync.
        assert!(approx(transform.scale.x, 1.0));
    }

    #[test]
    fn dead_enemies_freeze_then_despawn() {
        let mut app = physics_app(0.1);
        let enemy = spawn_enemy(&mut app, Vec2::new(5.0, 10.0));
        app.update();

        app.world_mut().trigger(Crush { entity: enemy });
        app.world_mut().flush();
        let frozen_at = app.world().get::<Transform>(enemy).unwrap().translation;
        let frozen_velocity = app.world().get::<EnemyMotion>(enemy).unwrap().velocity;

        // 1.0s countdown at 0.1s per frame: alive through ten more frames.
        for _ in 0..10 {
            app.update();
        }
        assert!(app.world().get_entity(enemy).is_ok());
        assert_eq!(
            app.world().get::<Transform>(enemy).unwrap().translation,
            frozen_at
        );
        assert_eq!(
            app.world().get::<EnemyMotion>(enemy).unwrap().velocity,
            frozen_velocity
        );

        // The eleventh frame finds the timer past the threshold.
        app.update();
        assert!(app.world().get_entity(enemy).is_err());
    }

    #[test]
    fn landing_on_the_player_raises_game_over() {
        let mut app = physics_app(0.1);
        app.world_mut().spawn((
            PlayerRoot,
            RigidBody::Static,
            Collider::rectangle(2.0, 1.0),
            CollisionLayers::new(GameLayer::Player, LayerMask::ALL),
            Transform::from_xyz(0.0, -0.5, 0.0),
        ));
        spawn_enemy(&mut app, Vec2::new(0.0, 2.0));

        // Messages only live for two frames, so poll while stepping.
        let mut saw_game_over = false;
        for _ in 0..40 {
            app.update();
            saw_game_over |= !app.world().resource::<Messages<GameOver>>().is_empty();
        }
        assert!(saw_game_over, "enemy landed on the player without game over");
    }
}
