use avian2d::prelude::*;
use bevy::prelude::*;
use strum_macros::Display;

use crate::assets::{AppState, GameAssets};
use crate::level::{GameLayer, TILE_SIZE};

use self::systems::{
    activate_visible_enemies, advance_death_countdowns, apply_crushed_visuals, tick_enemies,
};

pub mod systems;

pub struct EnemyPlugin;

impl Plugin for EnemyPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(on_enemy_spawn);
        app.add_observer(on_crush);
        app.add_systems(
            Update,
            (
                activate_visible_enemies,
                tick_enemies,
                advance_death_countdowns,
                apply_crushed_visuals,
            )
                .chain()
                .run_if(in_state(AppState::Next)),
        );
    }
}

/// Patrolling walker. Spawn it with just this component and a `Transform`;
/// the spawn observer attaches the sprite and physics parts.
#[derive(Component, Debug)]
#[require(Transform, Visibility, EnemyState, EnemyMotion, DeathCountdown)]
pub struct Enemy {
    /// Downward acceleration while falling, units/s².
    pub gravity: f32,
    /// Horizontal patrol speed, units/s.
    pub walk_speed: f32,
    /// Facing flag; also drives the sprite mirror via `scale.x`.
    pub walking_left: bool,
}

impl Default for Enemy {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            walk_speed: 2.0,
            walking_left: true,
        }
    }
}

#[derive(Component, Default, Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EnemyState {
    /// Accumulating gravity until a landing probe connects.
    #[default]
    Falling,
    Walking,
    /// Terminal. Only the death countdown still advances.
    Dead,
}

#[derive(Component, Default, Debug)]
pub struct EnemyMotion {
    pub velocity: Vec2,
    pub grounded: bool,
}

/// Marks an enemy whose per-frame tick is live. Enemies spawn without it and
/// receive it once they first come into view.
#[derive(Component)]
pub struct Active;

/// Removal delay after a crush. Armed by [`on_crush`], advanced each frame;
/// the `fired` guard makes the despawn happen at most once.
#[derive(Component, Debug)]
pub struct DeathCountdown {
    timer: f32,
    threshold: f32,
    armed: bool,
    fired: bool,
}

impl Default for DeathCountdown {
    fn default() -> Self {
        Self {
            timer: 0.0,
            threshold: 1.0,
            armed: false,
            fired: false,
        }
    }
}

impl DeathCountdown {
    /// Starts (or re-starts) the countdown without resetting elapsed time.
    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Advances by `dt`. Returns `true` exactly once, on the first call that
    /// finds the timer past the threshold.
    pub fn advance(&mut self, dt: f32) -> bool {
        if !self.armed || self.fired {
            return false;
        }
        if self.timer < self.threshold {
            self.timer += dt;
            false
        } else {
            self.fired = true;
            true
        }
    }
}

/// The player stomped this enemy.
#[derive(EntityEvent, Debug)]
pub struct Crush {
    pub entity: Entity,
}

fn on_enemy_spawn(
    on: On<Add, Enemy>,
    mut commands: Commands,
    mut enemies: Query<&mut Enemy>,
    assets: Res<GameAssets>,
) {
    let entity = on.event_target();

    if let Ok(mut enemy) = enemies.get_mut(entity) {
        // Mix up initial patrol directions so a row of spawns doesn't march
        // in lockstep.
        enemy.walking_left = rand::random::<bool>();
    }

    commands.entity(entity).insert((
        Sprite {
            image: assets.enemy.clone(),
            custom_size: Some(Vec2::splat(TILE_SIZE)),
            ..default()
        },
        RigidBody::Kinematic,
        Collider::rectangle(TILE_SIZE, TILE_SIZE),
        CollisionLayers::new(GameLayer::Enemy, [GameLayer::Player]),
        Name::new("Enemy"),
    ));
}

/// Puts the enemy in its terminal state: no more movement or probing, no
/// collision shape, countdown to removal armed. Safe to trigger repeatedly.
pub(crate) fn on_crush(
    crush: On<Crush>,
    mut commands: Commands,
    mut enemies: Query<(&mut EnemyState, &mut DeathCountdown), With<Enemy>>,
) {
    let entity = crush.event_target();
    let Ok((mut state, mut countdown)) = enemies.get_mut(entity) else {
        warn!("Crush triggered on {entity}, which is not an enemy");
        return;
    };

    debug!("crushing enemy {entity} (was {})", *state);
    state.set_if_neq(EnemyState::Dead);
    commands.entity(entity).insert(ColliderDisabled);
    countdown.arm();
}
