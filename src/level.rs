use avian2d::prelude::*;
use bevy::prelude::*;

use crate::assets::GameAssets;

/// Side length of one square level tile; actors are sized to fit one tile.
pub const TILE_SIZE: f32 = 1.0;

const LEVEL_HALF_WIDTH: i32 = 18;
const WALL_HEIGHT: i32 = 4;

/// World geometry layers that collision queries filter on.
#[derive(PhysicsLayer, Default, Debug, Clone, Copy)]
pub enum GameLayer {
    #[default]
    Default,
    /// Surfaces an actor can stand on.
    Ground,
    /// Surfaces that block horizontal movement.
    Wall,
    Player,
    Enemy,
}

/// Filter for the downward landing probes. The player is part of the floor
/// mask on purpose: landing on them is how the enemy wins.
pub fn floor_filter() -> SpatialQueryFilter {
    SpatialQueryFilter::from_mask([GameLayer::Ground, GameLayer::Player])
}

/// Filter for the horizontal turn-around probes.
pub fn wall_filter() -> SpatialQueryFilter {
    SpatialQueryFilter::from_mask([GameLayer::Wall, GameLayer::Player])
}

/// Spawns the static level: a ground strip, boundary walls on both ends and
/// a few floating blocks to patrol on.
pub fn spawn_level(commands: &mut Commands, assets: &GameAssets) {
    for x in -LEVEL_HALF_WIDTH..=LEVEL_HALF_WIDTH {
        spawn_tile(
            commands,
            assets.ground_tile.clone(),
            Vec2::new(x as f32, -0.5),
            [GameLayer::Ground],
            "Ground",
        );
    }

    // Boundary walls keep both the player and patrolling enemies inside.
    for side in [-1, 1] {
        for y in 0..WALL_HEIGHT {
            spawn_tile(
                commands,
                assets.block.clone(),
                Vec2::new((side * LEVEL_HALF_WIDTH) as f32, 0.5 + y as f32),
                [GameLayer::Wall],
                "Wall",
            );
        }
    }

    // Floating blocks: standable from above, a wall when bumped sideways.
    for (x, y, width) in [(-6.0, 2.0, 4), (3.0, 2.0, 3), (8.0, 4.0, 3)] {
        for i in 0..width {
            spawn_tile(
                commands,
                assets.block.clone(),
                Vec2::new(x + i as f32, y),
                [GameLayer::Ground, GameLayer::Wall],
                "Block",
            );
        }
    }
}

fn spawn_tile<const N: usize>(
    commands: &mut Commands,
    texture: Handle<Image>,
    pos: Vec2,
    memberships: [GameLayer; N],
    name: &'static str,
) {
    commands.spawn((
        Sprite {
            image: texture,
            custom_size: Some(Vec2::splat(TILE_SIZE)),
            ..default()
        },
        Transform::from_xyz(pos.x, pos.y, 0.0),
        RigidBody::Static,
        Collider::rectangle(TILE_SIZE, TILE_SIZE),
        CollisionLayers::new(memberships, LayerMask::ALL),
        Name::new(name),
    ));
}
