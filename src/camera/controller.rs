use bevy::prelude::*;

use crate::player::PlayerRoot;

/// Component for the side-scroller follow camera
#[derive(Component)]
pub struct FollowCamera {
    /// Offset from the player position
    pub offset: Vec2,
    /// Camera follow speed (higher = faster, more responsive)
    pub follow_speed: f32,
    /// The camera never drops below this height, even when the player falls
    pub min_height: f32,
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self {
            offset: Vec2::new(0.0, 1.5),
            follow_speed: 5.0,
            min_height: 1.0,
        }
    }
}

/// Smoothly tracks the player, clamped so pits don't drag the view down
pub fn update_camera_position(
    mut cameras: Query<(&mut Transform, &FollowCamera)>,
    players: Query<&Transform, (With<PlayerRoot>, Without<FollowCamera>)>,
    time: Res<Time>,
) {
    let Ok((mut camera_transform, camera)) = cameras.single_mut() else {
        return;
    };

    let Ok(player_transform) = players.single() else {
        return;
    };

    let mut target = player_transform.translation.truncate() + camera.offset;
    target.y = target.y.max(camera.min_height);

    let current = camera_transform.translation.truncate();
    let next = current.lerp(target, (camera.follow_speed * time.delta_secs()).min(1.0));
    camera_transform.translation.x = next.x;
    camera_transform.translation.y = next.y;
}
