pub mod controller;

pub use controller::*;

use bevy::prelude::*;

use crate::assets::AppState;

/// Plugin for the side-scroller follow camera
pub struct FollowCameraPlugin;

impl Plugin for FollowCameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            controller::update_camera_position.run_if(in_state(AppState::Next)),
        );
    }
}
