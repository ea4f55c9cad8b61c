use bevy::prelude::*;

use crate::assets::AppState;
use crate::player::controller::*;

pub mod controller;

pub use controller::PlayerRoot;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(on_player_spawn);
        app.add_systems(
            Update,
            (apply_controls, stomp_enemies, face_travel_direction)
                .chain()
                .run_if(in_state(AppState::Next)),
        );
    }
}
