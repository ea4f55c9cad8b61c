use avian2d::prelude::*;
use bevy::camera::ScalingMode;
use bevy::prelude::*;
use bevy_kira_audio::prelude::AudioPlugin;
use bevy_tnua::prelude::*;
use bevy_tnua_avian2d::prelude::*;

use crate::assets::*;
use crate::camera::FollowCamera;
use crate::enemy::Enemy;
use crate::level;
use crate::player::PlayerRoot;

pub struct GamePlugin;

/// Raised by an enemy that reached the player. `game.rs` owns what happens
/// next; the enemy itself knows nothing about scenes or states.
#[derive(Message, Debug, Default)]
pub struct GameOver;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(avian2d::prelude::PhysicsPlugins::default());
        app.insert_resource(avian2d::prelude::Gravity(Vec2::NEG_Y * 9.8));
        //app.add_plugins(avian2d::prelude::PhysicsDebugPlugin::default());
        app.add_plugins(TnuaControllerPlugin::new(FixedUpdate));
        app.add_plugins(TnuaAvian2dPlugin::new(FixedUpdate));
        app.add_plugins(AudioPlugin);

        #[cfg(not(target_arch = "wasm32"))]
        {
            app.add_plugins(bevy_inspector_egui::bevy_egui::EguiPlugin::default());
            app.add_plugins(bevy_inspector_egui::quick::WorldInspectorPlugin::new());
        }

        app.add_plugins(crate::assets::AssetPlugin);
        app.add_plugins(crate::camera::FollowCameraPlugin);
        app.add_plugins(crate::player::PlayerPlugin);
        app.add_plugins(crate::enemy::EnemyPlugin);
        app.add_plugins(crate::hud::HudPlugin);

        app.add_message::<GameOver>();
        app.insert_resource(ClearColor(Color::srgb(0.12, 0.12, 0.18))); // Cave gloom background
        app.add_systems(OnEnter(AppState::Next), setup);
        app.add_systems(Update, handle_game_over.run_if(in_state(AppState::Next)));
    }
}

/// Lays out the level, the player and the patrol enemies.
fn setup(mut commands: Commands, assets: Res<GameAssets>) {
    level::spawn_level(&mut commands, &assets);

    commands.spawn((
        Camera2d,
        Projection::Orthographic(OrthographicProjection {
            scaling_mode: ScalingMode::FixedVertical {
                viewport_height: 12.0,
            },
            ..OrthographicProjection::default_2d()
        }),
        FollowCamera::default(),
        Transform::from_xyz(0.0, 2.0, 0.0),
    ));

    commands.spawn((
        PlayerRoot,
        Name::new("Player"),
        Transform::from_xyz(-12.0, 1.0, 1.0),
    ));

    for x in [-4.0, 2.0, 7.0, 12.0] {
        commands.spawn((Enemy::default(), Transform::from_xyz(x, 1.0, 1.0)));
    }
}

fn handle_game_over(
    mut messages: MessageReader<GameOver>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if messages.read().next().is_some() {
        info!("an enemy reached the player, game over");
        next_state.set(AppState::GameOver);
    }
}
