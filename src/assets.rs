use bevy::prelude::*;
use bevy_asset_loader::prelude::*;
use bevy_kira_audio::AudioSource;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Default, States)]
pub enum AppState {
    #[default]
    AssetLoading,
    Next,
    GameOver,
}

#[derive(Resource, AssetCollection)]
pub struct GameAssets {
    #[asset(path = "player.png")]
    pub player: Handle<Image>,

    #[asset(path = "enemy.png")]
    pub enemy: Handle<Image>,

    #[asset(path = "enemy_crushed.png")]
    pub enemy_crushed: Handle<Image>,

    #[asset(path = "ground_tile.png")]
    pub ground_tile: Handle<Image>,

    #[asset(path = "block.png")]
    pub block: Handle<Image>,

    #[asset(path = "stomp.wav")]
    pub stomp: Handle<AudioSource>,
}

pub struct AssetPlugin;

impl Plugin for AssetPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<AppState>().add_loading_state(
            LoadingState::new(AppState::AssetLoading)
                .continue_to_state(AppState::Next)
                .load_collection::<GameAssets>(),
        );
    }
}
