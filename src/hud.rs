use bevy::prelude::*;

use crate::assets::AppState;

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(AppState::GameOver), spawn_game_over_screen);
    }
}

#[derive(Component)]
struct GameOverScreen;

fn spawn_game_over_screen(mut commands: Commands) {
    commands.spawn((
        GameOverScreen,
        Name::new("Game Over Screen"),
        GlobalZIndex(10),
        Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            position_type: PositionType::Absolute,
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            ..default()
        },
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
        children![(
            Text::new("GAME OVER"),
            TextFont {
                font_size: 72.0,
                ..default()
            },
            TextColor(Color::srgb(0.85, 0.15, 0.15)),
        )],
    ));
}
