pub mod assets;
pub mod camera;
pub mod enemy;
pub mod game;
pub mod hud;
pub mod level;
pub mod player;

// Re-export commonly used items
pub use game::GamePlugin;
