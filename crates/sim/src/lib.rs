//! Petri world simulation core.
//!
//! A shared, continuously running 2D world of circular cells that grow,
//! split, merge, collide, and consume one another inside a bounded arena,
//! paced by an adaptive fixed-rate tick loop.

pub mod collision;
pub mod color;
pub mod config;
pub mod entity;
pub mod game;
pub mod gamemodes;
pub mod player;
pub mod scheduler;
pub mod spatial;
pub mod world;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use game::Game;
pub use player::Player;
pub use scheduler::{run_game_loop, Pacing, TickScheduler};
pub use world::{Border, World};
