//! Game mode hooks.

use crate::game::Game;
use crate::player::Player;
use crate::world::World;
use std::collections::HashMap;

pub mod ffa;
pub mod teams;

/// One row of the ranking structure rebuilt every leaderboard refresh.
#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    pub player_id: u32,
    pub name: String,
    pub score: f32,
}

/// Per-mode rules consulted by the world each tick.
pub trait GameMode: Send + Sync {
    fn name(&self) -> &'static str;
    fn id(&self) -> u32;

    /// Whether owners can be teammates (teammates collide rigidly and never
    /// eat each other).
    fn have_teams(&self) -> bool {
        false
    }

    /// Multiplier applied to the per-second mass decay rate.
    fn decay_mod(&self) -> f32 {
        1.0
    }

    /// Whether spectators follow the leaderboard's first entry instead of the
    /// highest-scoring player.
    fn spec_by_leaderboard(&self) -> bool {
        false
    }

    fn on_server_init(&mut self, _game: &mut Game) {}

    /// Called once per tick after movement and collision resolution.
    fn on_tick(&mut self, _game: &mut Game) {}

    fn on_player_join(&self, _player: &mut Player) {}

    fn on_player_spawn(&self, _player: &mut Player) {}

    /// Rebuild the ordered ranking.
    fn update_leaderboard(
        &self,
        world: &World,
        players: &HashMap<u32, Player>,
        max_entries: usize,
    ) -> Vec<LeaderboardEntry>;
}

pub fn get_gamemode(id: u32) -> Box<dyn GameMode> {
    match id {
        1 => Box::new(teams::Teams::new()),
        _ => Box::new(ffa::Ffa::new()),
    }
}
