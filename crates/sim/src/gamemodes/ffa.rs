//! Free-for-all mode.

use super::{GameMode, LeaderboardEntry};
use crate::player::Player;
use crate::world::World;
use std::collections::HashMap;

pub struct Ffa;

impl Ffa {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Ffa {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMode for Ffa {
    fn name(&self) -> &'static str {
        "Free For All"
    }

    fn id(&self) -> u32 {
        0
    }

    fn update_leaderboard(
        &self,
        world: &World,
        players: &HashMap<u32, Player>,
        max_entries: usize,
    ) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = players
            .values()
            .filter(|player| !player.cells.is_empty())
            .map(|player| LeaderboardEntry {
                player_id: player.id,
                name: player.name.clone(),
                score: player.score(world),
            })
            .collect();
        entries.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.player_id.cmp(&b.player_id)));
        entries.truncate(max_entries);
        entries
    }
}
