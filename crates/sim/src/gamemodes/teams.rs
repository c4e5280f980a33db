//! Team mode: three fixed teams, teammates collide but never eat each other.

use super::{GameMode, LeaderboardEntry};
use crate::color::Color;
use crate::player::Player;
use crate::world::World;
use rand::Rng;
use std::collections::HashMap;

const TEAM_COUNT: u8 = 3;

pub struct Teams;

impl Teams {
    pub fn new() -> Self {
        Self
    }

    fn team_color(team: u8) -> Color {
        let mut rng = rand::rng();
        let fuzz = 38;

        let base: (i32, i32, i32) = match team {
            0 => (255, 0, 0),
            1 => (0, 255, 0),
            _ => (0, 0, 255),
        };
        Color::new(
            (base.0 + rng.random_range(0..fuzz)).clamp(0, 255) as u8,
            (base.1 + rng.random_range(0..fuzz)).clamp(0, 255) as u8,
            (base.2 + rng.random_range(0..fuzz)).clamp(0, 255) as u8,
        )
    }
}

impl Default for Teams {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMode for Teams {
    fn name(&self) -> &'static str {
        "Teams"
    }

    fn id(&self) -> u32 {
        1
    }

    fn have_teams(&self) -> bool {
        true
    }

    fn decay_mod(&self) -> f32 {
        1.5
    }

    fn on_player_join(&self, player: &mut Player) {
        if player.team.is_none() {
            let mut rng = rand::rng();
            player.team = Some(rng.random_range(0..TEAM_COUNT));
        }
        if let Some(team) = player.team {
            player.color = Self::team_color(team);
        }
    }

    fn on_player_spawn(&self, player: &mut Player) {
        if let Some(team) = player.team {
            player.color = Self::team_color(team);
        }
    }

    /// Team standings as fractions of the total player mass.
    fn update_leaderboard(
        &self,
        world: &World,
        players: &HashMap<u32, Player>,
        _max_entries: usize,
    ) -> Vec<LeaderboardEntry> {
        let mut team_mass = [0.0f32; TEAM_COUNT as usize];
        let mut total_mass = 0.0f32;

        for player in players.values() {
            let score = player.score(world);
            if let Some(team) = player.team {
                if (team as usize) < team_mass.len() {
                    team_mass[team as usize] += score;
                }
            }
            total_mass += score;
        }

        if total_mass <= 0.0 {
            return Vec::new();
        }
        team_mass
            .iter()
            .enumerate()
            .map(|(team, mass)| LeaderboardEntry {
                player_id: team as u32,
                name: format!("Team {team}"),
                score: mass / total_mass,
            })
            .collect()
    }
}
