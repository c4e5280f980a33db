//! Game orchestration: players, queued intents, and the per-tick update order.

mod mass;
mod physics;

use crate::config::Config;
use crate::entity::PlayerCell;
use crate::gamemodes::{get_gamemode, GameMode, LeaderboardEntry};
use crate::player::Player;
use crate::world::{CellEntry, World};
use glam::Vec2;
use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, info};

/// Ticks between leaderboard refreshes.
const LEADERBOARD_TICKS: u64 = 25;

/// A queued player command, applied at the next tick boundary.
#[derive(Debug, Clone, Copy)]
enum Intent {
    SetMouse(Vec2),
    Split,
    Eject,
}

/// The authoritative in-memory game. All mutation happens on one logical
/// thread; concurrent layers only enqueue intents between ticks.
pub struct Game {
    pub config: Config,
    pub world: World,
    pub players: HashMap<u32, Player>,
    /// Player ids in join order, for deterministic iteration.
    player_order: Vec<u32>,
    last_player_id: u32,
    pub tick_count: u64,
    /// Gates the simulation step; client bookkeeping keeps running when false.
    pub running: bool,
    pub gamemode: Box<dyn GameMode>,
    pending_intents: Vec<(u32, Intent)>,
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Player the free-roam spectator camera follows.
    pub largest_player: Option<u32>,
    tick_spawn: u64,
    /// Smoothed tick cost in milliseconds, fed by the scheduler.
    pub update_time_avg: f64,
}

impl Game {
    pub fn new(config: Config) -> Self {
        let world = World::new(config.border.width as f32, config.border.height as f32);
        let gamemode = get_gamemode(config.server.gamemode);
        let mut game = Self {
            world,
            players: HashMap::new(),
            player_order: Vec::new(),
            last_player_id: 1,
            tick_count: 0,
            running: true,
            gamemode,
            pending_intents: Vec::new(),
            leaderboard: Vec::new(),
            largest_player: None,
            tick_spawn: 0,
            update_time_avg: 0.0,
            config,
        };
        let mut gamemode = std::mem::replace(
            &mut game.gamemode,
            Box::new(crate::gamemodes::ffa::Ffa::new()),
        );
        gamemode.on_server_init(&mut game);
        game.gamemode = gamemode;
        game
    }

    /// Seed the arena with the starting food supply.
    pub fn init_world(&mut self) {
        let count = self.config.food.min_amount;
        self.world.spawn_food(&self.config.food, count, 0);
        info!(
            "World initialized: {} food, {}x{} border",
            self.world.food_cells.len(),
            self.config.border.width,
            self.config.border.height
        );
    }

    fn next_player_id(&mut self) -> u32 {
        if self.last_player_id > 2_147_483_647 {
            self.last_player_id = 1;
        }
        let id = self.last_player_id;
        self.last_player_id += 1;
        id
    }

    /// Register a new player. Spawning is a separate step.
    pub fn add_player(&mut self, name: impl Into<String>) -> u32 {
        let id = self.next_player_id();
        let mut player = Player::new(id, name.into());
        self.gamemode.on_player_join(&mut player);
        info!("Player {} '{}' joined", id, player.name);
        self.players.insert(id, player);
        self.player_order.push(id);
        id
    }

    /// Drop a player and every cell they own.
    pub fn remove_player(&mut self, player_id: u32) {
        self.remove_all_cells_of(player_id);
        if self.players.remove(&player_id).is_some() {
            self.player_order.retain(|&id| id != player_id);
            info!("Player {} removed", player_id);
        }
    }

    /// Tombstone and de-index every cell the player owns (kick/ban path).
    pub fn remove_all_cells_of(&mut self, player_id: u32) {
        let Some(player) = self.players.get_mut(&player_id) else {
            return;
        };
        let cells = std::mem::take(&mut player.cells);
        player.merge_override = false;
        for cell_id in cells {
            self.world.remove_cell(cell_id);
        }
    }

    /// Spawn one cell for the player. With no explicit position the spawn
    /// prefers inheriting a resting ejected blob, then a safe random spot,
    /// then an unchecked random position.
    pub fn spawn_player(&mut self, player_id: u32, pos: Option<Vec2>, size: Option<f32>) {
        if !self.players.contains_key(&player_id) {
            return;
        }

        let mut pos = pos;
        if pos.is_none() && !self.world.eject_cells.is_empty() {
            let mut rng = rand::rng();
            if rng.random_range(1..=100) >= self.config.eject.spawn_player {
                let idx = rng.random_range(0..self.world.eject_cells.len());
                let eject_id = self.world.eject_cells[idx];
                let resting = self
                    .world
                    .get_cell(eject_id)
                    .map(|cell| cell.data().boost.is_none())
                    .unwrap_or(false);
                if resting {
                    pos = self.world.get_cell(eject_id).map(|cell| cell.data().position);
                    self.world.remove_cell(eject_id);
                }
            }
        }
        let pos = pos
            .or_else(|| {
                self.world
                    .find_safe_spawn_position(self.config.player.min_size as f32)
            })
            .unwrap_or_else(|| self.world.random_position());
        let size = size.unwrap_or(self.config.player.start_size as f32);

        let color = {
            let Some(player) = self.players.get_mut(&player_id) else {
                return;
            };
            self.gamemode.on_player_spawn(player);
            player.mouse = pos;
            player.color
        };

        let node_id = self.world.next_node_id();
        let mut cell = PlayerCell::new(node_id, player_id, pos, size, self.tick_count);
        cell.cell_data.color = color;
        let cell_id = self.world.add_cell(CellEntry::Player(cell));
        if let Some(player) = self.players.get_mut(&player_id) {
            player.cells.push(cell_id);
        }
        debug!("Spawned cell {} for player {}", cell_id, player_id);
    }

    /// Queue a mouse-target update for the next tick.
    pub fn set_mouse_target(&mut self, player_id: u32, point: Vec2) {
        self.pending_intents.push((player_id, Intent::SetMouse(point)));
    }

    /// Queue a split request for the next tick.
    pub fn request_split(&mut self, player_id: u32) {
        self.pending_intents.push((player_id, Intent::Split));
    }

    /// Queue an eject request for the next tick.
    pub fn request_eject(&mut self, player_id: u32) {
        self.pending_intents.push((player_id, Intent::Eject));
    }

    fn apply_intents(&mut self) {
        let intents = std::mem::take(&mut self.pending_intents);
        for (player_id, intent) in intents {
            match intent {
                Intent::SetMouse(point) => {
                    if let Some(player) = self.players.get_mut(&player_id) {
                        player.mouse = point;
                    }
                }
                Intent::Split => self.split_cells(player_id),
                Intent::Eject => self.eject_mass(player_id),
            }
        }
    }

    /// Run one simulation tick.
    pub fn tick(&mut self) {
        self.apply_intents();

        if self.running {
            self.update_move_engine();
            self.update_spawn();

            let mut gamemode = std::mem::replace(
                &mut self.gamemode,
                Box::new(crate::gamemodes::ffa::Ffa::new()),
            );
            gamemode.on_tick(self);
            self.gamemode = gamemode;

            if self.tick_count % self.config.ticks_per_second() == 0 {
                self.update_mass_decay();
            }
        }

        self.update_leaderboard();

        if self.running {
            self.tick_count += 1;
        }

        if self.tick_count % 400 == 0 {
            debug!(
                "Tick #{}: {} cells, {} players, avg {:.2}ms",
                self.tick_count,
                self.world.cell_count(),
                self.players.len(),
                self.update_time_avg
            );
        }
    }

    /// Periodic food/virus top-up.
    fn update_spawn(&mut self) {
        self.tick_spawn += 1;
        if self.tick_spawn < self.config.food.spawn_interval {
            return;
        }
        self.tick_spawn = 0;

        let room = self
            .config
            .food
            .max_amount
            .saturating_sub(self.world.food_cells.len());
        let count = room.min(self.config.food.spawn_amount);
        self.world.spawn_food(&self.config.food, count, self.tick_count);

        let room = self
            .config
            .virus
            .max_amount
            .saturating_sub(self.world.virus_cells.len());
        for _ in 0..room.min(2) {
            self.world.spawn_virus(&self.config.virus, self.tick_count);
        }
    }

    fn update_leaderboard(&mut self) {
        if self.tick_count % LEADERBOARD_TICKS != 0 {
            return;
        }
        let entries = self.gamemode.update_leaderboard(
            &self.world,
            &self.players,
            self.config.server.max_leaderboard,
        );
        self.largest_player = if self.gamemode.spec_by_leaderboard() {
            entries.first().map(|entry| entry.player_id)
        } else {
            self.players
                .values()
                .filter(|player| !player.cells.is_empty())
                .max_by(|a, b| a.score(&self.world).total_cmp(&b.score(&self.world)))
                .map(|player| player.id)
        };
        self.leaderboard = entries;
    }

    /// Remove a cell from the world and from its owner's list.
    pub(crate) fn despawn_cell(&mut self, cell_id: u32) {
        let entry = self.world.remove_cell(cell_id);
        if let Some(owner_id) = entry.data().owner_id {
            if let Some(player) = self.players.get_mut(&owner_id) {
                player.cells.retain(|&id| id != cell_id);
            }
        }
    }
}
