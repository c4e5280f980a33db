//! Per-player state owned by the simulation.

use crate::color::Color;
use crate::world::World;
use glam::Vec2;

/// A participant controlling a set of cells. Cells are kept in creation
/// order, not size order.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub color: Color,
    /// Ids of owned player cells, in creation order.
    pub cells: Vec<u32>,
    /// Forces immediate merging; auto-clears once at most two cells remain.
    pub merge_override: bool,
    /// Tick of the last accepted eject, for the eject cooldown.
    pub last_eject_tick: Option<u64>,
    /// Movement attractor shared by all owned cells.
    pub mouse: Vec2,
    pub team: Option<u8>,
}

impl Player {
    pub fn new(id: u32, name: String) -> Self {
        Self {
            id,
            name,
            color: World::random_color(),
            cells: Vec::new(),
            merge_override: false,
            last_eject_tick: None,
            mouse: Vec2::ZERO,
            team: None,
        }
    }

    /// Total mass of all owned cells.
    pub fn score(&self, world: &World) -> f32 {
        self.cells
            .iter()
            .filter_map(|id| world.get_cell(*id))
            .map(|cell| cell.data().mass)
            .sum()
    }
}
