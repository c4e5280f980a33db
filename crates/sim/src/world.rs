//! World state: entity registries, border geometry, and the spatial index.

use crate::color::Color;
use crate::config::{FoodConfig, VirusConfig};
use crate::entity::{Cell, CellData, CellType, EatenAction, EjectedMass, Food, PlayerCell, Virus};
use crate::spatial::{Bounds, QuadItem, QuadTree};
use glam::Vec2;
use rand::Rng;
use std::collections::HashMap;

/// Immutable-per-world arena rectangle.
#[derive(Debug, Clone, Copy)]
pub struct Border {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub width: f32,
    pub height: f32,
    pub center_x: f32,
    pub center_y: f32,
}

impl Border {
    pub fn new(width: f32, height: f32) -> Self {
        debug_assert!(width > 0.0 && height > 0.0, "degenerate border");
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Self {
            min_x: -half_w,
            min_y: -half_h,
            max_x: half_w,
            max_y: half_h,
            width,
            height,
            center_x: 0.0,
            center_y: 0.0,
        }
    }
}

/// Storage for one cell of any variant.
#[derive(Debug)]
pub enum CellEntry {
    Player(PlayerCell),
    Food(Food),
    Virus(Virus),
    Eject(EjectedMass),
}

impl CellEntry {
    pub fn data(&self) -> &CellData {
        match self {
            CellEntry::Player(c) => c.data(),
            CellEntry::Food(c) => c.data(),
            CellEntry::Virus(c) => c.data(),
            CellEntry::Eject(c) => c.data(),
        }
    }

    pub fn data_mut(&mut self) -> &mut CellData {
        match self {
            CellEntry::Player(c) => c.data_mut(),
            CellEntry::Food(c) => c.data_mut(),
            CellEntry::Virus(c) => c.data_mut(),
            CellEntry::Eject(c) => c.data_mut(),
        }
    }

    /// Type-specific willingness to consume `prey`.
    pub fn can_eat(&self, prey: &CellData) -> bool {
        match self {
            CellEntry::Player(c) => c.can_eat(prey),
            CellEntry::Food(c) => c.can_eat(prey),
            CellEntry::Virus(c) => c.can_eat(prey),
            CellEntry::Eject(c) => c.can_eat(prey),
        }
    }

    pub fn on_add(&mut self) {
        match self {
            CellEntry::Player(c) => c.on_add(),
            CellEntry::Food(c) => c.on_add(),
            CellEntry::Virus(c) => c.on_add(),
            CellEntry::Eject(c) => c.on_add(),
        }
    }

    pub fn on_remove(&mut self) {
        match self {
            CellEntry::Player(c) => c.on_remove(),
            CellEntry::Food(c) => c.on_remove(),
            CellEntry::Virus(c) => c.on_remove(),
            CellEntry::Eject(c) => c.on_remove(),
        }
    }

    pub fn on_eat(&mut self, prey: &CellData) {
        match self {
            CellEntry::Player(c) => c.on_eat(prey),
            CellEntry::Food(c) => c.on_eat(prey),
            CellEntry::Virus(c) => c.on_eat(prey),
            CellEntry::Eject(c) => c.on_eat(prey),
        }
    }

    pub fn on_eaten(&mut self, eater: &CellData) -> EatenAction {
        match self {
            CellEntry::Player(c) => c.on_eaten(eater),
            CellEntry::Food(c) => c.on_eaten(eater),
            CellEntry::Virus(c) => c.on_eaten(eater),
            CellEntry::Eject(c) => c.on_eaten(eater),
        }
    }

    pub fn as_player(&self) -> Option<&PlayerCell> {
        match self {
            CellEntry::Player(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut PlayerCell> {
        match self {
            CellEntry::Player(c) => Some(c),
            _ => None,
        }
    }
}

/// The game world containing all cells.
#[derive(Debug)]
pub struct World {
    /// Next node id; wraps past 2^31 - 1 back to 1.
    last_node_id: u32,

    pub(crate) cells: HashMap<u32, CellEntry>,

    pub player_cells: Vec<u32>,
    pub food_cells: Vec<u32>,
    pub virus_cells: Vec<u32>,
    pub eject_cells: Vec<u32>,

    player_pos: HashMap<u32, usize>,
    food_pos: HashMap<u32, usize>,
    virus_pos: HashMap<u32, usize>,
    eject_pos: HashMap<u32, usize>,
    moving_pos: HashMap<u32, usize>,

    /// Unowned cells currently tracked for boost movement.
    pub moving_cells: Vec<u32>,

    pub border: Border,

    pub quad_tree: QuadTree,
}

impl World {
    pub fn new(width: f32, height: f32) -> Self {
        let border = Border::new(width, height);
        Self {
            last_node_id: 1,
            cells: HashMap::with_capacity(2048),
            player_cells: Vec::with_capacity(256),
            food_cells: Vec::with_capacity(1024),
            virus_cells: Vec::with_capacity(64),
            eject_cells: Vec::with_capacity(256),
            player_pos: HashMap::with_capacity(256),
            food_pos: HashMap::with_capacity(1024),
            virus_pos: HashMap::with_capacity(64),
            eject_pos: HashMap::with_capacity(256),
            moving_pos: HashMap::with_capacity(256),
            moving_cells: Vec::with_capacity(256),
            quad_tree: QuadTree::for_world(border.min_x, border.min_y, border.max_x, border.max_y),
            border,
        }
    }

    /// Allocate the next node id, wrapping past 2^31 - 1 back to 1. Id reuse
    /// after wraparound is an accepted limitation.
    pub fn next_node_id(&mut self) -> u32 {
        if self.last_node_id > 2_147_483_647 {
            self.last_node_id = 1;
        }
        let id = self.last_node_id;
        self.last_node_id += 1;
        id
    }

    #[inline]
    pub fn get_cell(&self, id: u32) -> Option<&CellEntry> {
        self.cells.get(&id)
    }

    #[inline]
    pub fn get_cell_mut(&mut self, id: u32) -> Option<&mut CellEntry> {
        self.cells.get_mut(&id)
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Register a cell: one quad record and one registry entry, in the same
    /// step, then the variant's on-add hook.
    pub fn add_cell(&mut self, mut entry: CellEntry) -> u32 {
        let id = entry.data().node_id;
        {
            let data = entry.data();
            self.quad_tree
                .insert(QuadItem::new(id, data.position.x, data.position.y, data.size));
        }
        entry.on_add();
        match entry.data().cell_type {
            CellType::Player => push_to_list(&mut self.player_cells, &mut self.player_pos, id),
            CellType::Food => push_to_list(&mut self.food_cells, &mut self.food_pos, id),
            CellType::Virus => push_to_list(&mut self.virus_cells, &mut self.virus_pos, id),
            CellType::EjectedMass => push_to_list(&mut self.eject_cells, &mut self.eject_pos, id),
        }
        self.cells.insert(id, entry);
        id
    }

    /// Tombstone, de-index, and unregister a cell. Removing an id that is not
    /// registered means the registry has desynced from the index.
    pub fn remove_cell(&mut self, id: u32) -> CellEntry {
        let Some(mut entry) = self.cells.remove(&id) else {
            panic!("world: remove of unknown cell {id}");
        };
        entry.data_mut().is_removed = true;
        self.quad_tree.remove(id);
        match entry.data().cell_type {
            CellType::Player => remove_from_list(&mut self.player_cells, &mut self.player_pos, id),
            CellType::Food => remove_from_list(&mut self.food_cells, &mut self.food_pos, id),
            CellType::Virus => remove_from_list(&mut self.virus_cells, &mut self.virus_pos, id),
            CellType::EjectedMass => {
                remove_from_list(&mut self.eject_cells, &mut self.eject_pos, id)
            }
        }
        self.remove_from_moving(id);
        entry.on_remove();
        entry
    }

    /// Track a cell for boost movement.
    pub fn add_moving(&mut self, id: u32) {
        if !self.moving_pos.contains_key(&id) {
            push_to_list(&mut self.moving_cells, &mut self.moving_pos, id);
        }
    }

    /// Stop tracking a cell for boost movement; the cell itself survives.
    pub fn remove_from_moving(&mut self, id: u32) {
        if self.moving_pos.contains_key(&id) {
            remove_from_list(&mut self.moving_cells, &mut self.moving_pos, id);
        }
    }

    #[inline]
    pub fn is_moving(&self, id: u32) -> bool {
        self.moving_pos.contains_key(&id)
    }

    /// Refresh the cell's quad record after a position or size change. A cell
    /// with no record is an invariant violation and aborts.
    pub fn update_node_quad(&mut self, id: u32) {
        let Some(cell) = self.cells.get(&id) else {
            panic!("world: update_node_quad for unknown cell {id}");
        };
        let data = cell.data();
        if let Some(item) = self.quad_tree.get(id) {
            // no change, skip the index walk
            if item.x == data.position.x && item.y == data.position.y && item.size == data.size {
                return;
            }
        }
        self.quad_tree
            .update(id, data.position.x, data.position.y, data.size);
    }

    #[inline]
    pub fn random_position(&self) -> Vec2 {
        let mut rng = rand::rng();
        Vec2::new(
            rng.random_range(self.border.min_x..self.border.max_x),
            rng.random_range(self.border.min_y..self.border.max_y),
        )
    }

    #[inline]
    pub fn random_color() -> Color {
        let mut rng = rand::rng();
        Color::new(
            rng.random_range(50..=255),
            rng.random_range(50..=255),
            rng.random_range(50..=255),
        )
    }

    /// Whether a cell of `size` at `pos` would touch anything but food.
    fn will_collide(&self, pos: Vec2, size: f32) -> bool {
        let bound = Bounds::new(
            pos.x - size - 10.0,
            pos.y - size - 10.0,
            pos.x + size + 10.0,
            pos.y + size + 10.0,
        );
        self.quad_tree.any(&bound, |item| {
            self.cells
                .get(&item.id)
                .map(|cell| cell.data().cell_type != CellType::Food)
                .unwrap_or(false)
        })
    }

    /// Random position clear of non-food cells. Retries a few times stepping
    /// toward the emptier quadrant, then gives up; callers fall back to an
    /// unchecked position or skip the spawn.
    pub fn find_safe_spawn_position(&self, size: f32) -> Option<Vec2> {
        let mut pos = self.random_position();
        if !self.will_collide(pos, size) {
            return Some(pos);
        }

        let max_attempt = 4;
        let dir_x = if pos.x < self.border.center_x { 1.0 } else { -1.0 };
        let dir_y = if pos.y < self.border.center_y { 1.0 } else { -1.0 };
        let step_x = self.border.width / (2.0 * max_attempt as f32);
        let step_y = self.border.height / (2.0 * max_attempt as f32);
        for _ in 1..max_attempt {
            pos.x += step_x * dir_x;
            pos.y += step_y * dir_y;
            if !self.will_collide(pos, size) {
                return Some(pos);
            }
        }
        None
    }

    /// Spawn `count` food cells at unchecked random positions.
    pub fn spawn_food(&mut self, cfg: &FoodConfig, count: usize, tick: u64) {
        let mut rng = rand::rng();
        for _ in 0..count {
            let pos = self.random_position();
            let mut size = cfg.min_size as f32;
            if cfg.mass_grow {
                size += (cfg.max_size as f32 - size) * rng.random::<f32>();
            }
            let id = self.next_node_id();
            let mut food = Food::new(id, pos, size, tick);
            food.set_color(Self::random_color());
            self.add_cell(CellEntry::Food(food));
        }
    }

    /// Spawn one virus at a safe position; skipped silently when no safe
    /// position can be found this cycle.
    pub fn spawn_virus(&mut self, cfg: &VirusConfig, tick: u64) {
        let Some(pos) = self.find_safe_spawn_position(cfg.min_size as f32) else {
            return;
        };
        let id = self.next_node_id();
        let virus = Virus::new(id, pos, cfg.min_size as f32, tick);
        self.add_cell(CellEntry::Virus(virus));
    }

    #[inline]
    pub fn iter_cells(&self) -> impl Iterator<Item = (&u32, &CellEntry)> {
        self.cells.iter()
    }
}

fn push_to_list(list: &mut Vec<u32>, pos: &mut HashMap<u32, usize>, id: u32) {
    pos.insert(id, list.len());
    list.push(id);
}

fn remove_from_list(list: &mut Vec<u32>, pos: &mut HashMap<u32, usize>, id: u32) {
    let Some(idx) = pos.remove(&id) else {
        panic!("world: cell {id} missing from its type registry");
    };
    let last = list.len() - 1;
    if idx != last {
        let swapped = list[last];
        list.swap(idx, last);
        pos.insert(swapped, idx);
    }
    list.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Bounds;

    #[test]
    fn node_id_wraps_past_i32_max() {
        let mut world = World::new(100.0, 100.0);
        assert_eq!(world.next_node_id(), 1);
        assert_eq!(world.next_node_id(), 2);

        world.last_node_id = 2_147_483_647;
        assert_eq!(world.next_node_id(), 2_147_483_647);
        assert_eq!(world.next_node_id(), 1);
        assert_eq!(world.next_node_id(), 2);
    }

    #[test]
    fn add_remove_keeps_registries_and_index_in_sync() {
        let mut world = World::new(1000.0, 1000.0);
        let id = world.next_node_id();
        world.add_cell(CellEntry::Virus(Virus::new(id, Vec2::new(10.0, 10.0), 100.0, 0)));

        assert_eq!(world.virus_cells, vec![id]);
        assert!(world.quad_tree.get(id).is_some());

        let removed = world.remove_cell(id);
        assert!(removed.data().is_removed);
        assert!(world.virus_cells.is_empty());
        assert!(world.quad_tree.get(id).is_none());
        assert!(world.get_cell(id).is_none());
    }

    #[test]
    #[should_panic(expected = "remove of unknown cell")]
    fn double_remove_panics() {
        let mut world = World::new(1000.0, 1000.0);
        let id = world.next_node_id();
        world.add_cell(CellEntry::Food(Food::new(id, Vec2::ZERO, 10.0, 0)));
        world.remove_cell(id);
        world.remove_cell(id);
    }

    #[test]
    fn safe_spawn_ignores_food_but_not_viruses() {
        let mut world = World::new(200.0, 200.0);
        // carpet the arena with food; spawns stay safe
        for i in 0..16 {
            let id = world.next_node_id();
            let x = -75.0 + (i % 4) as f32 * 50.0;
            let y = -75.0 + (i / 4) as f32 * 50.0;
            world.add_cell(CellEntry::Food(Food::new(id, Vec2::new(x, y), 10.0, 0)));
        }
        assert!(world.find_safe_spawn_position(30.0).is_some());

        // one virus covering the whole arena blocks every attempt
        let id = world.next_node_id();
        world.add_cell(CellEntry::Virus(Virus::new(id, Vec2::ZERO, 200.0, 0)));
        assert!(world.find_safe_spawn_position(30.0).is_none());
    }

    #[test]
    fn moving_set_tracks_membership() {
        let mut world = World::new(1000.0, 1000.0);
        let id = world.next_node_id();
        world.add_cell(CellEntry::Eject(EjectedMass::new(id, Vec2::ZERO, 37.0, 0)));
        world.add_moving(id);
        world.add_moving(id);
        assert_eq!(world.moving_cells.len(), 1);
        assert!(world.is_moving(id));

        world.remove_from_moving(id);
        assert!(!world.is_moving(id));
        // the cell itself is untouched
        assert!(world.get_cell(id).is_some());
    }

    #[test]
    fn update_node_quad_tracks_movement() {
        let mut world = World::new(1000.0, 1000.0);
        let id = world.next_node_id();
        world.add_cell(CellEntry::Eject(EjectedMass::new(id, Vec2::ZERO, 37.0, 0)));

        world
            .get_cell_mut(id)
            .expect("cell present")
            .data_mut()
            .position = Vec2::new(300.0, 300.0);
        world.update_node_quad(id);

        let mut seen = false;
        world
            .quad_tree
            .find(&Bounds::from_center(300.0, 300.0, 50.0), |item| {
                seen |= item.id == id;
            });
        assert!(seen);
    }
}
