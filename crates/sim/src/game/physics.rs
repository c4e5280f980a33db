//! Per-tick movement and collision resolution.
//!
//! The pipeline is two-phase by construction: every pass first collects
//! candidate pairs from the index, then resolves them against live state.
//! Manifolds are recomputed fresh at resolution time because earlier
//! resolutions move cells and may remove one side of a pair.

use super::Game;
use crate::collision::{check_cell_collision, eat_distance, resolve_rigid, PLAYER_EAT_MULT};
use crate::entity::{CellType, EatenAction, JUST_SPLIT_TICKS};
use crate::world::{CellEntry, World};
use fixedbitset::FixedBitSet;
use glam::Vec2;
use rand::Rng;

/// Live position, size, and mass of a non-tombstoned cell.
fn live_body(world: &World, id: u32) -> Option<(Vec2, f32, f32)> {
    let cell = world.get_cell(id)?;
    let data = cell.data();
    if data.is_removed {
        return None;
    }
    Some((data.position, data.size, data.mass))
}

impl Game {
    /// Movement and collision pipeline, in strict order: move, re-index,
    /// broad-phase scan, rigid separation, eat resolution; first for player
    /// cells, then for the independently moving set.
    pub(crate) fn update_move_engine(&mut self) {
        self.move_player_cells();
        self.move_boosted_cells();

        let (rigid, eat) = self.scan_player_collisions();
        self.resolve_rigid_pairs(&rigid);
        self.resolve_eat_pairs(&eat);

        let (rigid, eat) = self.scan_moving_collisions();
        self.resolve_rigid_pairs(&rigid);
        self.resolve_eat_pairs(&eat);
    }

    /// Move every player cell: remerge-timer update, mouse-seek capped by the
    /// size-dependent speed, boost, border clamp, re-index.
    fn move_player_cells(&mut self) {
        let border = self.world.border;
        let tick = self.tick_count;
        let base_secs = self.config.player.recombine_time as f32;
        let ticks_per_sec = self.config.ticks_per_second();
        let speed_cfg = self.config.player.speed as f32;

        let mut targets: Vec<(u32, Vec2, f32)> = Vec::new();
        for &player_id in &self.player_order {
            let Some(player) = self.players.get(&player_id) else {
                continue;
            };
            let total_mass = player.score(&self.world);
            for &cell_id in &player.cells {
                targets.push((cell_id, player.mouse, total_mass));
            }
        }

        for (cell_id, mouse, total_mass) in targets {
            let Some(CellEntry::Player(cell)) = self.world.get_cell_mut(cell_id) else {
                continue;
            };
            if cell.cell_data.is_removed {
                continue;
            }
            cell.update_remerge(tick, base_secs, ticks_per_sec, total_mass);

            let dx = mouse.x - cell.cell_data.position.x;
            let dy = mouse.y - cell.cell_data.position.y;
            let squared = dx * dx + dy * dy;
            if squared >= 1.0 {
                let d = squared.sqrt();
                let speed = cell.speed(d, speed_cfg);
                if speed > 0.0 {
                    cell.cell_data.position.x += dx / d * speed;
                    cell.cell_data.position.y += dy / d * speed;
                    cell.cell_data.check_border(&border);
                }
            }
            cell.cell_data.update_boost(&border);
            self.world.update_node_quad(cell_id);
        }
    }

    /// Boost-only movement for unowned cells; cells whose boost decayed fall
    /// out of the moving set but stay in the world.
    fn move_boosted_cells(&mut self) {
        let border = self.world.border;
        let mut stopped: Vec<u32> = Vec::new();
        for i in 0..self.world.moving_cells.len() {
            let cell_id = self.world.moving_cells[i];
            let Some(cell) = self.world.get_cell_mut(cell_id) else {
                stopped.push(cell_id);
                continue;
            };
            if cell.data().is_removed {
                stopped.push(cell_id);
                continue;
            }
            let still_moving = cell.data_mut().update_boost(&border);
            self.world.update_node_quad(cell_id);
            if !still_moving {
                stopped.push(cell_id);
            }
        }
        for cell_id in stopped {
            self.world.remove_from_moving(cell_id);
        }
    }

    /// Broad phase over player cells: query the index with each cell's box
    /// and classify every manifold. Nothing is resolved inline; the index is
    /// still being queried.
    fn scan_player_collisions(&self) -> (Vec<(u32, u32)>, Vec<(u32, u32)>) {
        let mut rigid: Vec<(u32, u32)> = Vec::new();
        let mut eat: Vec<(u32, u32)> = Vec::new();

        for i in 0..self.world.player_cells.len() {
            let cell_id = self.world.player_cells[i];
            let Some(item) = self.world.quad_tree.get(cell_id) else {
                continue;
            };
            let (bound, pos, size) = (item.bound, Vec2::new(item.x, item.y), item.size);
            self.world.quad_tree.find(&bound, |other| {
                if other.id == cell_id {
                    return;
                }
                let hit = check_cell_collision(pos, size, Vec2::new(other.x, other.y), other.size);
                if hit.is_none() {
                    return;
                }
                if self.is_rigid_pair(cell_id, other.id) {
                    rigid.push((cell_id, other.id));
                } else {
                    eat.push((cell_id, other.id));
                }
            });
        }
        (rigid, eat)
    }

    /// Broad phase over the moving set. Ejected/ejected pairs bounce rigidly
    /// and both members re-enter the moving set; everything else is an eat
    /// candidate.
    fn scan_moving_collisions(&mut self) -> (Vec<(u32, u32)>, Vec<(u32, u32)>) {
        let mut rigid: Vec<(u32, u32)> = Vec::new();
        let mut eat: Vec<(u32, u32)> = Vec::new();
        let mut re_track: Vec<u32> = Vec::new();

        for i in 0..self.world.moving_cells.len() {
            let cell_id = self.world.moving_cells[i];
            let Some(cell) = self.world.get_cell(cell_id) else {
                continue;
            };
            if cell.data().is_removed {
                continue;
            }
            let cell_type = cell.data().cell_type;
            let Some(item) = self.world.quad_tree.get(cell_id) else {
                continue;
            };
            let (bound, pos, size) = (item.bound, Vec2::new(item.x, item.y), item.size);
            let cells = &self.world.cells;
            self.world.quad_tree.find(&bound, |other| {
                if other.id == cell_id {
                    return;
                }
                let hit = check_cell_collision(pos, size, Vec2::new(other.x, other.y), other.size);
                if hit.is_none() {
                    return;
                }
                // same-type pairs (ejected/ejected, virus/virus) bounce; any
                // other pairing is a potential meal
                let other_type = cells.get(&other.id).map(|c| c.data().cell_type);
                if other_type == Some(cell_type) {
                    rigid.push((cell_id, other.id));
                    re_track.push(cell_id);
                    re_track.push(other.id);
                } else {
                    eat.push((cell_id, other.id));
                }
            });
        }

        for cell_id in re_track {
            if self.world.get_cell(cell_id).is_some() {
                self.world.add_moving(cell_id);
            }
        }
        (rigid, eat)
    }

    /// A pair separates rigidly instead of eating when both sides are owned
    /// and either the owners are teammates or the same owner's recombine lock
    /// is still active.
    fn is_rigid_pair(&self, id1: u32, id2: u32) -> bool {
        let (Some(c1), Some(c2)) = (self.world.get_cell(id1), self.world.get_cell(id2)) else {
            return false;
        };
        let (Some(o1), Some(o2)) = (c1.data().owner_id, c2.data().owner_id) else {
            return false;
        };
        if o1 != o2 {
            if !self.gamemode.have_teams() {
                return false;
            }
            let t1 = self.players.get(&o1).and_then(|p| p.team);
            let t2 = self.players.get(&o2).and_then(|p| p.team);
            return t1.is_some() && t1 == t2;
        }

        // same owner
        if self.players.get(&o1).map(|p| p.merge_override).unwrap_or(false) {
            return false;
        }
        let tick = self.tick_count;
        if c1.data().age(tick) < JUST_SPLIT_TICKS || c2.data().age(tick) < JUST_SPLIT_TICKS {
            return true;
        }
        let r1 = c1.as_player().map(|p| p.can_remerge).unwrap_or(false);
        let r2 = c2.as_player().map(|p| p.can_remerge).unwrap_or(false);
        !(r1 && r2)
    }

    /// Two correction passes with fresh manifolds, then one re-index per pair
    /// member. Re-indexing once instead of per pass trades staleness between
    /// passes for fewer index updates.
    fn resolve_rigid_pairs(&mut self, pairs: &[(u32, u32)]) {
        if pairs.is_empty() {
            return;
        }
        let border = self.world.border;

        for _pass in 0..2 {
            for &(id1, id2) in pairs {
                let Some((pos1, size1, mass1)) = live_body(&self.world, id1) else {
                    continue;
                };
                let Some((pos2, size2, mass2)) = live_body(&self.world, id2) else {
                    continue;
                };
                let Some(manifold) = check_cell_collision(pos1, size1, pos2, size2) else {
                    continue;
                };
                let Some((delta1, delta2)) = resolve_rigid(&manifold, mass1, mass2) else {
                    continue;
                };
                if let Some(cell) = self.world.get_cell_mut(id1) {
                    let data = cell.data_mut();
                    data.position += delta1;
                    data.check_border(&border);
                }
                if let Some(cell) = self.world.get_cell_mut(id2) {
                    let data = cell.data_mut();
                    data.position += delta2;
                    data.check_border(&border);
                }
            }
        }

        let mut touched = FixedBitSet::with_capacity(256);
        for &(id1, id2) in pairs {
            for id in [id1, id2] {
                let idx = id as usize;
                if idx >= touched.len() {
                    touched.grow(idx + 1);
                }
                if !touched.contains(idx) {
                    touched.insert(idx);
                    if self.world.get_cell(id).is_some() {
                        self.world.update_node_quad(id);
                    }
                }
            }
        }
    }

    fn resolve_eat_pairs(&mut self, pairs: &[(u32, u32)]) {
        for &(id1, id2) in pairs {
            self.resolve_eat(id1, id2);
        }
    }

    /// The eat decision procedure on an ordered (smaller, larger) pair.
    fn resolve_eat(&mut self, id1: u32, id2: u32) {
        let Some(d1) = self.world.get_cell(id1).map(|c| c.data().clone()) else {
            return;
        };
        let Some(d2) = self.world.get_cell(id2).map(|c| c.data().clone()) else {
            return;
        };
        if d1.is_removed || d2.is_removed {
            return;
        }
        let (min_d, max_d) = if d1.size > d2.size { (d2, d1) } else { (d1, d2) };
        let (min_id, max_id) = (min_d.node_id, max_d.node_id);

        let Some(manifold) =
            check_cell_collision(min_d.position, min_d.size, max_d.position, max_d.size)
        else {
            return;
        };

        // must overlap deeply enough to swallow
        let eat_dist = eat_distance(min_d.size, max_d.size);
        if manifold.squared >= eat_dist * eat_dist {
            return;
        }

        let tick = self.tick_count;
        if min_d.owner_id.is_some() && min_d.owner_id == max_d.owner_id {
            // owned/owned: merge only after the grace period, and only when
            // forced or both sides are remerge-eligible
            if min_d.age(tick) < JUST_SPLIT_TICKS || max_d.age(tick) < JUST_SPLIT_TICKS {
                return;
            }
            let merge_override = min_d
                .owner_id
                .and_then(|id| self.players.get(&id))
                .map(|p| p.merge_override)
                .unwrap_or(false);
            if !merge_override {
                let r_min = self
                    .world
                    .get_cell(min_id)
                    .and_then(|c| c.as_player())
                    .map(|p| p.can_remerge)
                    .unwrap_or(false);
                let r_max = self
                    .world
                    .get_cell(max_id)
                    .and_then(|c| c.as_player())
                    .map(|p| p.can_remerge)
                    .unwrap_or(false);
                if !(r_min && r_max) {
                    return;
                }
            }
        } else {
            // owned/enemy: never eat a teammate
            if self.gamemode.have_teams() {
                if let (Some(o1), Some(o2)) = (min_d.owner_id, max_d.owner_id) {
                    let t1 = self.players.get(&o1).and_then(|p| p.team);
                    let t2 = self.players.get(&o2).and_then(|p| p.team);
                    if t1.is_some() && t1 == t2 {
                        return;
                    }
                }
            }
            // must be meaningfully larger to eat
            if min_d.size * PLAYER_EAT_MULT > max_d.size {
                return;
            }
        }

        // the larger cell may still refuse
        let willing = self
            .world
            .get_cell(max_id)
            .map(|c| c.can_eat(&min_d))
            .unwrap_or(false);
        if !willing {
            return;
        }
        if max_d.cell_type == CellType::Virus
            && self.world.virus_cells.len() >= self.config.virus.max_amount
        {
            // a saturated map lets ejected mass pass through viruses
            return;
        }

        // commit
        if let Some(cell) = self.world.get_cell_mut(min_id) {
            cell.data_mut().is_removed = true;
        }
        // release the force-merge on the last merging pair before the consume
        // hooks run; the pop side effect may split the owner again
        if let Some(owner_id) = min_d.owner_id {
            if let Some(player) = self.players.get_mut(&owner_id) {
                if player.cells.len() <= 2 {
                    player.merge_override = false;
                }
            }
        }
        if let Some(cell) = self.world.get_cell_mut(max_id) {
            cell.on_eat(&min_d);
        }
        let action = self
            .world
            .get_cell_mut(min_id)
            .map(|c| c.on_eaten(&max_d))
            .unwrap_or(EatenAction::None);
        self.world.update_node_quad(max_id);
        self.despawn_cell(min_id);

        if max_d.cell_type == CellType::Virus {
            self.check_virus_shoot(max_id, min_d.boost.map(|b| b.angle));
        }
        match action {
            EatenAction::PopEater => {
                if let Some(owner_id) = max_d.owner_id {
                    self.pop_player_cell(owner_id, max_id);
                }
            }
            EatenAction::None => {}
        }
    }

    /// A virus grown past its maximum resets to minimum size and launches a
    /// fresh virus along the eaten mass's path.
    fn check_virus_shoot(&mut self, virus_id: u32, angle: Option<f32>) {
        let max_size = self.config.virus.max_size as f32;
        let min_size = self.config.virus.min_size as f32;
        let Some(cell) = self.world.get_cell(virus_id) else {
            return;
        };
        if cell.data().size < max_size {
            return;
        }
        let pos = cell.data().position;
        if let Some(cell) = self.world.get_cell_mut(virus_id) {
            cell.data_mut().set_size(min_size);
        }
        self.world.update_node_quad(virus_id);

        let angle =
            angle.unwrap_or_else(|| rand::rng().random_range(0.0..std::f32::consts::TAU));
        self.shoot_virus(pos, angle);
    }
}
