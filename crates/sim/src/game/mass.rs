//! Mass dynamics: splitting, ejecting, virus pops, and periodic decay.

use super::Game;
use crate::entity::{Cell, EjectedMass, PlayerCell, Virus};
use crate::world::CellEntry;
use glam::Vec2;
use rand::Rng;

impl Game {
    /// Split every eligible cell toward the owner's mouse target. Cells are
    /// considered in creation order; the owner's cell budget caps the batch.
    pub(crate) fn split_cells(&mut self, player_id: u32) {
        let max_cells = self.config.player.max_cells;
        let min_size = self.config.player.min_size as f32;
        let Some(player) = self.players.get(&player_id) else {
            return;
        };
        let mouse = player.mouse;

        let mut to_split: Vec<u32> = Vec::new();
        for &cell_id in &player.cells {
            let Some(cell) = self.world.get_cell(cell_id).and_then(|c| c.as_player()) else {
                continue;
            };
            if cell.split_size() < min_size {
                continue;
            }
            to_split.push(cell_id);
            if to_split.len() + player.cells.len() >= max_cells {
                break;
            }
        }

        for cell_id in to_split {
            let Some(pos) = self.world.get_cell(cell_id).map(|c| c.data().position) else {
                continue;
            };
            let dx = mouse.x - pos.x;
            let dy = mouse.y - pos.y;
            // no usable direction: split straight up
            let (dx, dy) = if dx * dx + dy * dy < 1.0 { (1.0, 0.0) } else { (dx, dy) };
            let angle = dx.atan2(dy);
            self.split_player_cell(player_id, cell_id, angle, None);
        }
    }

    /// Split `parent_id` once. With no mass given the cell halves so total
    /// mass is conserved; with a fixed mass the child takes it and the parent
    /// keeps the Pythagorean remainder of the squared sizes. Fails when the
    /// owner is at the cell budget or either side would drop below minimum.
    pub(crate) fn split_player_cell(
        &mut self,
        owner_id: u32,
        parent_id: u32,
        angle: f32,
        mass: Option<f32>,
    ) -> bool {
        let max_cells = self.config.player.max_cells;
        let min_size = self.config.player.min_size as f32;
        let Some(player) = self.players.get(&owner_id) else {
            return false;
        };
        if player.cells.len() >= max_cells {
            return false;
        }
        let Some(parent) = self.world.get_cell(parent_id).and_then(|c| c.as_player()) else {
            return false;
        };
        let parent_size = parent.cell_data.size;
        let color = parent.cell_data.color;
        let pos = parent.cell_data.position;

        let (parent_new_size, child_size) = match mass {
            None => {
                let half = parent.split_size();
                (half, half)
            }
            Some(mass) => {
                let child_size = (mass * 100.0).sqrt();
                let remainder = parent_size * parent_size - child_size * child_size;
                if remainder <= 0.0 {
                    return false;
                }
                (remainder.sqrt(), child_size)
            }
        };
        if parent_new_size < min_size || child_size < min_size {
            return false;
        }

        // shrink the parent first and restart its remerge clock
        if let Some(parent) = self.world.get_cell_mut(parent_id) {
            parent.data_mut().set_size(parent_new_size);
            if let Some(parent) = parent.as_player_mut() {
                parent.split_tick = self.tick_count;
                parent.can_remerge = false;
            }
        }
        self.world.update_node_quad(parent_id);

        // small positional shift so the pair extrudes in the right direction
        let child_pos = Vec2::new(pos.x + 40.0 * angle.sin(), pos.y + 40.0 * angle.cos());
        let node_id = self.world.next_node_id();
        let mut child = PlayerCell::new(node_id, owner_id, child_pos, child_size, self.tick_count);
        child.cell_data.color = color;
        child
            .cell_data
            .set_boost(self.config.player.split_speed as f32, angle);
        let cell_id = self.world.add_cell(CellEntry::Player(child));
        if let Some(player) = self.players.get_mut(&owner_id) {
            player.cells.push(cell_id);
        }
        true
    }

    /// Eject one chunk of mass per cell toward the mouse target, subject to
    /// the per-player cooldown. Cells that would drop below the minimum
    /// player size sit the round out.
    pub(crate) fn eject_mass(&mut self, player_id: u32) {
        let tick = self.tick_count;
        let cooldown = self.config.eject.cooldown;
        let eject_size = self.config.eject.size as f32;
        let eject_speed = self.config.eject.speed as f32;
        let min_size = self.config.player.min_size as f32;

        let Some(player) = self.players.get_mut(&player_id) else {
            return;
        };
        if let Some(last) = player.last_eject_tick {
            if tick.saturating_sub(last) < cooldown {
                return;
            }
        }
        player.last_eject_tick = Some(tick);
        let mouse = player.mouse;
        let cell_ids = player.cells.clone();

        let mut rng = rand::rng();
        for cell_id in cell_ids {
            let Some((pos, radius, color)) = self
                .world
                .get_cell(cell_id)
                .map(|c| (c.data().position, c.data().radius, c.data().color))
            else {
                continue;
            };
            let remaining_sq = radius - eject_size * eject_size;
            if remaining_sq < min_size * min_size {
                continue;
            }
            let new_size = remaining_sq.sqrt();

            let dx = mouse.x - pos.x;
            let dy = mouse.y - pos.y;
            let dl = dx * dx + dy * dy;
            let (nx, ny) = if dl < 1.0 {
                (1.0, 0.0)
            } else {
                let d = dl.sqrt();
                (dx / d, dy / d)
            };

            // pay for the chunk before it exists
            if let Some(cell) = self.world.get_cell_mut(cell_id) {
                cell.data_mut().set_size(new_size);
            }
            self.world.update_node_quad(cell_id);

            let spawn_pos = Vec2::new(pos.x + nx * new_size, pos.y + ny * new_size);
            let angle = nx.atan2(ny) + rng.random_range(-0.3..0.3);

            let node_id = self.world.next_node_id();
            let mut eject = EjectedMass::new(node_id, spawn_pos, eject_size, tick);
            eject.set_color(color);
            eject.data_mut().set_boost(eject_speed, angle);
            let new_id = self.world.add_cell(CellEntry::Eject(eject));
            self.world.add_moving(new_id);
        }
    }

    /// Burst a player cell that ate a virus into boosted pieces.
    pub(crate) fn pop_player_cell(&mut self, owner_id: u32, cell_id: u32) {
        let Some(cell_mass) = self.world.get_cell(cell_id).map(|c| c.data().mass) else {
            return;
        };
        let Some(player) = self.players.get(&owner_id) else {
            return;
        };
        let max_cells = self.config.virus.max_cells.min(self.config.player.max_cells);
        let cells_left = max_cells.saturating_sub(player.cells.len());
        if cells_left == 0 {
            return;
        }
        let split_min = self.config.virus.split_div as f32;
        let masses = virus_split_masses(cell_mass, cells_left, split_min);

        let mut rng = rand::rng();
        for mass in masses {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            self.split_player_cell(owner_id, cell_id, angle, Some(mass));
        }
    }

    /// Launch a fresh virus from `pos`.
    pub(crate) fn shoot_virus(&mut self, pos: Vec2, angle: f32) {
        let node_id = self.world.next_node_id();
        let mut virus = Virus::new(
            node_id,
            pos,
            self.config.virus.min_size as f32,
            self.tick_count,
        );
        virus
            .data_mut()
            .set_boost(self.config.virus.shoot_speed as f32, angle);
        self.world.add_cell(CellEntry::Virus(virus));
        self.world.add_moving(node_id);
    }

    /// Shrink every player cell by the decay rate, floored at the minimum
    /// player size. Runs once per simulated second, not every tick.
    pub(crate) fn update_mass_decay(&mut self) {
        let decay = 1.0 - self.config.player.decay_rate as f32 * self.gamemode.decay_mod();
        if decay == 0.0 {
            return;
        }
        let min_size = self.config.player.min_size as f32;

        let mut updates: Vec<(u32, f32)> = Vec::new();
        for &player_id in &self.player_order {
            let Some(player) = self.players.get(&player_id) else {
                continue;
            };
            for &cell_id in &player.cells {
                let Some(cell) = self.world.get_cell(cell_id) else {
                    continue;
                };
                let size = cell.data().size;
                let new_size = (size * decay).max(min_size);
                if new_size != size {
                    updates.push((cell_id, new_size));
                }
            }
        }
        for (cell_id, new_size) in updates {
            if let Some(cell) = self.world.get_cell_mut(cell_id) {
                cell.data_mut().set_size(new_size);
            }
            self.world.update_node_quad(cell_id);
        }
    }
}

/// Piece masses for popping a player cell. Undersized cells burst into a
/// power-of-two spray of equal crumbs; larger cells shed halves until the
/// budget fills out, the original cell keeping the last share.
fn virus_split_masses(cell_mass: f32, cells_left: usize, split_min: f32) -> Vec<f32> {
    let mut splits = Vec::new();

    if cell_mass / (cells_left as f32) < split_min {
        let mut split_count: usize = 2;
        let mut split_mass = cell_mass / split_count as f32;
        while split_mass > split_min && 2 * split_count < cells_left {
            split_count *= 2;
            split_mass = cell_mass / split_count as f32;
        }
        // the original cell keeps one share
        split_mass = cell_mass / (split_count + 1) as f32;
        for _ in 0..split_count {
            splits.push(split_mass);
        }
        return splits;
    }

    let mut mass_left = cell_mass / 2.0;
    let mut split_mass = cell_mass / 2.0;
    let mut remaining = cells_left as i32;
    loop {
        if remaining <= 0 {
            break;
        }
        remaining -= 1;

        let rem = remaining as f32;
        if mass_left / rem < split_min {
            // spread what's left evenly over the open slots
            split_mass = mass_left / rem;
            while remaining > 0 {
                remaining -= 1;
                splits.push(split_mass);
            }
        }
        while split_mass >= mass_left && remaining > 0 {
            split_mass /= 2.0;
        }
        splits.push(split_mass);
        mass_left -= split_mass;
    }
    splits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undersized_pop_sprays_equal_crumbs() {
        let masses = virus_split_masses(100.0, 15, 36.0);
        assert!(!masses.is_empty());
        let first = masses[0];
        assert!(masses.iter().all(|&m| (m - first).abs() < 0.001));
        // pieces plus the surviving cell's share account for the whole mass
        let total: f32 = masses.iter().sum::<f32>() + first;
        assert!((total - 100.0).abs() < 0.01);
    }

    #[test]
    fn large_pop_never_exceeds_slot_budget() {
        let masses = virus_split_masses(5000.0, 10, 36.0);
        assert!(masses.len() <= 10);
        assert!(masses.iter().all(|&m| m > 0.0));
        // total ejected never exceeds the popped cell's mass
        assert!(masses.iter().sum::<f32>() <= 5000.0);
    }
}
