//! Player cell.

use super::cell::{Cell, CellData, CellType, JUST_SPLIT_TICKS};
use glam::Vec2;

/// Remerge delay grows with the owner's total mass at this rate (seconds per
/// unit of mass), so large players take longer to fuse back together.
const REMERGE_MASS_SCALE: f32 = 0.02;

/// One piece of a player's body.
#[derive(Debug, Clone)]
pub struct PlayerCell {
    pub cell_data: CellData,
    /// Whether this cell may currently fuse with a sibling.
    pub can_remerge: bool,
    /// Tick of the last split involving this cell; remerge timing starts here.
    pub split_tick: u64,
}

impl PlayerCell {
    pub fn new(node_id: u32, owner_id: u32, position: Vec2, size: f32, tick: u64) -> Self {
        let mut data = CellData::new(node_id, CellType::Player, position, size, tick);
        data.owner_id = Some(owner_id);
        Self {
            cell_data: data,
            can_remerge: false,
            split_tick: tick,
        }
    }

    /// Size each half ends up with when this cell splits in two.
    #[inline]
    pub fn split_size(&self) -> f32 {
        self.cell_data.size / std::f32::consts::SQRT_2
    }

    /// Refresh the remerge eligibility. The delay is the configured base or
    /// a value growing with the owner's total mass, whichever is longer, and
    /// it restarts at `split_tick` on every split. With no configured base
    /// the cell may fuse as soon as its boost has mostly decayed.
    pub fn update_remerge(
        &mut self,
        current_tick: u64,
        base_secs: f32,
        ticks_per_sec: u64,
        owner_total_mass: f32,
    ) {
        let age = current_tick.saturating_sub(self.split_tick);
        if age < JUST_SPLIT_TICKS {
            self.can_remerge = false;
            return;
        }
        if base_secs <= 0.0 {
            self.can_remerge = self
                .cell_data
                .boost
                .map(|b| b.distance < 100.0)
                .unwrap_or(true);
            return;
        }
        let delay_secs = base_secs.max(REMERGE_MASS_SCALE * owner_total_mass);
        self.can_remerge = age >= (delay_secs * ticks_per_sec as f32) as u64;
    }

    /// Movement speed toward the mouse target, falling off with size and
    /// capped by the remaining distance.
    pub fn speed(&self, distance: f32, speed_config: f32) -> f32 {
        let base = 2.2 * self.cell_data.size.powf(-0.439) * 40.0;
        base * (speed_config / 30.0) * (distance.min(32.0) / 32.0)
    }
}

impl Cell for PlayerCell {
    fn data(&self) -> &CellData {
        &self.cell_data
    }

    fn data_mut(&mut self) -> &mut CellData {
        &mut self.cell_data
    }

    fn can_eat(&self, _prey: &CellData) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn young_cell_cannot_remerge() {
        let mut cell = PlayerCell::new(1, 1, Vec2::ZERO, 60.0, 100);
        cell.update_remerge(100 + JUST_SPLIT_TICKS - 1, 30.0, 25, 36.0);
        assert!(!cell.can_remerge);
    }

    #[test]
    fn remerge_after_base_delay() {
        let mut cell = PlayerCell::new(1, 1, Vec2::ZERO, 60.0, 0);
        // base 30s at 25 ticks/s, small owner
        cell.update_remerge(30 * 25 - 1, 30.0, 25, 36.0);
        assert!(!cell.can_remerge);
        cell.update_remerge(30 * 25, 30.0, 25, 36.0);
        assert!(cell.can_remerge);
    }

    #[test]
    fn remerge_delay_grows_with_owner_mass() {
        let mut cell = PlayerCell::new(1, 1, Vec2::ZERO, 60.0, 0);
        // 4000 mass -> 80 s delay
        cell.update_remerge(30 * 25, 30.0, 25, 4000.0);
        assert!(!cell.can_remerge);
        cell.update_remerge(80 * 25, 30.0, 25, 4000.0);
        assert!(cell.can_remerge);
    }

    #[test]
    fn zero_base_waits_for_boost_decay() {
        let mut cell = PlayerCell::new(1, 1, Vec2::ZERO, 60.0, 0);
        cell.cell_data.set_boost(780.0, 0.0);
        cell.update_remerge(JUST_SPLIT_TICKS, 0.0, 25, 36.0);
        assert!(!cell.can_remerge);
        cell.cell_data.boost = None;
        cell.update_remerge(JUST_SPLIT_TICKS, 0.0, 25, 36.0);
        assert!(cell.can_remerge);
    }

    #[test]
    fn split_size_conserves_mass() {
        let cell = PlayerCell::new(1, 1, Vec2::ZERO, 90.0, 0);
        let half = cell.split_size();
        assert!((2.0 * half * half - 90.0f32 * 90.0).abs() < 0.01);
    }
}
