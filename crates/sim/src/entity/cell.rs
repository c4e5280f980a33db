//! Base cell state and the per-variant behavior hooks.

use crate::color::Color;
use crate::world::Border;
use glam::Vec2;

/// Mass = radius / 100.
const MASS_DIVISOR: f32 = 100.0;

/// Ticks after a split during which a cell neither merges nor gets eaten by
/// its siblings.
pub const JUST_SPLIT_TICKS: u64 = 15;

/// Cell variant tag.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellType {
    #[default]
    Player = 0,
    Food = 1,
    Virus = 2,
    EjectedMass = 3,
}

/// Common cell state shared by all variants.
#[derive(Debug, Clone)]
pub struct CellData {
    /// Unique node id.
    pub node_id: u32,
    /// Owning player id (None for food, viruses, loose ejected mass).
    pub owner_id: Option<u32>,
    pub cell_type: CellType,
    /// Position in world coordinates.
    pub position: Vec2,
    /// Cell size (radius-equivalent).
    pub size: f32,
    /// size^2, used for collision and growth.
    pub radius: f32,
    /// radius / 100.
    pub mass: f32,
    pub color: Color,
    /// Tick when the cell was created.
    pub tick_of_birth: u64,
    /// Tombstone; set once, never cleared.
    pub is_removed: bool,
    /// Boost movement, consumed linearly each tick.
    pub boost: Option<BoostData>,
}

impl CellData {
    pub fn new(node_id: u32, cell_type: CellType, position: Vec2, size: f32, tick: u64) -> Self {
        let radius = size * size;
        let mass = radius / MASS_DIVISOR;
        Self {
            node_id,
            owner_id: None,
            cell_type,
            position,
            size,
            radius,
            mass,
            color: Color::default(),
            tick_of_birth: tick,
            is_removed: false,
            boost: None,
        }
    }

    /// Set the cell size and keep radius/mass in sync.
    #[inline]
    pub fn set_size(&mut self, size: f32) {
        self.size = size;
        self.radius = size * size;
        self.mass = self.radius / MASS_DIVISOR;
    }

    /// Absorb another cell's area.
    #[inline]
    pub fn grow(&mut self, other_radius: f32) {
        let new_radius = self.radius + other_radius;
        self.set_size(new_radius.sqrt());
    }

    /// Ticks since creation.
    #[inline]
    pub fn age(&self, current_tick: u64) -> u64 {
        current_tick.saturating_sub(self.tick_of_birth)
    }

    /// Launch the cell; the angle is measured from the +y axis.
    #[inline]
    pub fn set_boost(&mut self, distance: f32, angle: f32) {
        self.boost = Some(BoostData {
            distance,
            direction: Vec2::new(angle.sin(), angle.cos()),
            angle,
        });
    }

    /// Clamp the position so the cell stays inside the border.
    #[inline]
    pub fn check_border(&mut self, border: &Border) {
        let half_size = self.size / 2.0;
        self.position.x = self
            .position
            .x
            .clamp(border.min_x + half_size, border.max_x - half_size);
        self.position.y = self
            .position
            .y
            .clamp(border.min_y + half_size, border.max_y - half_size);
    }

    /// Advance boost movement by one tick: travel a tenth of the remaining
    /// distance and clamp to the border. Returns whether the boost is still
    /// live; a spent boost is cleared.
    pub fn update_boost(&mut self, border: &Border) -> bool {
        let Some(boost) = &mut self.boost else {
            return false;
        };
        if boost.distance < 1.0 {
            self.boost = None;
            return false;
        }

        let step = boost.distance / 10.0;
        boost.distance -= step;
        self.position += boost.direction * step;
        self.check_border(border);
        true
    }
}

/// Boost movement state.
#[derive(Debug, Clone, Copy)]
pub struct BoostData {
    /// Remaining distance to travel.
    pub distance: f32,
    /// Direction vector (normalized).
    pub direction: Vec2,
    /// Original launch angle.
    pub angle: f32,
}

/// Follow-up the world applies after a cell has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EatenAction {
    None,
    /// Pop the eating cell apart (virus eaten by a player cell).
    PopEater,
}

/// Behavior hooks implemented per cell variant. These are the only extension
/// points the collision and spawn machinery calls into.
pub trait Cell {
    fn data(&self) -> &CellData;

    fn data_mut(&mut self) -> &mut CellData;

    /// Whether this cell is willing to consume `prey`.
    fn can_eat(&self, _prey: &CellData) -> bool {
        false
    }

    /// Called when the cell is added to the world.
    fn on_add(&mut self) {}

    /// Called when the cell is removed from the world.
    fn on_remove(&mut self) {}

    /// Called when this cell consumes `prey`; the default absorbs its area.
    fn on_eat(&mut self, prey: &CellData) {
        let radius = prey.radius;
        self.data_mut().grow(radius);
    }

    /// Called when this cell has been consumed by `eater`.
    fn on_eaten(&mut self, _eater: &CellData) -> EatenAction {
        EatenAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_sums_areas() {
        let mut data = CellData::new(1, CellType::Player, Vec2::ZERO, 60.0, 0);
        data.grow(50.0 * 50.0);
        assert!((data.size - (3600.0f32 + 2500.0).sqrt()).abs() < 0.001);
        assert!((data.mass - 61.0).abs() < 0.001);
    }

    #[test]
    fn boost_decays_to_nothing() {
        let border = Border::new(1000.0, 1000.0);
        let mut data = CellData::new(1, CellType::EjectedMass, Vec2::ZERO, 37.0, 0);
        data.set_boost(200.0, 0.0);

        let mut ticks = 0;
        while data.update_boost(&border) {
            ticks += 1;
            assert!(ticks < 200, "boost never decayed");
        }
        assert!(data.boost.is_none());
        // launched along +y
        assert!(data.position.y > 0.0);
        assert!(data.position.x.abs() < 0.001);
    }

    #[test]
    fn border_clamp_keeps_cell_inside() {
        let border = Border::new(100.0, 100.0);
        let mut data = CellData::new(1, CellType::Player, Vec2::new(500.0, -500.0), 20.0, 0);
        data.check_border(&border);
        assert_eq!(data.position, Vec2::new(40.0, -40.0));
    }
}
