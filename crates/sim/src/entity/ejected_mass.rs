//! Ejected mass cell.

use super::cell::{Cell, CellData, CellType};
use crate::color::Color;
use glam::Vec2;

/// A blob of mass ejected by a player cell.
#[derive(Debug, Clone)]
pub struct EjectedMass {
    data: CellData,
}

impl EjectedMass {
    pub fn new(node_id: u32, position: Vec2, size: f32, tick: u64) -> Self {
        Self {
            data: CellData::new(node_id, CellType::EjectedMass, position, size, tick),
        }
    }

    /// Inherits the ejecting cell's color.
    pub fn set_color(&mut self, color: Color) {
        self.data.color = color;
    }
}

impl Cell for EjectedMass {
    fn data(&self) -> &CellData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut CellData {
        &mut self.data
    }
}
