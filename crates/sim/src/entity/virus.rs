//! Virus cell.

use super::cell::{Cell, CellData, CellType, EatenAction};
use crate::color::Color;
use glam::Vec2;

/// Default virus color (green).
pub const VIRUS_COLOR: Color = Color::new(51, 255, 51);

/// A spiked cell that pops oversized player cells and feeds on ejected mass.
#[derive(Debug, Clone)]
pub struct Virus {
    data: CellData,
}

impl Virus {
    pub fn new(node_id: u32, position: Vec2, size: f32, tick: u64) -> Self {
        let mut data = CellData::new(node_id, CellType::Virus, position, size, tick);
        data.color = VIRUS_COLOR;
        Self { data }
    }
}

impl Cell for Virus {
    fn data(&self) -> &CellData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut CellData {
        &mut self.data
    }

    /// Viruses refuse everything except ejected mass.
    fn can_eat(&self, prey: &CellData) -> bool {
        prey.cell_type == CellType::EjectedMass
    }

    fn on_eaten(&mut self, eater: &CellData) -> EatenAction {
        if eater.cell_type == CellType::Player && eater.owner_id.is_some() {
            EatenAction::PopEater
        } else {
            EatenAction::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virus_only_eats_ejected_mass() {
        let virus = Virus::new(1, Vec2::ZERO, 100.0, 0);
        let eject = CellData::new(2, CellType::EjectedMass, Vec2::ZERO, 37.0, 0);
        let food = CellData::new(3, CellType::Food, Vec2::ZERO, 10.0, 0);
        let mut player = CellData::new(4, CellType::Player, Vec2::ZERO, 50.0, 0);
        player.owner_id = Some(1);

        assert!(virus.can_eat(&eject));
        assert!(!virus.can_eat(&food));
        assert!(!virus.can_eat(&player));
    }

    #[test]
    fn virus_pops_owned_player_eater() {
        let mut virus = Virus::new(1, Vec2::ZERO, 100.0, 0);
        let mut player = CellData::new(2, CellType::Player, Vec2::ZERO, 130.0, 0);
        player.owner_id = Some(9);
        assert_eq!(virus.on_eaten(&player), EatenAction::PopEater);

        let unowned = CellData::new(3, CellType::Player, Vec2::ZERO, 130.0, 0);
        assert_eq!(virus.on_eaten(&unowned), EatenAction::None);
    }
}
