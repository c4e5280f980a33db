//! Game entities (cells).
//!
//! This module defines all cell types in the world.

mod cell;
mod ejected_mass;
mod food;
mod player_cell;
mod virus;

pub use cell::{BoostData, Cell, CellData, CellType, EatenAction, JUST_SPLIT_TICKS};
pub use ejected_mass::EjectedMass;
pub use food::Food;
pub use player_cell::PlayerCell;
pub use virus::{Virus, VIRUS_COLOR};
