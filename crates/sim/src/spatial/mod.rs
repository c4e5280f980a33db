//! Spatial indexing.

mod quadtree;

pub use quadtree::{Bounds, QuadItem, QuadTree};
