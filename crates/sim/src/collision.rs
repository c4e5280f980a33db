//! Collision manifold math shared by the per-tick resolution passes.

use glam::Vec2;

/// A player cell must be 15% larger to eat another player cell.
pub const PLAYER_EAT_MULT: f32 = 1.15;
/// Mass = size^2 / 100.
const MASS_CONVERSION: f32 = 100.0;

/// Geometric relationship between two candidate colliding cells.
#[derive(Debug, Clone, Copy)]
pub struct Manifold {
    /// Combined radius of both cells.
    pub r: f32,
    /// Delta x from the first cell to the second.
    pub dx: f32,
    /// Delta y from the first cell to the second.
    pub dy: f32,
    /// Squared center distance.
    pub squared: f32,
}

/// Circle-circle test. Returns the manifold when the cells touch or overlap.
#[inline]
pub fn check_cell_collision(pos1: Vec2, size1: f32, pos2: Vec2, size2: f32) -> Option<Manifold> {
    let r = size1 + size2;
    let dx = pos2.x - pos1.x;
    let dy = pos2.y - pos1.y;
    let squared = dx * dx + dy * dy;
    if squared > r * r {
        return None;
    }
    Some(Manifold { r, dx, dy, squared })
}

/// Range within which the larger of an ordered pair may consume the smaller.
#[inline]
pub fn eat_distance(min_size: f32, max_size: f32) -> f32 {
    max_size - min_size / std::f32::consts::PI
}

/// Positional corrections separating a rigid pair along the line of centers,
/// split by inverse-mass ratio so the heavier cell moves less. Returns `None`
/// for stale manifolds (no remaining penetration) and coincident centers.
pub fn resolve_rigid(manifold: &Manifold, mass1: f32, mass2: f32) -> Option<(Vec2, Vec2)> {
    let d = manifold.squared.sqrt();
    if d <= 0.0 {
        return None;
    }
    let inv_d = 1.0 / d;

    // normal
    let nx = manifold.dx * inv_d;
    let ny = manifold.dy * inv_d;

    // body penetration distance
    let penetration = manifold.r - d;
    if penetration <= 0.0 {
        return None;
    }
    let px = penetration * nx;
    let py = penetration * ny;

    let total_mass = mass1 + mass2;
    if total_mass <= 0.0 {
        return None;
    }
    let inv_total = 1.0 / total_mass;
    let impulse1 = mass2 * inv_total;
    let impulse2 = mass1 * inv_total;

    Some((
        Vec2::new(-px * impulse1, -py * impulse1),
        Vec2::new(px * impulse2, py * impulse2),
    ))
}

/// Matches size^2 / 100.
#[inline]
pub fn size_to_mass(size: f32) -> f32 {
    (size * size) / MASS_CONVERSION
}

/// Matches sqrt(100 * mass).
#[inline]
pub fn mass_to_size(mass: f32) -> f32 {
    (MASS_CONVERSION * mass).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_mass_conversion() {
        let mass = 100.0;
        let size = mass_to_size(mass);
        let back = size_to_mass(size);
        assert!((back - mass).abs() < 0.001);
    }

    #[test]
    fn test_collision_check() {
        let m = check_cell_collision(Vec2::new(0.0, 0.0), 50.0, Vec2::new(30.0, 0.0), 20.0)
            .expect("should collide");
        assert_eq!(m.squared, 900.0); // 50 + 20 = 70, distance = 30
        assert_eq!(m.r, 70.0);
    }

    #[test]
    fn test_no_collision() {
        let m = check_cell_collision(Vec2::new(0.0, 0.0), 10.0, Vec2::new(100.0, 0.0), 10.0);
        assert!(m.is_none()); // 10 + 10 = 20, distance = 100
    }

    #[test]
    fn test_eat_distance() {
        // 60 - 50/pi is about 44.1
        let d = eat_distance(50.0, 60.0);
        assert!((d - 44.08).abs() < 0.1);
    }

    #[test]
    fn rigid_resolution_reduces_penetration() {
        let pos1 = Vec2::new(0.0, 0.0);
        let pos2 = Vec2::new(40.0, 0.0);
        let (size1, size2) = (50.0, 60.0);
        let m = check_cell_collision(pos1, size1, pos2, size2).expect("overlapping");
        let before = m.r - m.squared.sqrt();
        assert!(before > 0.0);

        let (d1, d2) =
            resolve_rigid(&m, size_to_mass(size1), size_to_mass(size2)).expect("penetrating");
        let (pos1, pos2) = (pos1 + d1, pos2 + d2);
        let after = (size1 + size2) - pos1.distance(pos2);
        assert!(after < before);
        assert!(after.abs() < 0.001); // one pass fully separates an isolated pair
    }

    #[test]
    fn rigid_resolution_weights_by_mass() {
        let m = check_cell_collision(Vec2::new(0.0, 0.0), 30.0, Vec2::new(20.0, 0.0), 60.0)
            .expect("overlapping");
        let (light, heavy) = resolve_rigid(&m, 9.0, 36.0).expect("penetrating");
        // heavier cell moves a quarter as far
        assert!((light.length() - 4.0 * heavy.length()).abs() < 0.001);
    }

    #[test]
    fn rigid_resolution_skips_separated_pair() {
        let m = Manifold {
            r: 10.0,
            dx: 12.0,
            dy: 0.0,
            squared: 144.0,
        };
        assert!(resolve_rigid(&m, 1.0, 1.0).is_none());
    }
}
