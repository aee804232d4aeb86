//! Hex grid topology in doubled coordinates

use serde::{Deserialize, Serialize};

/// Column on the hex grid.
///
/// Doubled coordinates: `x + y` is always even, horizontal neighbours are two
/// columns apart and diagonal neighbours one column and one row apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hex {
    pub x: i16,
    pub y: i16,
}

/// The cell the first piece of every game is placed on
pub const ORIGIN: Hex = Hex::new(0, 0);

/// Direction vectors (dx, dy) in rotational order.
/// Index: 0=E, 1=SE, 2=SW, 3=W, 4=NW, 5=NE
pub const DIRECTIONS: [(i16, i16); 6] = [
    (2, 0),   // E
    (1, 1),   // SE
    (-1, 1),  // SW
    (-2, 0),  // W
    (-1, -1), // NW
    (1, -1),  // NE
];

impl Hex {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    /// Check the doubled-coordinate parity
    pub fn is_valid(&self) -> bool {
        (self.x + self.y) & 1 == 0
    }

    /// Get neighbor in direction (0-5)
    pub fn neighbor(&self, direction: usize) -> Hex {
        let (dx, dy) = DIRECTIONS[direction % 6];
        Hex::new(self.x + dx, self.y + dy)
    }

    /// All six neighbors, in direction order
    pub fn neighbors(&self) -> [Hex; 6] {
        std::array::from_fn(|d| self.neighbor(d))
    }

    /// Direction index leading from `self` to an adjacent `other`
    pub fn direction_to(&self, other: Hex) -> Option<usize> {
        let delta = (other.x - self.x, other.y - self.y);
        DIRECTIONS.iter().position(|&d| d == delta)
    }

    pub fn is_adjacent(&self, other: Hex) -> bool {
        self.direction_to(other).is_some()
    }

    /// Hex distance (number of single steps)
    pub fn distance_to(&self, other: Hex) -> i16 {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        dy + (dx - dy).max(0) / 2
    }
}

/// A column plus a stack level (0 = ground)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub hex: Hex,
    pub z: u8,
}

impl Position {
    pub const fn new(hex: Hex, z: u8) -> Self {
        Self { hex, z }
    }

    pub const fn ground(hex: Hex) -> Self {
        Self { hex, z: 0 }
    }
}

// ============================================================================
// GATE RULE
// ============================================================================
//
// Heights are stack levels with -1 meaning "empty cell". A step from level
// `from_z` to level `to_z` squeezes between the two cells flanking the step
// direction, at levels `z1` and `z2`.

/// The step is not blocked by the two flanking stacks
pub fn gate_open(from_z: i8, to_z: i8, z1: i8, z2: i8) -> bool {
    (from_z - 1).max(to_z) >= z1.min(z2)
}

/// The piece keeps touching the hive while stepping
pub fn on_hive(from_z: i8, to_z: i8, z1: i8, z2: i8) -> bool {
    z1 >= 0 || z2 >= 0 || to_z >= 0 || from_z > 0
}

/// Single step legality: stays on the hive and passes the gate
pub fn can_slide(from_z: i8, to_z: i8, z1: i8, z2: i8) -> bool {
    on_hive(from_z, to_z, z1, z2) && gate_open(from_z, to_z, z1, z2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_are_adjacent() {
        let center = Hex::new(3, 1);
        for (d, n) in center.neighbors().iter().enumerate() {
            assert!(n.is_valid());
            assert_eq!(center.direction_to(*n), Some(d));
            assert_eq!(center.distance_to(*n), 1);
        }
        assert!(!center.is_adjacent(Hex::new(3, 3)));
        assert!(!center.is_adjacent(center));
    }

    #[test]
    fn test_distance() {
        assert_eq!(ORIGIN.distance_to(Hex::new(4, 0)), 2);
        assert_eq!(ORIGIN.distance_to(Hex::new(2, 2)), 2);
        assert_eq!(ORIGIN.distance_to(Hex::new(0, 2)), 2);
        assert_eq!(ORIGIN.distance_to(Hex::new(-3, 3)), 3);
    }

    #[test]
    fn test_opposite_directions() {
        for d in 0..6 {
            let there = ORIGIN.neighbor(d);
            assert_eq!(there.neighbor(d + 3), ORIGIN);
        }
    }

    #[test]
    fn test_gate_table() {
        // Blocked exactly when both flanks are strictly above max(from - 1, to)
        for from_z in -1i8..=3 {
            for to_z in -1i8..=3 {
                for z1 in -1i8..=3 {
                    for z2 in -1i8..=3 {
                        let clearance = (from_z - 1).max(to_z);
                        let blocked = z1 > clearance && z2 > clearance;
                        assert_eq!(
                            gate_open(from_z, to_z, z1, z2),
                            !blocked,
                            "from={} to={} z1={} z2={}",
                            from_z, to_z, z1, z2
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_ground_slide_needs_contact() {
        // Nothing around: leaving contact with the hive
        assert!(!can_slide(0, -1, -1, -1));
        // One flank occupied: regular crawl
        assert!(can_slide(0, -1, 0, -1));
        // Both flanks occupied: gate
        assert!(!can_slide(0, -1, 0, 0));
        // A beetle on top of the hive passes between ground pieces
        assert!(can_slide(1, 0, 0, 0));
        // ...but not between two stacks of two
        assert!(!can_slide(1, -1, 1, 1));
    }
}
