//! Grid primitives: directions, positions, agent ids.

use serde::{Deserialize, Serialize};

pub type AgentId = u32;

/// Pacman always occupies index 0; ghosts are 1..=num_ghosts.
pub const PACMAN_ID: AgentId = 0;

/// Primitive actions. `Stop` is the designated no-op.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Stop,
}

pub const GHOST_DIRECTIONS: [Direction; 4] = [
    Direction::North,
    Direction::South,
    Direction::East,
    Direction::West,
];

pub const PACMAN_DIRECTIONS: [Direction; 5] = [
    Direction::North,
    Direction::South,
    Direction::East,
    Direction::West,
    Direction::Stop,
];

impl Direction {
    /// The cell reached by taking this action from `from`. Rows grow
    /// northward, columns grow eastward.
    pub fn step(self, from: Pos) -> Pos {
        match self {
            Direction::North => Pos::new(from.row + 1, from.col),
            Direction::South => Pos::new(from.row - 1, from.col),
            Direction::East => Pos::new(from.row, from.col + 1),
            Direction::West => Pos::new(from.row, from.col - 1),
            Direction::Stop => from,
        }
    }
}

/// A cell in protocol coordinates: (row, col).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Pos {
    pub row: i32,
    pub col: i32,
}

impl Pos {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Normalizes a host-native `(x, y)` coordinate into the protocol's
    /// `(row, col)` convention. The axis swap is part of the wire contract.
    pub fn from_xy(x: i32, y: i32) -> Self {
        Self { row: y, col: x }
    }

    pub fn manhattan_distance(self, other: Pos) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_xy_swaps_axes() {
        let pos = Pos::from_xy(2, 1);
        assert_eq!(pos, Pos::new(1, 2));
    }

    #[test]
    fn step_moves_one_cell() {
        let origin = Pos::new(3, 3);
        assert_eq!(Direction::North.step(origin), Pos::new(4, 3));
        assert_eq!(Direction::South.step(origin), Pos::new(2, 3));
        assert_eq!(Direction::East.step(origin), Pos::new(3, 4));
        assert_eq!(Direction::West.step(origin), Pos::new(3, 2));
        assert_eq!(Direction::Stop.step(origin), origin);
    }

    #[test]
    fn ghost_action_set_excludes_stop() {
        assert!(!GHOST_DIRECTIONS.contains(&Direction::Stop));
        assert_eq!(PACMAN_DIRECTIONS.len(), GHOST_DIRECTIONS.len() + 1);
        assert!(PACMAN_DIRECTIONS.contains(&Direction::Stop));
    }

    #[test]
    fn manhattan_distance_is_symmetric() {
        let a = Pos::new(0, 0);
        let b = Pos::new(3, -2);
        assert_eq!(a.manhattan_distance(b), 5);
        assert_eq!(b.manhattan_distance(a), 5);
    }
}
