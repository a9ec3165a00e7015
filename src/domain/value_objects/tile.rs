//! Board geometry value objects: tiles and the edges between them

use serde::{Deserialize, Serialize};

/// A square on the board grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(self, other: Tile) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// True for the four orthogonal neighbours only
    pub fn is_adjacent(self, other: Tile) -> bool {
        self.manhattan(other) == 1
    }

    pub fn neighbours(self) -> [Tile; 4] {
        [
            self.offset(1, 0),
            self.offset(-1, 0),
            self.offset(0, 1),
            self.offset(0, -1),
        ]
    }
}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// The shared side of two orthogonally adjacent tiles
///
/// Always stored with the smaller tile first so `Edge::between(a, b)` and
/// `Edge::between(b, a)` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    a: Tile,
    b: Tile,
}

impl Edge {
    /// Returns `None` unless the tiles are orthogonal neighbours
    pub fn between(a: Tile, b: Tile) -> Option<Self> {
        if !a.is_adjacent(b) {
            return None;
        }
        Some(if a <= b { Self { a, b } } else { Self { a: b, b: a } })
    }

    pub fn tiles(&self) -> (Tile, Tile) {
        (self.a, self.b)
    }

    pub fn touches(&self, tile: Tile) -> bool {
        self.a == tile || self.b == tile
    }
}

/// A single movement request expressed as a signed offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub dx: i32,
    pub dy: i32,
}

impl Step {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// At most one square along each axis, and not a no-op
    pub fn is_unit(&self) -> bool {
        self.dx.unsigned_abs() <= 1 && self.dy.unsigned_abs() <= 1 && (self.dx != 0 || self.dy != 0)
    }

    pub fn is_diagonal(&self) -> bool {
        self.dx != 0 && self.dy != 0
    }

    pub fn cost(&self) -> u32 {
        self.dx.unsigned_abs().saturating_add(self.dy.unsigned_abs())
    }
}
