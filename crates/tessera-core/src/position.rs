//! Square grid coordinates for the unbounded board.
//!
//! Tiles sit on integer cells. `y` grows to the north, `x` grows to the east,
//! and the starting tile always occupies the origin.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four sides of a tile.
///
/// The variant order (N, W, S, E) is counter-clockwise and is the order in
/// which a tile stores its edges, so rotating a tile is a shift of this index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    North,
    West,
    South,
    East,
}

impl Direction {
    /// All directions in edge-storage order
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::West,
        Direction::South,
        Direction::East,
    ];

    /// Index of this side in a tile's edge array
    pub const fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::West => 1,
            Direction::South => 2,
            Direction::East => 3,
        }
    }

    /// Direction for an edge-array index (taken modulo 4)
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// The side facing this one across a shared boundary
    pub const fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::West => Direction::East,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
        }
    }

    /// Unit offset `(dx, dy)` of the neighbouring cell
    const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::West => (-1, 0),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
        }
    }
}

/// A cell on the board.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// The cell every game starts from
    pub const ORIGIN: Position = Position::new(0, 0);

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Whether all eight surrounding cells exist on the grid.
    ///
    /// Only such cells may hold a tile; the outermost row and column of
    /// the coordinate range never do.
    pub const fn is_interior(self) -> bool {
        self.x > i32::MIN && self.x < i32::MAX && self.y > i32::MIN && self.y < i32::MAX
    }

    /// The neighbouring cell in a direction (`self` must be interior)
    pub const fn neighbor(self, direction: Direction) -> Position {
        let (dx, dy) = direction.offset();
        Position::new(self.x + dx, self.y + dy)
    }

    /// The four edge-sharing neighbours in N, W, S, E order
    pub fn neighbors(self) -> [Position; 4] {
        Direction::ALL.map(|d| self.neighbor(d))
    }

    /// The eight cells around this one (edge and corner neighbours)
    pub fn surrounding(self) -> [Position; 8] {
        [
            Position::new(self.x - 1, self.y + 1),
            Position::new(self.x, self.y + 1),
            Position::new(self.x + 1, self.y + 1),
            Position::new(self.x - 1, self.y),
            Position::new(self.x + 1, self.y),
            Position::new(self.x - 1, self.y - 1),
            Position::new(self.x, self.y - 1),
            Position::new(self.x + 1, self.y - 1),
        ]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Serde adapter for maps keyed by [`Position`]: written as a list of
/// `(position, value)` pairs, as JSON object keys must be strings.
pub(crate) mod cell_map {
    use super::Position;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    pub fn serialize<S, T>(map: &HashMap<Position, T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<HashMap<Position, T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let pairs = Vec::<(Position, T)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_neighbor_order_is_nwse() {
        let p = Position::new(2, -1);
        assert_eq!(
            p.neighbors(),
            [
                Position::new(2, 0),
                Position::new(1, -1),
                Position::new(2, -2),
                Position::new(3, -1),
            ]
        );
    }

    #[test]
    fn test_opposite_round_trip() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            let p = Position::ORIGIN;
            assert_eq!(p.neighbor(d).neighbor(d.opposite()), p);
        }
    }

    #[test]
    fn test_index_matches_all() {
        for (i, d) in Direction::ALL.iter().enumerate() {
            assert_eq!(d.index(), i);
            assert_eq!(Direction::from_index(i + 4), *d);
        }
    }

    #[test]
    fn test_edge_of_coordinate_range_is_not_interior() {
        assert!(Position::ORIGIN.is_interior());
        assert!(Position::new(i32::MAX - 1, i32::MIN + 1).is_interior());
        assert!(!Position::new(i32::MAX, 0).is_interior());
        assert!(!Position::new(0, i32::MIN).is_interior());
    }

    #[test]
    fn test_surrounding_has_eight_distinct_cells() {
        let p = Position::new(5, 5);
        let cells: HashSet<_> = p.surrounding().into_iter().collect();
        assert_eq!(cells.len(), 8);
        assert!(!cells.contains(&p));
        for n in p.neighbors() {
            assert!(cells.contains(&n));
        }
    }
}
