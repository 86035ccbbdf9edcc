//! The positional grid of placed tiles.
//!
//! The board only knows where tiles are and whether their edges line up.
//! Regions and scoring live in [`crate::region`] and [`crate::scoring`].

use crate::position::{Direction, Position};
use crate::tile::Tile;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Why a tile cannot go where a player wants it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PlacementError {
    #[error("Position is already occupied")]
    Occupied,

    #[error("Position does not touch any placed tile")]
    NoNeighbor,

    #[error("Edge does not match the neighbouring tile to the {0:?}")]
    EdgeMismatch(Direction),
}

/// The game board: every placed tile keyed by its cell
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    #[serde(with = "crate::position::cell_map")]
    tiles: HashMap<Position, Tile>,
}

impl Board {
    /// Create an empty board
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of placed tiles
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.tiles.contains_key(&pos)
    }

    pub fn get(&self, pos: Position) -> Option<&Tile> {
        self.tiles.get(&pos)
    }

    /// Iterate over all placed tiles
    pub fn tiles(&self) -> impl Iterator<Item = (&Position, &Tile)> {
        self.tiles.iter()
    }

    /// The four neighbouring cells in N, W, S, E order
    pub fn neighbors(&self, pos: Position) -> [Position; 4] {
        pos.neighbors()
    }

    /// Put a tile on the board without checking its edges.
    ///
    /// Fails if the cell is taken or lies on the edge of the coordinate range.
    pub fn place(&mut self, pos: Position, tile: Tile) -> Result<(), PlacementError> {
        if self.is_occupied(pos) {
            return Err(PlacementError::Occupied);
        }
        if !pos.is_interior() {
            return Err(PlacementError::NoNeighbor);
        }
        self.tiles.insert(pos, tile);
        Ok(())
    }

    /// Check that an oriented tile fits at `pos`.
    ///
    /// The cell must be free, touch at least one placed tile, and every
    /// facing edge must show the same kinds in reversed slot order.
    pub fn matching_edges(&self, tile: &Tile, pos: Position) -> Result<(), PlacementError> {
        if self.is_occupied(pos) {
            return Err(PlacementError::Occupied);
        }
        // Placed tiles are all interior, so an edge cell touches none
        if !pos.is_interior() {
            return Err(PlacementError::NoNeighbor);
        }

        let mut has_neighbor = false;
        for side in Direction::ALL {
            let Some(neighbor) = self.get(pos.neighbor(side)) else {
                continue;
            };
            has_neighbor = true;

            let ours = tile.edge_kinds(side);
            let mut theirs = neighbor.edge_kinds(side.opposite());
            theirs.reverse();
            if ours != theirs {
                return Err(PlacementError::EdgeMismatch(side));
            }
        }

        if has_neighbor {
            Ok(())
        } else {
            Err(PlacementError::NoNeighbor)
        }
    }

    /// Number of occupied cells among the eight around `pos`
    pub fn count_surrounding(&self, pos: Position) -> u32 {
        pos.surrounding()
            .iter()
            .filter(|p| self.is_occupied(**p))
            .count() as u32
    }

    /// Empty cells adjacent to at least one placed tile
    pub fn open_positions(&self) -> BTreeSet<Position> {
        self.tiles
            .keys()
            .flat_map(|p| p.neighbors())
            .filter(|p| !self.is_occupied(*p))
            .collect()
    }

    /// Every (position, rotation) where the tile could legally go
    pub fn legal_placements(&self, tile: &Tile) -> Vec<(Position, u8)> {
        let mut placements = Vec::new();
        for pos in self.open_positions() {
            for rotation in 0..4 {
                if self.matching_edges(&tile.rotated(rotation), pos).is_ok() {
                    placements.push((pos, rotation));
                }
            }
        }
        placements
    }

    /// Whether the tile fits anywhere in any rotation
    pub fn has_legal_placement(&self, tile: &Tile) -> bool {
        self.open_positions().into_iter().any(|pos| {
            (0..4).any(|rotation| self.matching_edges(&tile.rotated(rotation), pos).is_ok())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileKind;

    fn board_with_start() -> Board {
        let mut board = Board::new();
        board
            .place(Position::ORIGIN, Tile::new(TileKind::STARTING))
            .unwrap();
        board
    }

    #[test]
    fn test_place_rejects_occupied() {
        let mut board = board_with_start();
        assert_eq!(
            board.place(Position::ORIGIN, Tile::new(TileKind::B)),
            Err(PlacementError::Occupied)
        );
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_isolated_position_is_illegal() {
        let board = board_with_start();
        assert_eq!(
            board.matching_edges(&Tile::new(TileKind::B), Position::new(5, 5)),
            Err(PlacementError::NoNeighbor)
        );
    }

    #[test]
    fn test_edge_of_coordinate_range_is_illegal() {
        let board = board_with_start();
        let tile = Tile::new(TileKind::B);
        for pos in [
            Position::new(i32::MAX, 0),
            Position::new(i32::MIN, 0),
            Position::new(0, i32::MAX),
            Position::new(0, i32::MIN),
        ] {
            assert_eq!(board.matching_edges(&tile, pos), Err(PlacementError::NoNeighbor));
        }
        let mut board = board;
        assert_eq!(
            board.place(Position::new(i32::MAX, 0), tile),
            Err(PlacementError::NoNeighbor)
        );
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_town_must_face_town() {
        let board = board_with_start();
        // Start tile shows town on its north side. E rotated twice has town south.
        let north = Position::new(0, 1);
        assert!(board
            .matching_edges(&Tile::new(TileKind::E).rotated(2), north)
            .is_ok());
        assert_eq!(
            board.matching_edges(&Tile::new(TileKind::E), north),
            Err(PlacementError::EdgeMismatch(Direction::South))
        );
    }

    #[test]
    fn test_road_must_face_road() {
        let board = board_with_start();
        // Start tile road leaves east; a straight road turned a quarter runs west-east.
        let east = Position::new(1, 0);
        assert!(board
            .matching_edges(&Tile::new(TileKind::U).rotated(1), east)
            .is_ok());
        assert!(board
            .matching_edges(&Tile::new(TileKind::U), east)
            .is_err());
    }

    #[test]
    fn test_count_surrounding() {
        let mut board = Board::new();
        assert_eq!(board.count_surrounding(Position::ORIGIN), 0);
        for p in Position::ORIGIN.surrounding() {
            board.place(p, Tile::new(TileKind::B)).unwrap();
        }
        assert_eq!(board.count_surrounding(Position::ORIGIN), 8);
        assert_eq!(board.count_surrounding(Position::new(1, 1)), 3);
    }

    #[test]
    fn test_open_positions_around_start() {
        let board = board_with_start();
        let open = board.open_positions();
        assert_eq!(open.len(), 4);
        for n in Position::ORIGIN.neighbors() {
            assert!(open.contains(&n));
        }
    }

    #[test]
    fn test_legal_placements_for_all_town_tile() {
        let board = board_with_start();
        // A tile that is town on all four sides only fits north of the start
        let placements = board.legal_placements(&Tile::new(TileKind::C));
        assert!(!placements.is_empty());
        assert!(placements.iter().all(|(p, _)| *p == Position::new(0, 1)));
        assert!(board.has_legal_placement(&Tile::new(TileKind::C)));
    }
}
