//! The stack of tiles still to be drawn.

use crate::board::Board;
use crate::game::{Capability, GameError};
use crate::tile::{Tile, TileKind};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Draw stack; the top of the stack is the end of the vector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    tiles: Vec<Tile>,
}

impl Deck {
    /// Deck in the given order, last tile drawn first
    pub fn from_tiles(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }

    /// Full tile set for the enabled capabilities, unshuffled
    pub fn standard(capabilities: &BTreeSet<Capability>) -> Self {
        let mut tiles = Vec::with_capacity(80);
        for (kind, count) in TileKind::BASE_SET {
            tiles.extend(std::iter::repeat(Tile::new(kind)).take(count));
        }
        if capabilities.contains(&Capability::Cathedral) {
            tiles.extend(
                std::iter::repeat(Tile::new(TileKind::Cathedral)).take(TileKind::CATHEDRAL_COUNT),
            );
        }
        Self { tiles }
    }

    pub fn remaining(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.tiles.shuffle(rng);
    }

    /// Pull one tile of a kind out of the deck
    pub fn take(&mut self, kind: TileKind) -> Option<Tile> {
        let index = self.tiles.iter().position(|t| t.kind == kind)?;
        Some(self.tiles.remove(index))
    }

    /// Draw the next tile that has at least one legal placement.
    ///
    /// When the top tile does not fit anywhere the remaining stack is
    /// reshuffled and the first tile that fits is taken. If none of the
    /// remaining tiles fit, the deck counts as exhausted.
    pub fn draw_placeable<R: Rng>(
        &mut self,
        board: &Board,
        rng: &mut R,
    ) -> Result<Tile, GameError> {
        let top = self.tiles.last().ok_or(GameError::DeckExhaustedDuringDraw)?;
        if board.has_legal_placement(top) {
            return self.tiles.pop().ok_or(GameError::DeckExhaustedDuringDraw);
        }

        self.tiles.shuffle(rng);
        let index = self
            .tiles
            .iter()
            .rposition(|t| board.has_legal_placement(t))
            .ok_or(GameError::DeckExhaustedDuringDraw)?;
        Ok(self.tiles.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_standard_deck_sizes() {
        assert_eq!(Deck::standard(&BTreeSet::new()).remaining(), 72);
        let with_cathedral = BTreeSet::from([Capability::Cathedral]);
        assert_eq!(Deck::standard(&with_cathedral).remaining(), 74);
    }

    #[test]
    fn test_draw_takes_top_when_it_fits() {
        let mut board = Board::new();
        board
            .place(Position::ORIGIN, Tile::new(TileKind::STARTING))
            .unwrap();
        let mut deck = Deck::from_tiles(vec![Tile::new(TileKind::U), Tile::new(TileKind::V)]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(deck.draw_placeable(&board, &mut rng).unwrap().kind, TileKind::V);
        assert_eq!(deck.remaining(), 1);
    }

    #[test]
    fn test_draw_skips_unplaceable_tiles() {
        let mut board = Board::new();
        // A lone road tile: nothing all-town can ever touch it
        board.place(Position::ORIGIN, Tile::new(TileKind::U)).unwrap();
        let mut deck = Deck::from_tiles(vec![Tile::new(TileKind::B), Tile::new(TileKind::C)]);
        let mut rng = StdRng::seed_from_u64(7);
        let drawn = deck.draw_placeable(&board, &mut rng).unwrap();
        assert_eq!(drawn.kind, TileKind::B);
        assert_eq!(deck.remaining(), 1);
    }

    #[test]
    fn test_draw_from_hopeless_deck_is_exhausted() {
        let mut board = Board::new();
        board.place(Position::ORIGIN, Tile::new(TileKind::B)).unwrap();
        let mut deck = Deck::from_tiles(vec![Tile::new(TileKind::C)]);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            deck.draw_placeable(&board, &mut rng),
            Err(GameError::DeckExhaustedDuringDraw)
        );
        let mut empty = Deck::default();
        assert_eq!(
            empty.draw_placeable(&board, &mut rng),
            Err(GameError::DeckExhaustedDuringDraw)
        );
    }
}
