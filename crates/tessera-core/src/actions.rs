//! Game actions that players can take.
//!
//! This module defines what a player may ask for and the events that
//! result from applying it.

use crate::player::{PlayerId, Token, TokenKind};
use crate::position::Position;
use crate::tile::{AreaIndex, AreaKind, Tile};
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    /// Place the drawn tile, optionally dropping a token on one of its areas
    PlaceTile {
        position: Position,
        rotation: u8,
        token: Option<TokenPlacement>,
    },
}

/// Where a token goes on the tile being placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPlacement {
    pub area: AreaIndex,
    pub kind: TokenKind,
}

/// Why a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// No tile left that can be placed
    DeckExhausted,
    /// Stopped after an internal error
    Aborted,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// The starting tile was put down
    GameStarted { tile: Tile, position: Position },

    /// A player drew a tile for their turn
    TileDrawn {
        player: PlayerId,
        tile: Tile,
        remaining: usize,
    },

    /// A tile was placed
    TilePlaced {
        player: PlayerId,
        tile: Tile,
        position: Position,
    },

    /// A token was put on the tile just placed
    TokenPlaced { token: Token },

    /// A region was scored (on completion or in the final sweep)
    RegionScored {
        kind: AreaKind,
        positions: Vec<Position>,
        finished: bool,
        points: u32,
        winners: Vec<PlayerId>,
    },

    /// Bishop holders were paid for cloisters around their town
    BishopBonus {
        players: Vec<PlayerId>,
        cloisters: usize,
        points: u32,
    },

    /// Tokens went back to their owners' pools
    TokensReturned { tokens: Vec<Token> },

    /// The turn ran out; the drawn tile is discarded
    TurnForfeited { player: PlayerId, tile: Tile },

    /// The game is over
    GameEnded {
        reason: EndReason,
        scores: Vec<(PlayerId, u32)>,
    },
}
