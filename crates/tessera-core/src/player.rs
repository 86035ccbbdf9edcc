//! Players and the tokens they place on the board.

use crate::position::Position;
use crate::tile::AreaIndex;
use serde::{Deserialize, Serialize};

/// Player identifier: index in the game's seating order
pub type PlayerId = u8;

/// Player color for UI rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerColor {
    Red,
    Blue,
    Green,
    Yellow,
    Black,
}

impl PlayerColor {
    /// Get color for a seat index
    pub fn for_player(id: PlayerId) -> Self {
        match id % 5 {
            0 => PlayerColor::Red,
            1 => PlayerColor::Blue,
            2 => PlayerColor::Green,
            3 => PlayerColor::Yellow,
            _ => PlayerColor::Black,
        }
    }
}

/// Kinds of scoring token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Ordinary token, counts once toward majority
    Normal,
    /// Big token, counts twice toward majority
    Double,
    /// Never counts toward majority; earns the cloister bonus of its town
    Bishop,
}

impl TokenKind {
    /// Weight of this token when working out who holds a region
    pub fn majority_weight(self) -> u32 {
        match self {
            TokenKind::Normal => 1,
            TokenKind::Double => 2,
            TokenKind::Bishop => 0,
        }
    }
}

/// A token standing on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub owner: PlayerId,
    pub kind: TokenKind,
    /// Tile the token stands on
    pub position: Position,
    /// Area of that tile the token was put on
    pub area: AreaIndex,
}

/// A seated player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub nick: String,
    pub color: PlayerColor,
    pub score: u32,
    /// Normal tokens still in the player's pool
    pub tokens_remaining: u32,
    pub double_in_use: bool,
    pub bishop_in_use: bool,
    /// Whether the player's connection is still alive
    pub connected: bool,
}

impl Player {
    /// Create a new player with a full token pool
    pub fn new(id: PlayerId, nick: String, tokens: u32) -> Self {
        Self {
            id,
            nick,
            color: PlayerColor::for_player(id),
            score: 0,
            tokens_remaining: tokens,
            double_in_use: false,
            bishop_in_use: false,
            connected: true,
        }
    }

    /// Whether the player still holds a token of this kind
    pub fn has_token(&self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::Normal => self.tokens_remaining > 0,
            TokenKind::Double => !self.double_in_use,
            TokenKind::Bishop => !self.bishop_in_use,
        }
    }

    /// Move a token from the pool to the board
    pub fn take_token(&mut self, kind: TokenKind) {
        match kind {
            TokenKind::Normal => self.tokens_remaining = self.tokens_remaining.saturating_sub(1),
            TokenKind::Double => self.double_in_use = true,
            TokenKind::Bishop => self.bishop_in_use = true,
        }
    }

    /// Put a token back into the pool
    pub fn return_token(&mut self, kind: TokenKind) {
        match kind {
            TokenKind::Normal => self.tokens_remaining += 1,
            TokenKind::Double => self.double_in_use = false,
            TokenKind::Bishop => self.bishop_in_use = false,
        }
    }
}
