//! Tessera - a tile-placement board game engine
//!
//! This crate provides the rules of the game, independent of any transport:
//! - Grid positions and directions
//! - The tile catalog with oriented edges
//! - The board and its edge-matching rules
//! - Regions (roads, towns, meadows, cloisters) kept in a union-find arena
//! - Placement and scoring engines
//! - The game state machine that ties them together
//!
//! # Modules
//!
//! - [`position`]: Grid coordinates
//! - [`tile`]: Tile areas, edges and the catalog
//! - [`board`]: Placed tiles and edge matching
//! - [`region`]: Region arena
//! - [`placement`]: Tile placement and region merging
//! - [`scoring`]: Completion, majority and end-of-game scoring
//! - [`game`]: Game state machine

pub mod actions;
pub mod board;
pub mod deck;
pub mod game;
pub mod placement;
pub mod player;
pub mod position;
pub mod region;
pub mod scoring;
pub mod tile;

// Re-export commonly used types
pub use actions::{EndReason, GameAction, GameEvent, TokenPlacement};
pub use board::{Board, PlacementError};
pub use deck::Deck;
pub use game::{
    Capability, GameConfig, GameError, GameState, GameStatus, TurnStart, DEFAULT_TOKENS,
    MAX_PLAYERS, MIN_PLAYERS,
};
pub use player::{Player, PlayerColor, PlayerId, Token, TokenKind};
pub use position::{Direction, Position};
pub use region::{Region, RegionArena, RegionId};
pub use tile::{Area, AreaIndex, AreaKind, Tile, TileKind};
