//! WebSocket protocol messages for Tessera.
//!
//! This is the codec boundary: core errors are turned into stable reason
//! codes here and nowhere else.

use serde::{Deserialize, Serialize};
use tessera_core::{
    Capability, EndReason, GameError, GameEvent, GameStatus, Player, PlacementError, PlayerColor,
    PlayerId, Position, Tile, TokenPlacement,
};
use uuid::Uuid;

/// Identifies one client connection
pub type ConnId = Uuid;

/// Identifies one hosted game
pub type GameId = Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Pick a nick for this connection
    Hello { nick: String },

    /// Create a new game and take the first seat
    CreateGame {
        name: String,
        #[serde(default)]
        capabilities: Vec<Capability>,
    },

    /// Take a seat in a game that has not started
    JoinGame { game_id: GameId },

    /// Watch a game without playing
    Spectate { game_id: GameId },

    /// Start the game (creator only)
    StartGame,

    /// Place the drawn tile
    PlaceTile {
        position: Position,
        rotation: u8,
        #[serde(default)]
        token: Option<TokenPlacement>,
    },

    /// Leave the current game
    LeaveGame,

    /// Request the game list
    ListGames,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with the assigned connection ID
    Welcome { conn_id: ConnId },

    /// Game created; the creator holds seat 0
    GameCreated { game: GameInfo },

    /// Joined a game, as a player or (with no seat) as a spectator
    Joined {
        game: GameInfo,
        player: Option<PlayerId>,
    },

    /// Left the current game
    Left,

    /// Seating changed (someone joined, left or disconnected)
    GameUpdated { game: GameInfo },

    /// Games that can be joined or watched
    GameList { games: Vec<GameInfo> },

    /// Starting tile laid at the origin
    GameStarted {
        game_id: GameId,
        tile: Tile,
        position: Position,
        players: Vec<PlayerInfo>,
    },

    /// A player has drawn a tile and must place it before the deadline
    TileDrawn {
        game_id: GameId,
        player: PlayerId,
        tile: Tile,
        remaining: usize,
        /// Seconds left to place the tile
        deadline_secs: u64,
        /// Every (position, rotation) where the tile fits
        placements: Vec<(Position, u8)>,
    },

    /// A move was applied
    MoveAccepted {
        game_id: GameId,
        player: PlayerId,
        events: Vec<GameEvent>,
    },

    /// A move was refused; the turn is still running
    MoveRejected {
        game_id: GameId,
        reason: RejectReason,
        message: String,
    },

    /// Game over, with the end-of-game scoring
    GameEnded {
        game_id: GameId,
        reason: EndReason,
        scores: Vec<(PlayerId, u32)>,
        events: Vec<GameEvent>,
    },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}

/// Why a move was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Occupied,
    NoNeighbor,
    EdgeMismatch,
    OutOfTurn,
    InvalidCapability,
    InvalidToken,
    RegionOccupied,
    NotPlaying,
    Internal,
}

impl RejectReason {
    pub fn code(self) -> &'static str {
        match self {
            RejectReason::Occupied => "occupied",
            RejectReason::NoNeighbor => "no_neighbor",
            RejectReason::EdgeMismatch => "edge_mismatch",
            RejectReason::OutOfTurn => "out_of_turn",
            RejectReason::InvalidCapability => "invalid_capability",
            RejectReason::InvalidToken => "invalid_token",
            RejectReason::RegionOccupied => "region_occupied",
            RejectReason::NotPlaying => "not_playing",
            RejectReason::Internal => "internal",
        }
    }
}

impl From<&GameError> for RejectReason {
    fn from(error: &GameError) -> Self {
        match error {
            GameError::IllegalPlacement(PlacementError::Occupied) => RejectReason::Occupied,
            GameError::IllegalPlacement(PlacementError::NoNeighbor) => RejectReason::NoNeighbor,
            GameError::IllegalPlacement(PlacementError::EdgeMismatch(_))
            | GameError::InvalidRotation => RejectReason::EdgeMismatch,
            GameError::OutOfTurn | GameError::NoTileDrawn => RejectReason::OutOfTurn,
            GameError::InvalidCapability => RejectReason::InvalidCapability,
            GameError::InvalidArea | GameError::NoTokensLeft | GameError::TokenInUse => {
                RejectReason::InvalidToken
            }
            GameError::RegionOccupied => RejectReason::RegionOccupied,
            GameError::GameNotStarted
            | GameError::GameAlreadyStarted
            | GameError::GameOver
            | GameError::GameFull
            | GameError::NickTaken
            | GameError::UnknownPlayer
            | GameError::NotEnoughPlayers => RejectReason::NotPlaying,
            GameError::DeckExhaustedDuringDraw | GameError::RegionInvariantViolation(_) => {
                RejectReason::Internal
            }
        }
    }
}

/// Game information for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub id: GameId,
    pub name: String,
    pub status: GameStatus,
    pub players: Vec<PlayerInfo>,
    pub spectators: usize,
    pub max_players: u8,
    pub capabilities: Vec<Capability>,
}

/// A seated player as clients see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub nick: String,
    pub color: PlayerColor,
    pub score: u32,
    pub tokens_remaining: u32,
    pub connected: bool,
}

impl From<&Player> for PlayerInfo {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            nick: player.nick.clone(),
            color: player.color,
            score: player.score,
            tokens_remaining: player.tokens_remaining,
            connected: player.connected,
        }
    }
}
