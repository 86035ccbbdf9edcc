//! Core game state machine.
//!
//! This module contains the `GameState` struct: seating, the deck, the
//! board with its regions, and the turn bookkeeping. It applies moves but
//! does not keep time; the server's turn scheduler decides when a turn
//! starts and when it runs out.

use crate::actions::{EndReason, GameAction, GameEvent, TokenPlacement};
use crate::board::{Board, PlacementError};
use crate::deck::Deck;
use crate::placement;
use crate::player::{Player, PlayerId, Token, TokenKind};
use crate::position::Position;
use crate::region::RegionArena;
use crate::scoring;
use crate::tile::{AreaKind, Tile, TileKind};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Tokens each player starts with
pub const DEFAULT_TOKENS: u32 = 7;

/// Seats at one table
pub const MAX_PLAYERS: u8 = 5;

/// Players needed to start
pub const MIN_PLAYERS: usize = 2;

/// Lifecycle of a game. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GameStatus {
    NotStarted,
    Ongoing,
    Ended,
}

/// Optional rules a game can be created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// One double-weight token per player
    DoubleToken,
    /// One bishop per player, placed on towns
    Bishop,
    /// Adds the bonus town tiles to the deck
    Cathedral,
}

impl Capability {
    /// Capability needed to place a token kind, if any
    pub fn for_token(kind: TokenKind) -> Option<Capability> {
        match kind {
            TokenKind::Normal => None,
            TokenKind::Double => Some(Capability::DoubleToken),
            TokenKind::Bishop => Some(Capability::Bishop),
        }
    }
}

/// Table settings fixed when the game is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub tokens_per_player: u32,
    pub max_players: u8,
    pub capabilities: BTreeSet<Capability>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tokens_per_player: DEFAULT_TOKENS,
            max_players: MAX_PLAYERS,
            capabilities: BTreeSet::new(),
        }
    }
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Illegal placement: {0}")]
    IllegalPlacement(#[from] PlacementError),

    #[error("Not your turn")]
    OutOfTurn,

    #[error("Capability not enabled for this game")]
    InvalidCapability,

    #[error("No placeable tile left in the deck")]
    DeckExhaustedDuringDraw,

    #[error("Region invariant violated: {0}")]
    RegionInvariantViolation(String),

    #[error("Game has not started")]
    GameNotStarted,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Game is over")]
    GameOver,

    #[error("Game is full")]
    GameFull,

    #[error("Nick already taken in this game")]
    NickTaken,

    #[error("Unknown player")]
    UnknownPlayer,

    #[error("Not enough players")]
    NotEnoughPlayers,

    #[error("No tile has been drawn")]
    NoTileDrawn,

    #[error("Rotation must be between 0 and 3")]
    InvalidRotation,

    #[error("Token cannot go on that area")]
    InvalidArea,

    #[error("No tokens left")]
    NoTokensLeft,

    #[error("That token is already on the board")]
    TokenInUse,

    #[error("Region already has a token")]
    RegionOccupied,
}

impl GameError {
    /// Internal errors that end the game they happen in
    pub fn is_fatal(&self) -> bool {
        matches!(self, GameError::RegionInvariantViolation(_))
    }
}

/// The tile handed to a player at the start of their turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnStart {
    pub player: PlayerId,
    pub tile: Tile,
    pub remaining: usize,
}

/// The complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub name: String,
    pub status: GameStatus,
    /// Seated players, indexed by `PlayerId`
    pub players: Vec<Player>,
    pub spectators: BTreeSet<String>,
    pub config: GameConfig,
    pub deck: Deck,
    pub board: Board,
    pub regions: RegionArena,
    /// Whose turn it is, once the first tile has been drawn
    pub current_player: Option<PlayerId>,
    /// The tile the current player has to place
    pub current_tile: Option<Tile>,
    /// Turn number (starts at 1 with the first draw)
    pub turn_number: u32,
}

impl GameState {
    /// Create a game waiting for players
    pub fn new(name: String, config: GameConfig) -> Self {
        let deck = Deck::standard(&config.capabilities);
        Self {
            name,
            status: GameStatus::NotStarted,
            players: Vec::new(),
            spectators: BTreeSet::new(),
            config,
            deck,
            board: Board::new(),
            regions: RegionArena::new(),
            current_player: None,
            current_tile: None,
            turn_number: 0,
        }
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.config.capabilities.contains(&capability)
    }

    /// Get the number of players
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Get a player by ID
    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    pub fn player_by_nick(&self, nick: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.nick == nick)
    }

    /// Check if the game is finished
    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Ended
    }

    /// Final or running scores in seating order
    pub fn scores(&self) -> Vec<(PlayerId, u32)> {
        self.players.iter().map(|p| (p.id, p.score)).collect()
    }

    /// Move the status forward; never backward
    fn transition(&mut self, to: GameStatus) -> bool {
        if to > self.status {
            self.status = to;
            true
        } else {
            false
        }
    }

    // ==================== Seating ====================

    /// Seat a player before the game starts
    pub fn add_player(&mut self, nick: String) -> Result<PlayerId, GameError> {
        match self.status {
            GameStatus::NotStarted => {}
            GameStatus::Ongoing => return Err(GameError::GameAlreadyStarted),
            GameStatus::Ended => return Err(GameError::GameOver),
        }
        if self.players.len() >= self.config.max_players as usize {
            return Err(GameError::GameFull);
        }
        if self.player_by_nick(&nick).is_some() {
            return Err(GameError::NickTaken);
        }

        let id = self.players.len() as PlayerId;
        self.players
            .push(Player::new(id, nick, self.config.tokens_per_player));
        Ok(id)
    }

    /// Unseat a player. Only possible before the game starts; later the
    /// player stays seated and is marked disconnected instead.
    pub fn remove_player(&mut self, nick: &str) -> Result<(), GameError> {
        let index = self
            .players
            .iter()
            .position(|p| p.nick == nick)
            .ok_or(GameError::UnknownPlayer)?;

        if self.status != GameStatus::NotStarted {
            self.players[index].connected = false;
            return Ok(());
        }

        self.players.remove(index);
        for (i, player) in self.players.iter_mut().enumerate() {
            player.id = i as PlayerId;
        }
        Ok(())
    }

    /// Whether any seated player is still connected
    pub fn has_connected_players(&self) -> bool {
        self.players.iter().any(|p| p.connected)
    }

    pub fn add_spectator(&mut self, nick: String) {
        self.spectators.insert(nick);
    }

    pub fn remove_spectator(&mut self, nick: &str) -> bool {
        self.spectators.remove(nick)
    }

    // ==================== Lifecycle ====================

    /// Shuffle the deck and start the game
    pub fn start<R: Rng>(&mut self, rng: &mut R) -> Result<Vec<GameEvent>, GameError> {
        let mut deck = Deck::standard(&self.config.capabilities);
        deck.shuffle(rng);
        self.start_with_deck(deck)
    }

    /// Start with a prepared deck (last tile drawn first).
    ///
    /// One starting tile is taken out of the deck and laid at the origin;
    /// if the deck holds none, a fresh one is used.
    pub fn start_with_deck(&mut self, mut deck: Deck) -> Result<Vec<GameEvent>, GameError> {
        match self.status {
            GameStatus::NotStarted => {}
            GameStatus::Ongoing => return Err(GameError::GameAlreadyStarted),
            GameStatus::Ended => return Err(GameError::GameOver),
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }

        let tile = deck
            .take(TileKind::STARTING)
            .unwrap_or(Tile::new(TileKind::STARTING));
        placement::lay_tile(&mut self.board, &mut self.regions, Position::ORIGIN, tile)?;
        self.deck = deck;
        self.transition(GameStatus::Ongoing);

        Ok(vec![GameEvent::GameStarted {
            tile,
            position: Position::ORIGIN,
        }])
    }

    /// Hand the next player in seating order a tile that fits somewhere.
    ///
    /// `DeckExhaustedDuringDraw` means the game is over and the caller
    /// should run [`GameState::final_sweep`].
    pub fn next_turn<R: Rng>(&mut self, rng: &mut R) -> Result<TurnStart, GameError> {
        self.require_ongoing()?;
        let tile = self.deck.draw_placeable(&self.board, rng)?;

        let player = match self.current_player {
            Some(current) => (current + 1) % self.player_count() as PlayerId,
            None => 0,
        };
        self.current_player = Some(player);
        self.current_tile = Some(tile);
        self.turn_number += 1;

        Ok(TurnStart {
            player,
            tile,
            remaining: self.deck.remaining(),
        })
    }

    /// The current turn ran out: the drawn tile is discarded, not returned.
    pub fn on_timeout(&mut self) -> Option<GameEvent> {
        let player = self.current_player?;
        let tile = self.current_tile.take()?;
        Some(GameEvent::TurnForfeited { player, tile })
    }

    /// Score everything left on the board and end the game
    pub fn final_sweep(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.require_ongoing()?;
        let mut events = scoring::final_sweep(&self.board, &mut self.regions, &mut self.players)?;
        self.current_tile = None;
        self.transition(GameStatus::Ended);
        events.push(GameEvent::GameEnded {
            reason: EndReason::DeckExhausted,
            scores: self.scores(),
        });
        Ok(events)
    }

    /// End the game at once after an internal error
    pub fn force_end(&mut self) -> GameEvent {
        self.current_tile = None;
        self.transition(GameStatus::Ended);
        GameEvent::GameEnded {
            reason: EndReason::Aborted,
            scores: self.scores(),
        }
    }

    fn require_ongoing(&self) -> Result<(), GameError> {
        match self.status {
            GameStatus::NotStarted => Err(GameError::GameNotStarted),
            GameStatus::Ongoing => Ok(()),
            GameStatus::Ended => Err(GameError::GameOver),
        }
    }

    // ==================== Moves ====================

    /// Check whether the drawn tile fits at `pos` with `rotation`
    pub fn check_legal_placement(&self, pos: Position, rotation: u8) -> Result<(), GameError> {
        self.require_ongoing()?;
        if rotation > 3 {
            return Err(GameError::InvalidRotation);
        }
        let tile = self.current_tile.ok_or(GameError::NoTileDrawn)?;
        self.board.matching_edges(&tile.rotated(rotation), pos)?;
        Ok(())
    }

    /// Apply an action for a player
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::PlaceTile {
                position,
                rotation,
                token,
            } => self.place_tile(player, position, rotation, token),
        }
    }

    /// Place the current tile and score whatever it completes.
    ///
    /// Every check runs before the first mutation, so a rejected move
    /// leaves the game untouched.
    pub fn place_tile(
        &mut self,
        player: PlayerId,
        position: Position,
        rotation: u8,
        token: Option<TokenPlacement>,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.require_ongoing()?;
        if self.current_player != Some(player) {
            return Err(GameError::OutOfTurn);
        }
        self.check_legal_placement(position, rotation)?;
        let tile = self
            .current_tile
            .ok_or(GameError::NoTileDrawn)?
            .rotated(rotation);
        if let Some(placement) = token {
            self.validate_token(player, position, &tile, placement)?;
        }

        let touched = placement::place_tile(&mut self.board, &mut self.regions, position, tile)?;
        self.current_tile = None;
        let mut events = vec![GameEvent::TilePlaced {
            player,
            tile,
            position,
        }];

        if let Some(placement) = token {
            let region = self.regions.region_at(position, placement.area)?;
            let token = Token {
                owner: player,
                kind: placement.kind,
                position,
                area: placement.area,
            };
            self.regions.add_token(region, token);
            self.players[player as usize].take_token(placement.kind);
            events.push(GameEvent::TokenPlaced { token });
        }

        events.extend(scoring::check_completions(
            &self.board,
            &mut self.regions,
            &mut self.players,
            position,
            &touched,
        )?);
        Ok(events)
    }

    fn validate_token(
        &self,
        player: PlayerId,
        position: Position,
        tile: &Tile,
        placement: TokenPlacement,
    ) -> Result<(), GameError> {
        if let Some(capability) = Capability::for_token(placement.kind) {
            if !self.has_capability(capability) {
                return Err(GameError::InvalidCapability);
            }
        }

        let kind = tile
            .area_kind(placement.area)
            .ok_or(GameError::InvalidArea)?;
        if placement.kind == TokenKind::Bishop && kind != AreaKind::Town {
            return Err(GameError::InvalidArea);
        }

        let owner = self.get_player(player).ok_or(GameError::UnknownPlayer)?;
        if !owner.has_token(placement.kind) {
            return Err(match placement.kind {
                TokenKind::Normal => GameError::NoTokensLeft,
                TokenKind::Double | TokenKind::Bishop => GameError::TokenInUse,
            });
        }

        if !placement::area_is_unclaimed(&self.board, &self.regions, position, tile, placement.area)? {
            return Err(GameError::RegionOccupied);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_player_game(config: GameConfig) -> GameState {
        let mut game = GameState::new("test".to_string(), config);
        game.add_player("ana".to_string()).unwrap();
        game.add_player("ben".to_string()).unwrap();
        game
    }

    fn started(tiles: Vec<Tile>, config: GameConfig) -> GameState {
        let mut game = two_player_game(config);
        game.start_with_deck(Deck::from_tiles(tiles)).unwrap();
        game
    }

    #[test]
    fn test_new_game_is_not_started() {
        let game = GameState::new("g".to_string(), GameConfig::default());
        assert_eq!(game.status, GameStatus::NotStarted);
        assert_eq!(game.deck.remaining(), 72);
    }

    #[test]
    fn test_seating_rules() {
        let mut game = two_player_game(GameConfig {
            max_players: 2,
            ..GameConfig::default()
        });
        assert_eq!(game.add_player("cy".to_string()), Err(GameError::GameFull));
        game.remove_player("ana").unwrap();
        assert_eq!(game.get_player(0).unwrap().nick, "ben");
        assert_eq!(game.add_player("ben".to_string()), Err(GameError::NickTaken));
    }

    #[test]
    fn test_start_needs_two_players() {
        let mut game = GameState::new("g".to_string(), GameConfig::default());
        game.add_player("solo".to_string()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(game.start(&mut rng), Err(GameError::NotEnoughPlayers));
        assert_eq!(game.status, GameStatus::NotStarted);
    }

    #[test]
    fn test_start_lays_starting_tile_and_is_one_way() {
        let mut game = two_player_game(GameConfig::default());
        let mut rng = StdRng::seed_from_u64(42);
        game.start(&mut rng).unwrap();
        assert_eq!(game.status, GameStatus::Ongoing);
        assert_eq!(game.deck.remaining(), 71);
        assert!(game.board.is_occupied(Position::ORIGIN));
        assert_eq!(game.start(&mut rng), Err(GameError::GameAlreadyStarted));
        assert_eq!(game.add_player("late".to_string()), Err(GameError::GameAlreadyStarted));
    }

    #[test]
    fn test_turns_round_robin() {
        let mut game = started(vec![Tile::new(TileKind::B); 4], GameConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        let order: Vec<_> = (0..3)
            .map(|_| {
                let turn = game.next_turn(&mut rng).unwrap();
                game.on_timeout();
                turn.player
            })
            .collect();
        assert_eq!(order, vec![0, 1, 0]);
    }

    #[test]
    fn test_out_of_turn_is_rejected() {
        let mut game = started(vec![Tile::new(TileKind::B)], GameConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        game.next_turn(&mut rng).unwrap();
        let result = game.place_tile(1, Position::new(0, -1), 0, None);
        assert_eq!(result, Err(GameError::OutOfTurn));
    }

    #[test]
    fn test_rejected_move_keeps_the_tile() {
        let mut game = started(vec![Tile::new(TileKind::B)], GameConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        game.next_turn(&mut rng).unwrap();
        // Cloister tile is all meadow; the start tile shows town to the north
        let result = game.place_tile(0, Position::new(0, 1), 0, None);
        assert!(matches!(result, Err(GameError::IllegalPlacement(_))));
        assert!(game.current_tile.is_some());
        assert_eq!(game.board.len(), 1);
        assert!(game.place_tile(0, Position::new(0, -1), 0, None).is_ok());
    }

    #[test]
    fn test_edge_of_grid_is_rejected() {
        let mut game = started(vec![Tile::new(TileKind::B)], GameConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        game.next_turn(&mut rng).unwrap();
        for pos in [Position::new(i32::MAX, 0), Position::new(0, i32::MIN)] {
            assert_eq!(
                game.place_tile(0, pos, 0, None),
                Err(GameError::IllegalPlacement(PlacementError::NoNeighbor))
            );
        }
        assert!(game.current_tile.is_some());
        assert_eq!(game.board.len(), 1);
        assert_eq!(game.current_player, Some(0));
    }

    #[test]
    fn test_apply_action_places_the_drawn_tile() {
        let mut game = started(vec![Tile::new(TileKind::B)], GameConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        game.next_turn(&mut rng).unwrap();
        let action = GameAction::PlaceTile {
            position: Position::new(0, -1),
            rotation: 0,
            token: None,
        };
        assert_eq!(game.apply_action(1, action.clone()), Err(GameError::OutOfTurn));
        let events = game.apply_action(0, action).unwrap();
        assert!(matches!(
            events[0],
            GameEvent::TilePlaced { player: 0, position, .. } if position == Position::new(0, -1)
        ));
        assert!(game.current_tile.is_none());
        assert_eq!(game.board.len(), 2);
    }

    #[test]
    fn test_timeout_discards_tile() {
        let mut game = started(
            vec![Tile::new(TileKind::B), Tile::new(TileKind::B)],
            GameConfig::default(),
        );
        let mut rng = StdRng::seed_from_u64(0);
        let first = game.next_turn(&mut rng).unwrap();
        assert_eq!(first.remaining, 1);
        let event = game.on_timeout().unwrap();
        assert!(matches!(event, GameEvent::TurnForfeited { player: 0, .. }));
        assert_eq!(game.deck.remaining(), 1);
        let second = game.next_turn(&mut rng).unwrap();
        assert_eq!(second.remaining, 0);
        assert_eq!(game.next_turn(&mut rng), Err(GameError::DeckExhaustedDuringDraw));
    }

    #[test]
    fn test_token_capabilities() {
        let mut game = started(vec![Tile::new(TileKind::B)], GameConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        game.next_turn(&mut rng).unwrap();
        let double = Some(TokenPlacement {
            area: 1,
            kind: TokenKind::Double,
        });
        assert_eq!(
            game.place_tile(0, Position::new(0, -1), 0, double),
            Err(GameError::InvalidCapability)
        );
    }

    #[test]
    fn test_bishop_only_on_towns() {
        let config = GameConfig {
            capabilities: BTreeSet::from([Capability::Bishop]),
            ..GameConfig::default()
        };
        let mut game = started(vec![Tile::new(TileKind::B)], config);
        let mut rng = StdRng::seed_from_u64(0);
        game.next_turn(&mut rng).unwrap();
        let bishop = Some(TokenPlacement {
            area: 1,
            kind: TokenKind::Bishop,
        });
        assert_eq!(
            game.place_tile(0, Position::new(0, -1), 0, bishop),
            Err(GameError::InvalidArea)
        );
    }

    #[test]
    fn test_claimed_region_rejects_second_token() {
        let mut game = started(
            vec![Tile::new(TileKind::U), Tile::new(TileKind::U)],
            GameConfig::default(),
        );
        let mut rng = StdRng::seed_from_u64(0);
        game.next_turn(&mut rng).unwrap();
        let on_road = Some(TokenPlacement {
            area: 1,
            kind: TokenKind::Normal,
        });
        game.place_tile(0, Position::new(1, 0), 1, on_road).unwrap();
        assert_eq!(game.players[0].tokens_remaining, DEFAULT_TOKENS - 1);

        game.next_turn(&mut rng).unwrap();
        assert_eq!(
            game.place_tile(1, Position::new(-1, 0), 1, on_road),
            Err(GameError::RegionOccupied)
        );
        // The same tile without a token is fine
        assert!(game.place_tile(1, Position::new(-1, 0), 1, None).is_ok());
    }

    #[test]
    fn test_force_end_is_final() {
        let mut game = started(vec![Tile::new(TileKind::B)], GameConfig::default());
        let event = game.force_end();
        assert!(matches!(
            event,
            GameEvent::GameEnded {
                reason: EndReason::Aborted,
                ..
            }
        ));
        assert!(game.is_finished());
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(game.next_turn(&mut rng), Err(GameError::GameOver));
        assert_eq!(game.final_sweep(), Err(GameError::GameOver));
    }
}
