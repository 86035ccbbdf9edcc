//! Move dispatcher.
//!
//! Every input for every game (client messages, disconnects and turn
//! expiries) is queued on one FIFO. A single [`Engine`] drains it and is the
//! only code that mutates sessions, boards, regions or scores, so none of
//! that state needs a lock. Results leave through the output dispatcher.

use crate::config::ServerConfig;
use crate::output::OutputSender;
use crate::protocol::{ClientMessage, ConnId, GameId, PlayerInfo, RejectReason, ServerMessage};
use crate::scheduler::{TurnPhase, TurnScheduler};
use crate::session::GameSession;
use rand::rngs::StdRng;
use std::collections::HashMap;
use tessera_core::{Capability, EndReason, GameAction, GameError, GameEvent, GameStatus};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Everything the engine reacts to, in arrival order
#[derive(Debug)]
pub enum Input {
    Connected { conn: ConnId },
    Client { conn: ConnId, msg: ClientMessage },
    /// Queued like any other input so it lands after the client's last move
    Disconnected { conn: ConnId },
    /// Sent by a game's timer once the deadline of `turn` has passed
    TurnExpired { game: GameId, turn: u64 },
}

pub type InputSender = mpsc::UnboundedSender<Input>;

#[derive(Debug, Default)]
struct Connection {
    nick: Option<String>,
    game: Option<GameId>,
}

/// The rule-engine worker.
pub struct Engine {
    config: ServerConfig,
    /// Handed to turn timers
    inputs: InputSender,
    output: OutputSender,
    rng: StdRng,
    sessions: HashMap<GameId, GameSession>,
    connections: HashMap<ConnId, Connection>,
}

impl Engine {
    pub fn new(config: ServerConfig, inputs: InputSender, output: OutputSender, rng: StdRng) -> Self {
        Self {
            config,
            inputs,
            output,
            rng,
            sessions: HashMap::new(),
            connections: HashMap::new(),
        }
    }

    /// Drain the input FIFO.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Input>) {
        info!("Move dispatcher running");
        while let Some(input) = rx.recv().await {
            self.handle(input);
        }
        info!("Move dispatcher stopped");
    }

    pub fn handle(&mut self, input: Input) {
        match input {
            Input::Connected { conn } => {
                self.connections.insert(conn, Connection::default());
                self.output.send(conn, ServerMessage::Welcome { conn_id: conn });
            }
            Input::Client { conn, msg } => self.handle_message(conn, msg),
            Input::Disconnected { conn } => self.handle_disconnect(conn),
            Input::TurnExpired { game, turn } => self.handle_expiry(game, turn),
        }
    }

    fn handle_message(&mut self, conn: ConnId, msg: ClientMessage) {
        if !self.connections.contains_key(&conn) {
            warn!("Message from unknown connection {}", conn);
            return;
        }

        match msg {
            ClientMessage::Hello { nick } => self.hello(conn, nick),
            ClientMessage::CreateGame { name, capabilities } => {
                self.create_game(conn, name, capabilities)
            }
            ClientMessage::JoinGame { game_id } => self.join_game(conn, game_id, false),
            ClientMessage::Spectate { game_id } => self.join_game(conn, game_id, true),
            ClientMessage::StartGame => self.start_game(conn),
            ClientMessage::PlaceTile {
                position,
                rotation,
                token,
            } => self.play(
                conn,
                GameAction::PlaceTile {
                    position,
                    rotation,
                    token,
                },
            ),
            ClientMessage::LeaveGame => {
                if self.leave_game(conn) {
                    self.output.send(conn, ServerMessage::Left);
                } else {
                    self.error(conn, "Not in a game");
                }
            }
            ClientMessage::ListGames => {
                let games = self.game_list();
                self.output.send(conn, ServerMessage::GameList { games });
            }
            ClientMessage::Ping => self.output.send(conn, ServerMessage::Pong),
        }
    }

    // ==================== Lobby ====================

    fn hello(&mut self, conn: ConnId, nick: String) {
        let nick = nick.trim().to_string();
        if nick.is_empty() {
            return self.error(conn, "Nick must not be empty");
        }
        let Some(connection) = self.connections.get_mut(&conn) else {
            return;
        };
        if connection.game.is_some() {
            return self.error(conn, "Cannot change nick while in a game");
        }
        connection.nick = Some(nick);

        let games = self.game_list();
        self.output.send(conn, ServerMessage::GameList { games });
    }

    fn create_game(&mut self, conn: ConnId, name: String, capabilities: Vec<Capability>) {
        let nick = match self.lobby_nick(conn) {
            Ok(nick) => nick,
            Err(message) => return self.error(conn, message),
        };

        let id = Uuid::new_v4();
        let config = self.config.game_config(capabilities);
        match GameSession::new(id, conn, nick, name, config) {
            Ok(session) => {
                info!(game = %id, "Game {:?} created", session.state.name);
                let game = session.to_info();
                self.sessions.insert(id, session);
                self.set_game(conn, Some(id));
                self.output.send(conn, ServerMessage::GameCreated { game });
            }
            Err(e) => self.error(conn, e.to_string()),
        }
    }

    fn join_game(&mut self, conn: ConnId, game_id: GameId, spectate: bool) {
        let nick = match self.lobby_nick(conn) {
            Ok(nick) => nick,
            Err(message) => return self.error(conn, message),
        };
        let Some(session) = self.sessions.get_mut(&game_id) else {
            return self.error(conn, "Game not found");
        };

        let joined = if spectate {
            session.spectate(conn, nick).map(|_| None)
        } else {
            session.join(conn, nick).map(Some)
        };
        match joined {
            Ok(player) => {
                let game = session.to_info();
                let others: Vec<ConnId> = session
                    .recipients()
                    .filter(|c| **c != conn)
                    .copied()
                    .collect();
                // Late spectators see the turn in progress
                let turn = if spectate {
                    Self::announcement(session)
                } else {
                    None
                };

                self.set_game(conn, Some(game_id));
                self.output.send(
                    conn,
                    ServerMessage::Joined {
                        game: game.clone(),
                        player,
                    },
                );
                self.output
                    .broadcast(others.iter(), ServerMessage::GameUpdated { game });
                if let Some(msg) = turn {
                    self.output.send(conn, msg);
                }
            }
            Err(e) => self.error(conn, e.to_string()),
        }
    }

    fn start_game(&mut self, conn: ConnId) {
        let Some(game_id) = self.game_of(conn) else {
            return self.error(conn, "Not in a game");
        };
        let Some(session) = self.sessions.get_mut(&game_id) else {
            return;
        };

        match session.start(conn, &mut self.rng) {
            Ok(events) => {
                let scheduler =
                    TurnScheduler::start(game_id, self.config.turn_limit, self.inputs.clone());
                session.attach_scheduler(scheduler);
                info!(game = %game_id, "Game started with {} players", session.state.player_count());

                if let Some(GameEvent::GameStarted { tile, position }) = events.first() {
                    let msg = ServerMessage::GameStarted {
                        game_id,
                        tile: *tile,
                        position: *position,
                        players: session.state.players.iter().map(PlayerInfo::from).collect(),
                    };
                    self.output.broadcast(session.recipients(), msg);
                }
                self.advance(game_id);
            }
            Err(e) => self.error(conn, e.to_string()),
        }
    }

    /// Leave the current game. Returns false if the connection was in none.
    fn leave_game(&mut self, conn: ConnId) -> bool {
        let Some(game_id) = self.game_of(conn) else {
            return false;
        };
        self.set_game(conn, None);
        let Some(session) = self.sessions.get_mut(&game_id) else {
            return true;
        };

        if let Err(e) = session.leave(conn) {
            warn!(game = %game_id, "Leave from {} failed: {}", conn, e);
        }
        if session.is_abandoned() {
            self.remove_abandoned(game_id);
        } else {
            let game = session.to_info();
            self.output
                .broadcast(session.recipients(), ServerMessage::GameUpdated { game });
        }
        true
    }

    fn handle_disconnect(&mut self, conn: ConnId) {
        info!("Connection {} closed", conn);
        self.leave_game(conn);
        self.connections.remove(&conn);
        self.output.detach(conn);
    }

    // ==================== Turns ====================

    fn play(&mut self, conn: ConnId, action: GameAction) {
        let Some(game_id) = self.game_of(conn) else {
            return self.error(conn, "Not in a game");
        };
        let Some(session) = self.sessions.get_mut(&game_id) else {
            return;
        };
        let Some(player) = session.player_of(conn) else {
            return self.reject(conn, game_id, &GameError::UnknownPlayer);
        };

        let waiting = session
            .scheduler()
            .is_some_and(|s| s.phase() == TurnPhase::WaitingForMove);
        let result = if waiting {
            session.state.apply_action(player, action)
        } else {
            Err(GameError::OutOfTurn)
        };

        match result {
            Ok(events) => {
                debug!(game = %game_id, "Player {} placed a tile", player);
                self.output.broadcast(
                    session.recipients(),
                    ServerMessage::MoveAccepted {
                        game_id,
                        player,
                        events,
                    },
                );
                self.advance(game_id);
            }
            Err(e) if e.is_fatal() => self.abort_game(game_id, e),
            Err(e) => {
                debug!(
                    game = %game_id,
                    "Rejected move from player {}: {}",
                    player,
                    RejectReason::from(&e).code()
                );
                // Same tile, same deadline
                let turn = Self::announcement(session);
                self.reject(conn, game_id, &e);
                if let Some(msg) = turn {
                    self.output.send(conn, msg);
                }
            }
        }
    }

    fn handle_expiry(&mut self, game_id: GameId, turn: u64) {
        let Some(session) = self.sessions.get_mut(&game_id) else {
            return;
        };
        let Some(scheduler) = session.scheduler() else {
            return;
        };
        if !scheduler.is_current(turn) {
            debug!(
                game = %game_id,
                "Ignoring stale expiry of turn {} (now {})",
                turn,
                scheduler.turn()
            );
            return;
        }

        // Clients are not told; the next TileDrawn is all they see
        if let Some(GameEvent::TurnForfeited { player, tile }) = session.state.on_timeout() {
            info!(game = %game_id, "Player {} ran out of time, {:?} discarded", player, tile.kind);
        }
        self.advance(game_id);
    }

    /// Draw for the next player and announce the turn, or end the game
    /// when no placeable tile is left.
    fn advance(&mut self, game_id: GameId) {
        let Some(session) = self.sessions.get_mut(&game_id) else {
            return;
        };
        if let Some(scheduler) = session.scheduler_mut() {
            scheduler.advancing();
        }

        match session.state.next_turn(&mut self.rng) {
            Ok(turn) => {
                if let Some(scheduler) = session.scheduler_mut() {
                    scheduler.begin_turn();
                }
                debug!(
                    game = %game_id,
                    "Player {} drew {:?}, {} left",
                    turn.player, turn.tile.kind, turn.remaining
                );
                if let Some(msg) = Self::announcement(session) {
                    self.output.broadcast(session.recipients(), msg);
                }
            }
            Err(GameError::DeckExhaustedDuringDraw) => self.end_game(game_id),
            Err(e) => self.abort_game(game_id, e),
        }
    }

    /// The running turn as a `TileDrawn` message
    fn announcement(session: &GameSession) -> Option<ServerMessage> {
        let scheduler = session.scheduler()?;
        if scheduler.phase() != TurnPhase::WaitingForMove {
            return None;
        }
        let player = session.state.current_player?;
        let tile = session.state.current_tile?;

        Some(ServerMessage::TileDrawn {
            game_id: session.id,
            player,
            tile,
            remaining: session.state.deck.remaining(),
            deadline_secs: scheduler.remaining_secs(),
            placements: session.state.board.legal_placements(&tile),
        })
    }

    // ==================== Game end ====================

    fn end_game(&mut self, game_id: GameId) {
        let Some(mut session) = self.sessions.remove(&game_id) else {
            return;
        };
        match session.state.final_sweep() {
            Ok(events) => {
                info!(game = %game_id, "Game ended, scores {:?}", session.state.scores());
                self.close(&mut session, EndReason::DeckExhausted, events);
            }
            Err(e) => self.abort(session, e),
        }
    }

    /// End one game after an internal error; other games carry on.
    fn abort_game(&mut self, game_id: GameId, error: GameError) {
        if let Some(session) = self.sessions.remove(&game_id) {
            self.abort(session, error);
        }
    }

    fn abort(&mut self, mut session: GameSession, error: GameError) {
        error!(game = %session.id, "Aborting game: {}", error);
        session.state.force_end();
        self.close(&mut session, EndReason::Aborted, Vec::new());
        self.output.broadcast(
            session.recipients(),
            ServerMessage::Error {
                message: error.to_string(),
            },
        );
    }

    fn remove_abandoned(&mut self, game_id: GameId) {
        let Some(mut session) = self.sessions.remove(&game_id) else {
            return;
        };
        info!(game = %game_id, "Removing abandoned game");
        if session.state.status == GameStatus::Ongoing {
            session.state.force_end();
            self.close(&mut session, EndReason::Aborted, Vec::new());
        } else {
            self.output.broadcast(session.recipients(), ServerMessage::Left);
            self.release(&session);
        }
    }

    /// Stop the clock, send the final scores and free the members.
    fn close(&mut self, session: &mut GameSession, reason: EndReason, events: Vec<GameEvent>) {
        if let Some(scheduler) = session.scheduler_mut() {
            scheduler.finish();
        }
        let msg = ServerMessage::GameEnded {
            game_id: session.id,
            reason,
            scores: session.state.scores(),
            events,
        };
        self.output.broadcast(session.recipients(), msg);
        self.release(session);
    }

    fn release(&mut self, session: &GameSession) {
        for conn in session.recipients() {
            if let Some(connection) = self.connections.get_mut(conn) {
                connection.game = None;
            }
        }
    }

    // ==================== Helpers ====================

    fn game_of(&self, conn: ConnId) -> Option<GameId> {
        self.connections.get(&conn)?.game
    }

    fn set_game(&mut self, conn: ConnId, game: Option<GameId>) {
        if let Some(connection) = self.connections.get_mut(&conn) {
            connection.game = game;
        }
    }

    /// The nick of a connection that has said hello and is not in a game
    fn lobby_nick(&self, conn: ConnId) -> Result<String, &'static str> {
        let connection = self.connections.get(&conn).ok_or("Unknown connection")?;
        if connection.game.is_some() {
            return Err("Already in a game");
        }
        connection.nick.clone().ok_or("Say hello first")
    }

    fn game_list(&self) -> Vec<crate::protocol::GameInfo> {
        let mut games: Vec<_> = self.sessions.values().map(GameSession::to_info).collect();
        games.sort_by(|a, b| a.name.cmp(&b.name));
        games
    }

    fn error(&self, conn: ConnId, message: impl Into<String>) {
        self.output.send(
            conn,
            ServerMessage::Error {
                message: message.into(),
            },
        );
    }

    fn reject(&self, conn: ConnId, game_id: GameId, error: &GameError) {
        self.output.send(
            conn,
            ServerMessage::MoveRejected {
                game_id,
                reason: RejectReason::from(error),
                message: error.to_string(),
            },
        );
    }
}
