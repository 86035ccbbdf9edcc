//! Game session management.

use crate::protocol::{ConnId, GameId, GameInfo, PlayerInfo};
use crate::scheduler::TurnScheduler;
use rand::Rng;
use std::collections::BTreeMap;
use tessera_core::{GameConfig, GameError, GameEvent, GameState, GameStatus, PlayerId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Only the creator can start the game")]
    NotCreator,

    #[error("Not a member of this game")]
    NotAMember,

    #[error("Already in this game")]
    AlreadyMember,

    #[error(transparent)]
    Game(#[from] GameError),
}

/// How a connection takes part in a game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player(PlayerId),
    Spectator,
}

#[derive(Debug, Clone)]
pub struct Member {
    pub nick: String,
    pub role: Role,
}

/// One hosted game: the rules state, who is connected to it, and its turn
/// scheduler once it is running.
pub struct GameSession {
    pub id: GameId,
    pub creator: ConnId,
    pub state: GameState,
    members: BTreeMap<ConnId, Member>,
    scheduler: Option<TurnScheduler>,
}

impl GameSession {
    /// Create a game with its creator in the first seat
    pub fn new(
        id: GameId,
        creator: ConnId,
        creator_nick: String,
        name: String,
        config: GameConfig,
    ) -> Result<Self, SessionError> {
        let mut session = Self {
            id,
            creator,
            state: GameState::new(name, config),
            members: BTreeMap::new(),
            scheduler: None,
        };
        session.join(creator, creator_nick)?;
        Ok(session)
    }

    /// The seat held by a connection, if it plays
    pub fn player_of(&self, conn: ConnId) -> Option<PlayerId> {
        match self.members.get(&conn)?.role {
            Role::Player(id) => Some(id),
            Role::Spectator => None,
        }
    }

    /// Every connection that receives this game's messages
    pub fn recipients(&self) -> impl Iterator<Item = &ConnId> {
        self.members.keys()
    }

    pub fn join(&mut self, conn: ConnId, nick: String) -> Result<PlayerId, SessionError> {
        if self.members.contains_key(&conn) {
            return Err(SessionError::AlreadyMember);
        }
        let id = self.state.add_player(nick.clone())?;
        self.members.insert(
            conn,
            Member {
                nick,
                role: Role::Player(id),
            },
        );
        Ok(id)
    }

    pub fn spectate(&mut self, conn: ConnId, nick: String) -> Result<(), SessionError> {
        if self.members.contains_key(&conn) {
            return Err(SessionError::AlreadyMember);
        }
        if self.state.is_finished() {
            return Err(GameError::GameOver.into());
        }
        self.state.add_spectator(nick.clone());
        self.members.insert(
            conn,
            Member {
                nick,
                role: Role::Spectator,
            },
        );
        Ok(())
    }

    /// Remove a connection from the game.
    ///
    /// Before the start its seat is freed and the others move up; once the
    /// game runs the seat stays in the turn order, marked disconnected.
    pub fn leave(&mut self, conn: ConnId) -> Result<Role, SessionError> {
        let member = self.members.remove(&conn).ok_or(SessionError::NotAMember)?;
        match member.role {
            Role::Player(_) => {
                self.state.remove_player(&member.nick)?;
                self.reseat();
            }
            Role::Spectator => {
                self.state.remove_spectator(&member.nick);
            }
        }

        if conn == self.creator {
            if let Some((next, _)) = self
                .members
                .iter()
                .find(|(_, m)| matches!(m.role, Role::Player(_)))
            {
                self.creator = *next;
            }
        }
        Ok(member.role)
    }

    /// Seat numbers shift when a player leaves before the start
    fn reseat(&mut self) {
        for member in self.members.values_mut() {
            if let Role::Player(_) = member.role {
                if let Some(player) = self.state.player_by_nick(&member.nick) {
                    member.role = Role::Player(player.id);
                }
            }
        }
    }

    /// Start the game (creator only) and lay the starting tile
    pub fn start<R: Rng>(&mut self, conn: ConnId, rng: &mut R) -> Result<Vec<GameEvent>, SessionError> {
        if conn != self.creator {
            return Err(SessionError::NotCreator);
        }
        Ok(self.state.start(rng)?)
    }

    pub fn attach_scheduler(&mut self, scheduler: TurnScheduler) {
        self.scheduler = Some(scheduler);
    }

    pub fn scheduler(&self) -> Option<&TurnScheduler> {
        self.scheduler.as_ref()
    }

    pub fn scheduler_mut(&mut self) -> Option<&mut TurnScheduler> {
        self.scheduler.as_mut()
    }

    /// A game nobody can play in any more should be removed.
    pub fn is_abandoned(&self) -> bool {
        match self.state.status {
            GameStatus::NotStarted => self.state.player_count() == 0,
            GameStatus::Ongoing => !self.state.has_connected_players(),
            GameStatus::Ended => true,
        }
    }

    pub fn to_info(&self) -> GameInfo {
        GameInfo {
            id: self.id,
            name: self.state.name.clone(),
            status: self.state.status,
            players: self.state.players.iter().map(PlayerInfo::from).collect(),
            spectators: self.state.spectators.len(),
            max_players: self.state.config.max_players,
            capabilities: self.state.config.capabilities.iter().copied().collect(),
        }
    }
}
