//! Server configuration loaded from the environment.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::time::Duration;
use tessera_core::{Capability, GameConfig, DEFAULT_TOKENS, MAX_PLAYERS, MIN_PLAYERS};
use thiserror::Error;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TURN_LIMIT_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid server address {0:?}")]
    InvalidAddr(String),

    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("TURN_LIMIT_SECS must be greater than zero")]
    ZeroTurnLimit,

    #[error("MAX_PLAYERS must be between 2 and 5, got {0}")]
    PlayersOutOfRange(u8),
}

/// Settings shared by every game hosted by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Time a player has to place the drawn tile
    pub turn_limit: Duration,
    pub tokens_per_player: u32,
    pub max_players: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            turn_limit: Duration::from_secs(DEFAULT_TURN_LIMIT_SECS),
            tokens_per_player: DEFAULT_TOKENS,
            max_players: MAX_PLAYERS,
        }
    }
}

impl ServerConfig {
    /// Read `SERVER_ADDR`, `TURN_LIMIT_SECS`, `TOKENS_PER_PLAYER` and
    /// `MAX_PLAYERS`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr_text = lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_ADDR.into());
        let addr = addr_text
            .parse()
            .map_err(|_| ConfigError::InvalidAddr(addr_text.clone()))?;

        let turn_limit_secs = number(&lookup, "TURN_LIMIT_SECS", DEFAULT_TURN_LIMIT_SECS)?;
        if turn_limit_secs == 0 {
            return Err(ConfigError::ZeroTurnLimit);
        }

        let tokens_per_player = number(&lookup, "TOKENS_PER_PLAYER", DEFAULT_TOKENS)?;
        let max_players = number(&lookup, "MAX_PLAYERS", MAX_PLAYERS)?;
        if !(MIN_PLAYERS as u8..=MAX_PLAYERS).contains(&max_players) {
            return Err(ConfigError::PlayersOutOfRange(max_players));
        }

        Ok(Self {
            addr,
            turn_limit: Duration::from_secs(turn_limit_secs),
            tokens_per_player,
            max_players,
        })
    }

    /// Rules for a new game with the given optional capabilities
    pub fn game_config(&self, capabilities: impl IntoIterator<Item = Capability>) -> GameConfig {
        GameConfig {
            tokens_per_player: self.tokens_per_player,
            max_players: self.max_players,
            capabilities: capabilities.into_iter().collect::<BTreeSet<_>>(),
        }
    }
}

fn number<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}
