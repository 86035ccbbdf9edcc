//! Per-game turn scheduler.
//!
//! The scheduler itself lives inside the game session and is only touched
//! by the engine worker. It publishes the running turn through a watch
//! channel; a timer task reads it once a second and, when the deadline has
//! passed, feeds a `TurnExpired` input back into the engine FIFO. The timer
//! never touches game state.

use crate::dispatch::{Input, InputSender};
use crate::protocol::GameId;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Granularity of deadline checks
pub const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// A tile is out and the deadline is running
    WaitingForMove,
    /// Between turns: scoring, drawing
    Advancing,
    /// The game is over; no further turns
    Done,
}

/// What the timer task can see of the running turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnClock {
    pub turn: u64,
    pub phase: TurnPhase,
    pub deadline: Instant,
}

pub struct TurnScheduler {
    game: GameId,
    limit: Duration,
    clock: TurnClock,
    publish: watch::Sender<TurnClock>,
    timer: JoinHandle<()>,
}

impl TurnScheduler {
    /// Create the scheduler for an ongoing game and spawn its timer.
    pub fn start(game: GameId, limit: Duration, inputs: InputSender) -> Self {
        let clock = TurnClock {
            turn: 0,
            phase: TurnPhase::Advancing,
            deadline: Instant::now() + limit,
        };
        let (publish, receiver) = watch::channel(clock);
        let timer = tokio::spawn(run_timer(game, receiver, inputs));

        Self {
            game,
            limit,
            clock,
            publish,
            timer,
        }
    }

    pub fn turn(&self) -> u64 {
        self.clock.turn
    }

    pub fn phase(&self) -> TurnPhase {
        self.clock.phase
    }

    /// Whether `turn` is the turn currently waiting for a move
    pub fn is_current(&self, turn: u64) -> bool {
        self.clock.phase == TurnPhase::WaitingForMove && self.clock.turn == turn
    }

    /// A new tile is out: start the next turn with a full time limit.
    pub fn begin_turn(&mut self) -> u64 {
        self.clock = TurnClock {
            turn: self.clock.turn + 1,
            phase: TurnPhase::WaitingForMove,
            deadline: Instant::now() + self.limit,
        };
        self.publish_clock();
        self.clock.turn
    }

    /// The turn is over; stop the clock until the next tile is drawn.
    pub fn advancing(&mut self) {
        if self.clock.phase != TurnPhase::Done {
            self.clock.phase = TurnPhase::Advancing;
            self.publish_clock();
        }
    }

    /// Time left in the current turn
    pub fn remaining(&self) -> Duration {
        self.clock
            .deadline
            .saturating_duration_since(Instant::now())
    }

    /// Whole seconds left, rounded up
    pub fn remaining_secs(&self) -> u64 {
        let remaining = self.remaining();
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    /// Stop scheduling turns and tear down the timer
    pub fn finish(&mut self) {
        self.clock.phase = TurnPhase::Done;
        self.publish_clock();
        self.timer.abort();
        debug!(game = %self.game, "turn scheduler finished");
    }

    fn publish_clock(&self) {
        // The timer may already be gone; the clock is kept locally anyway
        let _ = self.publish.send(self.clock);
    }
}

impl Drop for TurnScheduler {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

async fn run_timer(game: GameId, clock: watch::Receiver<TurnClock>, inputs: InputSender) {
    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reported = None;

    loop {
        ticker.tick().await;
        let current = *clock.borrow();
        match current.phase {
            TurnPhase::Done => break,
            TurnPhase::Advancing => continue,
            TurnPhase::WaitingForMove => {}
        }
        if Instant::now() < current.deadline || reported == Some(current.turn) {
            continue;
        }

        reported = Some(current.turn);
        let expired = Input::TurnExpired {
            game,
            turn: current.turn,
        };
        if inputs.send(expired).is_err() {
            break;
        }
    }
}
