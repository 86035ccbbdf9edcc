//! Output dispatcher.
//!
//! Every outbound message goes through one FIFO drained by one worker, which
//! owns the write half of every connection. Messages for a connection are
//! written in the order they were queued.

use crate::protocol::{ConnId, ServerMessage};
use futures_util::{Sink, SinkExt};
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Connection closed: {0}")]
    Closed(String),
}

/// The write half of a connection
pub type ConnSink = Pin<Box<dyn Sink<ServerMessage, Error = DeliveryError> + Send>>;

pub enum Outbound {
    /// Register the write half of a new connection
    Attach { conn: ConnId, sink: ConnSink },
    Send { to: ConnId, msg: ServerMessage },
    /// Close and forget a connection
    Detach { conn: ConnId },
}

impl fmt::Debug for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outbound::Attach { conn, .. } => f.debug_struct("Attach").field("conn", conn).finish(),
            Outbound::Send { to, msg } => f
                .debug_struct("Send")
                .field("to", to)
                .field("msg", msg)
                .finish(),
            Outbound::Detach { conn } => f.debug_struct("Detach").field("conn", conn).finish(),
        }
    }
}

/// Handle for queueing outbound messages.
#[derive(Clone)]
pub struct OutputSender {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl OutputSender {
    pub fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }

    pub fn attach(&self, conn: ConnId, sink: ConnSink) {
        self.queue(Outbound::Attach { conn, sink });
    }

    /// Queue a message for one connection.
    pub fn send(&self, to: ConnId, msg: ServerMessage) {
        self.queue(Outbound::Send { to, msg });
    }

    /// Queue the same message for several connections.
    pub fn broadcast<'a>(&self, to: impl IntoIterator<Item = &'a ConnId>, msg: ServerMessage) {
        for conn in to {
            self.send(*conn, msg.clone());
        }
    }

    pub fn detach(&self, conn: ConnId) {
        self.queue(Outbound::Detach { conn });
    }

    fn queue(&self, outbound: Outbound) {
        if self.tx.send(outbound).is_err() {
            warn!("Output dispatcher has stopped, dropping message");
        }
    }
}

/// Drain the output FIFO until every sender is gone.
pub async fn run_output(mut rx: mpsc::UnboundedReceiver<Outbound>) {
    let mut sinks: HashMap<ConnId, ConnSink> = HashMap::new();

    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Attach { conn, sink } => {
                sinks.insert(conn, sink);
            }
            Outbound::Send { to, msg } => {
                let Some(sink) = sinks.get_mut(&to) else {
                    debug!("Dropping message for unknown connection {}", to);
                    continue;
                };
                if let Err(e) = sink.send(msg).await {
                    warn!("Delivery to {} failed: {}", to, e);
                    sinks.remove(&to);
                }
            }
            Outbound::Detach { conn } => {
                if let Some(mut sink) = sinks.remove(&conn) {
                    let _ = sink.close().await;
                }
            }
        }
    }

    debug!("Output dispatcher stopped");
}
