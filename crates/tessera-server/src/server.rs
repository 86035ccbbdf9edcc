//! WebSocket server and connection handling.
//!
//! Reader tasks only decode and enqueue; all game state belongs to the
//! engine worker and all writes to the output worker.

use crate::config::ServerConfig;
use crate::dispatch::{Engine, Input, InputSender};
use crate::output::{run_output, DeliveryError, OutputSender};
use crate::protocol::{ClientMessage, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use rand::rngs::StdRng;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Handles to the two process-wide workers.
#[derive(Clone)]
pub struct Services {
    pub inputs: InputSender,
    pub output: OutputSender,
}

impl Services {
    /// Spawn the engine and output workers.
    pub fn start(config: ServerConfig, rng: StdRng) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let output = OutputSender::new(output_tx);

        tokio::spawn(run_output(output_rx));
        let engine = Engine::new(config, input_tx.clone(), output.clone(), rng);
        tokio::spawn(engine.run(input_rx));

        Self {
            inputs: input_tx,
            output,
        }
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, services: Services) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Tessera server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let services = services.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, services).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    services: Services,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (ws_sender, mut ws_receiver) = ws_stream.split();
    let conn = Uuid::new_v4();

    // The write half goes to the output worker, encoding on the way out
    let sink = ws_sender
        .sink_map_err(|e| DeliveryError::Closed(e.to_string()))
        .with(|msg: ServerMessage| async move {
            let text = serde_json::to_string(&msg)?;
            Ok::<_, DeliveryError>(Message::Text(text))
        });
    services.output.attach(conn, Box::pin(sink));
    services.inputs.send(Input::Connected { conn })?;

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => services.inputs.send(Input::Client { conn, msg })?,
                Err(e) => {
                    warn!("Invalid message from {}: {}", conn, e);
                    services.output.send(
                        conn,
                        ServerMessage::Error {
                            message: format!("Malformed message: {}", e),
                        },
                    );
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", conn);
                break;
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", conn, e);
                break;
            }
            _ => {}
        }
    }

    // Ordered after anything this client already queued
    services.inputs.send(Input::Disconnected { conn })?;
    info!("Connection closed for {}", conn);
    Ok(())
}
