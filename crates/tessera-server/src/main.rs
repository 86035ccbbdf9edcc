//! Tessera multiplayer game server.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dispatch;
mod output;
mod protocol;
mod scheduler;
mod server;
mod session;

use config::ServerConfig;
use server::Services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        "Starting Tessera server (turn limit {}s, up to {} players)",
        config.turn_limit.as_secs(),
        config.max_players
    );

    let services = Services::start(config.clone(), StdRng::from_entropy());
    server::run_server(config.addr, services).await
}
