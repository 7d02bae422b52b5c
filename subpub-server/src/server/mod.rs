mod listener;
pub mod params;
mod session;
mod status;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, Level};

use crate::types::SharedEngine;
use crate::ServerConfig;

pub use listener::serve;

pub fn init_tracing(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .compact()
        .init();
}

/// Binds the configured address and serves until `shutdown_rx` fires.
pub async fn start(
    config: &ServerConfig,
    engine: SharedEngine,
    shutdown_rx: watch::Receiver<()>,
) -> anyhow::Result<()> {
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener on {}", addr))?;
    info!(addr = %addr, "server initiated");

    serve(listener, engine, shutdown_rx, config.outbound_buffer).await
}
