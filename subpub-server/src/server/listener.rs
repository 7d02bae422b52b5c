use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::server::session;
use crate::types::SharedEngine;

/// Accepts connections on an already bound listener, one session task per
/// connection, until `shutdown_rx` fires or its sender goes away.
pub async fn serve(
    listener: TcpListener,
    engine: SharedEngine,
    mut shutdown_rx: watch::Receiver<()>,
    outbound_buffer: usize,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                debug!(%peer, "new incoming connection");

                let engine = engine.clone();
                let shutdown = shutdown_rx.clone();
                tokio::spawn(async move {
                    if let Err(e) = session::run(socket, peer, engine, shutdown, outbound_buffer).await {
                        error!(%peer, "Connection error: {:?}", e);
                    }
                });
            }
            _ = shutdown_rx.changed() => {
                info!("listener stopped accepting connections");
                return Ok(());
            }
        }
    }
}
