use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch::Sender;
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use crate::types::SharedEngine;

/// Fires `shutdown_tx` on ctrl-c, or SIGTERM on unix.
pub async fn watch_signals(shutdown_tx: Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {:?}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {:?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }

    let _ = shutdown_tx.send(());
}

/// Closes the engine, giving up after `grace`.
///
/// Close itself only checks its deadline up front; the timeout here also
/// bounds the wait for the registry lock.
pub async fn close_engine(engine: &SharedEngine, grace: Duration) -> anyhow::Result<()> {
    let deadline = Instant::now() + grace;

    match timeout_at(deadline, engine.close(Some(deadline))).await {
        Ok(result) => {
            result.context("closing subpub engine")?;
            info!("subpub engine closed");
        }
        Err(_) => warn!(grace_ms = grace.as_millis() as u64, "engine close timed out"),
    }
    Ok(())
}
