#![allow(dead_code)]

use std::time::Duration;

use subpub::{EngineConfig, SubPub};
use subpub_server::server::serve;
use subpub_server::SharedEngine;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const WAIT: Duration = Duration::from_secs(2);

pub struct TestServer {
    pub addr: String,
    pub engine: SharedEngine,
    pub shutdown: watch::Sender<()>,
    pub task: JoinHandle<anyhow::Result<()>>,
}

pub async fn spawn_server(engine_config: EngineConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("no local addr").to_string();

    let engine: SharedEngine = SubPub::with_config(engine_config);
    let (shutdown, shutdown_rx) = watch::channel(());
    let task = tokio::spawn(serve(listener, engine.clone(), shutdown_rx, 64));

    TestServer {
        addr,
        engine,
        shutdown,
        task,
    }
}

/// Polls until `subject` has `expected` subscribers or `WAIT` runs out.
pub async fn wait_for_subscribers(engine: &SharedEngine, subject: &str, expected: usize) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if engine.subscriber_count(subject).await == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
