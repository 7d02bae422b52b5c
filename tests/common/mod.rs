#![allow(dead_code)]

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::timeout;

pub const WAIT: Duration = Duration::from_secs(2);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .with_thread_ids(true)
        .compact()
        .with_test_writer()
        .try_init();
}

/// Handler that forwards every message it receives into a channel the test
/// can await on.
pub fn recorder<T>() -> (impl FnMut(T) + Send + 'static, UnboundedReceiver<T>)
where
    T: Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = move |msg: T| {
        let _ = tx.send(msg);
    };
    (handler, rx)
}

pub async fn recv_n<T>(rx: &mut UnboundedReceiver<T>, n: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let msg = timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for delivery")
            .expect("handler channel closed");
        out.push(msg);
    }
    out
}

/// Asserts nothing shows up on `rx` for `quiet`.
pub async fn assert_quiet<T: std::fmt::Debug>(rx: &mut UnboundedReceiver<T>, quiet: Duration) {
    if let Ok(Some(msg)) = timeout(quiet, rx.recv()).await {
        panic!("unexpected delivery: {:?}", msg);
    }
}
