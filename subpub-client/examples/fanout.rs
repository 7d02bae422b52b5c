use std::time::Duration;

use subpub_client::SubPubClient;
use tokio::time::timeout;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());
    println!("SubPub fan-out demo against {}\n", addr);

    let mut alice = SubPubClient::connect(&addr).await?;
    let mut bob = SubPubClient::connect(&addr).await?;
    let mut publisher = SubPubClient::connect(&addr).await?;

    alice.subscribe("news").await?;
    bob.subscribe("news").await?;

    for i in 1..=3 {
        publisher.publish("news", format!("headline #{}", i).as_bytes()).await?;
    }

    for (name, client) in [("alice", &mut alice), ("bob", &mut bob)] {
        for _ in 0..3 {
            let event = timeout(Duration::from_secs(2), client.next_event()).await??;
            println!("{} got {:?}", name, String::from_utf8_lossy(&event.data));
        }
    }

    // nobody listens on "weather"
    if let Err(e) = publisher.publish("weather", b"sunny").await {
        println!("\npublish to weather: {}", e);
    }
    Ok(())
}
