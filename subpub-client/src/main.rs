use anyhow::Result;
use clap::{Parser, Subcommand};
use subpub_client::SubPubClient;

#[derive(Parser, Debug)]
#[command(name = "subpub-client")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish one message
    Publish { subject: String, data: String },

    /// Print events until interrupted, or until `count` arrived
    Subscribe {
        subject: String,
        #[arg(long)]
        count: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut client = SubPubClient::connect(&cli.addr).await?;

    match cli.command {
        Command::Publish { subject, data } => {
            client.publish(&subject, data.as_bytes()).await?;
            println!("published to {}", subject);
        }
        Command::Subscribe { subject, count } => {
            let id = client.subscribe(&subject).await?;
            println!("subscribed to {} (subscription {})", subject, id);

            let mut received = 0usize;
            while count.map_or(true, |limit| received < limit) {
                let event = client.next_event().await?;
                println!(
                    "[{}] {}: {}",
                    event.published_at,
                    event.subject,
                    String::from_utf8_lossy(&event.data)
                );
                received += 1;
            }
            client.unsubscribe(id).await?;
        }
    }
    Ok(())
}
