use anyhow::Result;
use clap::Parser;
use subpub::SubPub;
use subpub_server::server::{self, params::Params};
use subpub_server::{runtime, ServerConfig, SharedEngine};
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let params = Params::parse();
    let mut config = ServerConfig::load_or_default(params.config.as_deref())?;
    params.apply_to(&mut config);
    config.validate()?;

    server::init_tracing(config.log_level()?);
    info!("SubPub starting with config: {:?}", config);

    let engine: SharedEngine = SubPub::with_config(config.engine.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(runtime::watch_signals(shutdown_tx));

    server::start(&config, engine.clone(), shutdown_rx).await?;
    runtime::close_engine(&engine, config.shutdown_grace()).await
}
