use std::path::PathBuf;

use clap::Parser;

use crate::ServerConfig;

/// Command line flags; anything given here wins over the config file.
#[derive(Parser, Debug)]
#[command(name = "subpub-server")]
pub struct Params {
    /// TOML config file. Defaults apply when omitted.
    #[arg(long, env = "SUBPUB_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "SUBPUB_HOST")]
    pub host: Option<String>,

    #[arg(long, env = "SUBPUB_PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "SUBPUB_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Params {
    pub fn apply_to(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}
