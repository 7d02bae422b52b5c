use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use subpub::EngineConfig;
use thiserror::Error;
use tracing::Level;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("engine.mailbox_capacity must be greater than zero")]
    ZeroMailboxCapacity,

    #[error("outbound_buffer must be greater than zero")]
    ZeroOutboundBuffer,

    #[error("shutdown_grace_ms must be greater than zero")]
    ZeroShutdownGrace,

    #[error("unknown log level {0:?}")]
    UnknownLogLevel(String),
}

/// Everything the gateway process needs; engine knobs live under `[engine]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// One of trace, debug, info, warn, error.
    pub log_level: String,

    /// Frames queued per connection before subscription handlers wait on
    /// the socket.
    pub outbound_buffer: usize,

    /// How long shutdown waits for the engine to close.
    pub shutdown_grace_ms: u64,

    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            outbound_buffer: 256,
            shutdown_grace_ms: 5_000,
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => Self::read_from_file(p),
            None => Ok(Self::default()),
        }
    }

    fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading {:?}", path.as_ref()))?;
        let cfg: ServerConfig =
            toml::from_str(&raw).with_context(|| "parsing server config TOML")?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.mailbox_capacity == 0 {
            return Err(ConfigError::ZeroMailboxCapacity);
        }
        if self.outbound_buffer == 0 {
            return Err(ConfigError::ZeroOutboundBuffer);
        }
        if self.shutdown_grace_ms == 0 {
            return Err(ConfigError::ZeroShutdownGrace);
        }
        self.log_level().map(|_| ())
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::UnknownLogLevel(self.log_level.clone()))
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
