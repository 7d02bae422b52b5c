mod config;
pub mod runtime;
pub mod server;
pub mod types;

pub use config::{ConfigError, ServerConfig};
pub use types::{Publication, SharedEngine};
