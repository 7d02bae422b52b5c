pub mod core;

pub use crate::core::config::{EngineConfig, FanoutMode};
pub use crate::core::error::{ErrorKind, SubPubError};
pub use crate::core::handler::MessageHandler;
pub use crate::core::registry::SubPub;
pub use crate::core::subscription::Subscription;
