use serde::{Deserialize, Serialize};

use crate::core::constants::DEFAULT_MAILBOX_CAPACITY;

/// How `publish` treats the registry lock while it hands a message to
/// each subscriber's mailbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutMode {
    /// The lock stays held for the whole fan-out. A full mailbox stalls
    /// every other registry operation until its subscriber drains.
    #[default]
    Serialized,

    /// The subscriber list is copied under the lock and the lock released
    /// before enqueueing. A slow subscriber only stalls its own publishers.
    Snapshot,
}

/// Engine-wide knobs every subscriber inherits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound of pending messages per subscriber.
    pub mailbox_capacity: usize,

    pub fanout: FanoutMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            fanout: FanoutMode::default(),
        }
    }
}

impl EngineConfig {
    /// Mailboxes need at least one slot, zero is treated as one.
    pub(crate) fn effective_capacity(&self) -> usize {
        self.mailbox_capacity.max(1)
    }
}
