use std::fmt;
use std::sync::{Arc, Weak};

use tracing::debug;

use crate::core::registry::Shared;
use crate::core::subscriber::StopSignal;

/// Handle returned by [`SubPub::subscribe`](crate::SubPub::subscribe).
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription<M> {
    id: u64,
    subject: Arc<str>,
    stop: Arc<StopSignal>,
    registry: Weak<Shared<M>>,
}

impl<M> Subscription<M> {
    pub(crate) fn new(
        id: u64,
        subject: Arc<str>,
        stop: Arc<StopSignal>,
        registry: Weak<Shared<M>>,
    ) -> Self {
        Subscription {
            id,
            subject,
            stop,
            registry,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Stops delivery and removes the subscriber from its subject.
    ///
    /// A handler call already running is left to finish. Calling this again,
    /// or after the registry was closed or dropped, has no further effect; a
    /// retry after a cancelled call finishes the removal.
    pub async fn unsubscribe(&self) {
        // raised before waiting on the lock, so a publish stuck on this
        // mailbox while holding the lock can finish
        let first = self.stop.raise();

        let Some(shared) = self.registry.upgrade() else {
            return;
        };
        // removal runs on every call: an earlier call may have been dropped
        // while waiting for the lock
        shared.state.lock().await.remove(&self.subject, self.id);
        if first {
            debug!(subject = %self.subject, subscriber_id = self.id, "unsubscribed");
        }
    }
}

impl<M> fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("subject", &self.subject)
            .field("stopped", &self.stop.is_raised())
            .finish()
    }
}
