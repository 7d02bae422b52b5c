use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::core::config::{EngineConfig, FanoutMode};
use crate::core::error::SubPubError;
use crate::core::handler::MessageHandler;
use crate::core::subscriber::Subscriber;
use crate::core::subscription::Subscription;

type SubscriberList<M> = Vec<Arc<Subscriber<M>>>;

/// Everything the registry lock guards.
pub(crate) struct RegistryState<M> {
    pub(crate) subjects: HashMap<String, SubscriberList<M>>,
    pub(crate) closed: bool,
}

impl<M> RegistryState<M> {
    /// Drops the subscriber from its subject, and the subject once empty.
    pub(crate) fn remove(&mut self, subject: &str, id: u64) {
        if let Some(list) = self.subjects.get_mut(subject) {
            list.retain(|sub| sub.id != id);
            if list.is_empty() {
                self.subjects.remove(subject);
            }
        }
    }
}

pub(crate) struct Shared<M> {
    pub(crate) state: Mutex<RegistryState<M>>,
    next_id: AtomicU64,
    config: EngineConfig,
}

/// In-process subject registry.
///
/// Publishing fans a message out to every subscriber currently registered on
/// the exact subject. Each subscriber owns a bounded mailbox drained by its own
/// delivery thread, so subscribers never wait on each other's handlers while
/// one subscriber always sees messages in the order they were enqueued.
///
/// Cloning gives another handle to the same registry.
pub struct SubPub<M> {
    shared: Arc<Shared<M>>,
}

impl<M> Clone for SubPub<M> {
    fn clone(&self) -> Self {
        SubPub {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M> Default for SubPub<M>
where
    M: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M> SubPub<M>
where
    M: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        SubPub {
            shared: Arc::new(Shared {
                state: Mutex::new(RegistryState {
                    subjects: HashMap::new(),
                    closed: false,
                }),
                next_id: AtomicU64::new(0),
                config,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Registers `handler` on `subject`. The delivery loop is running by the
    /// time this returns.
    pub async fn subscribe<H>(
        &self,
        subject: &str,
        handler: H,
    ) -> Result<Subscription<M>, SubPubError>
    where
        H: MessageHandler<M>,
    {
        if subject.is_empty() {
            return Err(SubPubError::EmptySubject);
        }

        let mut state = self.shared.state.lock().await;
        if state.closed {
            return Err(SubPubError::Closed);
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let subject: Arc<str> = Arc::from(subject);
        let subscriber = Subscriber::spawn(
            id,
            Arc::clone(&subject),
            handler,
            self.shared.config.effective_capacity(),
        )?;
        let stop = subscriber.stop_signal();

        state
            .subjects
            .entry(subject.to_string())
            .or_default()
            .push(Arc::new(subscriber));
        debug!(subject = %subject, subscriber_id = id, "subscribed");

        Ok(Subscription::new(
            id,
            subject,
            stop,
            Arc::downgrade(&self.shared),
        ))
    }

    /// Enqueues `message` for every current subscriber of `subject`, waiting
    /// for room in full mailboxes.
    pub async fn publish(&self, subject: &str, message: M) -> Result<(), SubPubError> {
        let state = self.shared.state.lock().await;
        if state.closed {
            return Err(SubPubError::Closed);
        }

        let subscribers = state
            .subjects
            .get(subject)
            .filter(|list| !list.is_empty())
            .ok_or(SubPubError::NoSubscribers)?;

        if self.shared.config.fanout == FanoutMode::Snapshot {
            let snapshot = subscribers.clone();
            drop(state);
            fan_out(&snapshot, message).await;
            return Ok(());
        }

        // lock stays held until every mailbox accepted the message
        fan_out(subscribers, message).await;
        Ok(())
    }

    /// Stops every subscriber and refuses all later work. The deadline is
    /// checked once, before anything is touched.
    pub async fn close(&self, deadline: Option<Instant>) -> Result<(), SubPubError> {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(SubPubError::DeadlineExceeded);
        }

        let mut state = self.shared.state.lock().await;
        if state.closed {
            return Ok(());
        }

        let detached = std::mem::take(&mut state.subjects);
        state.closed = true;

        let mut stopped = 0usize;
        for subscriber in detached.values().flatten() {
            subscriber.stop();
            stopped += 1;
        }
        info!(subjects = detached.len(), subscribers = stopped, "subpub closed");

        Ok(())
    }

    pub async fn is_closed(&self) -> bool {
        self.shared.state.lock().await.closed
    }

    pub async fn subscriber_count(&self, subject: &str) -> usize {
        self.shared
            .state
            .lock()
            .await
            .subjects
            .get(subject)
            .map_or(0, Vec::len)
    }

    pub async fn subjects(&self) -> Vec<String> {
        self.shared
            .state
            .lock()
            .await
            .subjects
            .keys()
            .cloned()
            .collect()
    }
}

async fn fan_out<M>(subscribers: &[Arc<Subscriber<M>>], message: M)
where
    M: Clone + Send + 'static,
{
    if let Some((last, rest)) = subscribers.split_last() {
        for subscriber in rest {
            subscriber.enqueue(message.clone()).await;
        }
        last.enqueue(message).await;
    }
}
