use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::core::constants::DELIVERY_THREAD_PREFIX;
use crate::core::error::SubPubError;
use crate::core::handler::MessageHandler;

/// Raised once, never lowered. Shared by a subscriber, its delivery loop
/// and its subscription handle.
#[derive(Debug, Default)]
pub(crate) struct StopSignal {
    raised: AtomicBool,
}

impl StopSignal {
    /// Returns `true` only for the call that actually raised the signal.
    pub(crate) fn raise(&self) -> bool {
        self.raised
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

/// Registry-side half of a subscriber. Holds the only sender of the
/// mailbox, so dropping it releases the delivery loop.
pub(crate) struct Subscriber<M> {
    pub(crate) id: u64,
    pub(crate) subject: Arc<str>,
    mailbox: mpsc::Sender<M>,
    stop: Arc<StopSignal>,
}

impl<M> Subscriber<M>
where
    M: Send + 'static,
{
    /// Creates the mailbox and starts the delivery loop on its own thread.
    pub(crate) fn spawn<H>(
        id: u64,
        subject: Arc<str>,
        handler: H,
        capacity: usize,
    ) -> Result<Self, SubPubError>
    where
        H: MessageHandler<M>,
    {
        let (tx, rx) = mpsc::channel(capacity);
        let stop = Arc::new(StopSignal::default());

        let delivery = DeliveryLoop {
            id,
            subject: Arc::clone(&subject),
            mailbox: rx,
            handler,
            stop: Arc::clone(&stop),
            state: LoopState::Listening,
        };

        thread::Builder::new()
            .name(format!("{}-{}", DELIVERY_THREAD_PREFIX, id))
            .spawn(move || delivery.run())?;

        Ok(Subscriber {
            id,
            subject,
            mailbox: tx,
            stop,
        })
    }

    pub(crate) fn stop_signal(&self) -> Arc<StopSignal> {
        Arc::clone(&self.stop)
    }

    /// Waits for a free slot when the mailbox is full. A mailbox whose loop
    /// already stopped swallows the message.
    pub(crate) async fn enqueue(&self, message: M) {
        if self.mailbox.send(message).await.is_err() {
            debug!(subject = %self.subject, subscriber_id = self.id, "mailbox released, message dropped");
        }
    }

    pub(crate) fn stop(&self) {
        self.stop.raise();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Listening,
    Stopped,
}

struct DeliveryLoop<M, H> {
    id: u64,
    subject: Arc<str>,
    mailbox: mpsc::Receiver<M>,
    handler: H,
    stop: Arc<StopSignal>,
    state: LoopState,
}

impl<M, H> DeliveryLoop<M, H>
where
    H: MessageHandler<M>,
{
    fn run(mut self) {
        debug!(subject = %self.subject, subscriber_id = self.id, "delivery loop listening");
        let mut delivered: u64 = 0;

        while self.state == LoopState::Listening {
            match self.mailbox.blocking_recv() {
                Some(_) if self.stop.is_raised() => self.state = LoopState::Stopped,
                Some(message) => {
                    if self.deliver(message) {
                        delivered += 1;
                    }
                }
                // every sender is gone: unsubscribed or closed
                None => self.state = LoopState::Stopped,
            }
        }

        // wakes publishers still waiting on a full mailbox
        self.mailbox.close();
        debug!(subject = %self.subject, subscriber_id = self.id, delivered, "delivery loop stopped");
    }

    fn deliver(&mut self, message: M) -> bool {
        let handler = &mut self.handler;
        match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(message))) {
            Ok(()) => true,
            Err(cause) => {
                error!(
                    subject = %self.subject,
                    subscriber_id = self.id,
                    panic = panic_message(cause.as_ref()),
                    "handler panicked, message skipped"
                );
                false
            }
        }
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(s) = cause.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
