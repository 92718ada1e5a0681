//! Per-observer delivery threads.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, SyncSender, TrySendError};
use std::thread;

use tracing::{debug, warn};

use nsm_proto::Message;

use super::CACHE_TARGET;

/// Identifier returned by [`ListenerCache::observe`](super::ListenerCache::observe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u64);

pub(super) enum ObserverSender {
    Unbounded(Sender<Arc<Message>>),
    Bounded(SyncSender<Arc<Message>>),
}

/// Outcome of queueing one message for one observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Delivery {
    Queued,
    /// A bounded queue was full and the message was skipped.
    Full,
    Closed,
}

pub(super) struct ObserverSlot {
    pub(super) id: ObserverId,
    pub(super) sender: ObserverSender,
}

impl ObserverSlot {
    /// Queues `message` without blocking the dispatching thread.
    pub(super) fn deliver(&self, message: &Arc<Message>) -> Delivery {
        match &self.sender {
            ObserverSender::Unbounded(sender) => match sender.send(Arc::clone(message)) {
                Ok(()) => Delivery::Queued,
                Err(_) => Delivery::Closed,
            },
            ObserverSender::Bounded(sender) => match sender.try_send(Arc::clone(message)) {
                Ok(()) => Delivery::Queued,
                Err(TrySendError::Full(_)) => Delivery::Full,
                Err(TrySendError::Disconnected(_)) => Delivery::Closed,
            },
        }
    }
}

/// Runs `callback` for every message received on `receiver`, in order, on a
/// dedicated thread. The thread ends once the sender is dropped.
pub(super) fn spawn_worker<F>(
    id: ObserverId,
    receiver: Receiver<Arc<Message>>,
    mut callback: F,
) -> std::io::Result<()>
where
    F: FnMut(&Message) + Send + 'static,
{
    thread::Builder::new()
        .name(format!("nsm-observer-{}", id.0))
        .spawn(move || {
            for message in receiver {
                let outcome = catch_unwind(AssertUnwindSafe(|| callback(&message)));
                if outcome.is_err() {
                    warn!(
                        target: CACHE_TARGET,
                        observer = id.0,
                        command = %message.command(),
                        node = message.node(),
                        "observer panicked; continuing with the next message"
                    );
                }
            }
            debug!(target: CACHE_TARGET, observer = id.0, "observer detached");
        })
        .map(drop)
}
