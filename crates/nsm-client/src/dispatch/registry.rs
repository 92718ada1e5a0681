//! Thread-safe list of handlers with snapshot dispatch.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use nsm_proto::Message;

use super::{DISPATCH_TARGET, Handler};
use crate::connection::Connection;
use crate::error::HandlerError;

/// Identifier returned by [`HandlerRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// Outcome of one dispatch or connect notification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that were invoked.
    pub invoked: usize,
    /// Handlers that reported the message consumed.
    pub consumed: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
    /// One-shot handlers removed after consuming.
    pub removed: usize,
}

type Entry = (HandlerId, Arc<dyn Handler>);

#[derive(Default)]
struct RegistryInner {
    handlers: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

/// Shared, cloneable list of handlers for one connection.
///
/// Dispatch takes a snapshot under the lock and invokes handlers after
/// releasing it, so handlers may register or unregister others mid-pass.
/// Changes made during a pass take effect from the next pass.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    inner: Arc<RegistryInner>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HandlerRegistry")
            .field("len", &self.len())
            .finish()
    }
}

enum Outcome<T> {
    Returned(T),
    Failed(HandlerError),
    Panicked,
}

fn invoke<T>(call: impl FnOnce() -> Result<T, HandlerError>) -> Outcome<T> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Outcome::Returned(value),
        Ok(Err(error)) => Outcome::Failed(error),
        Err(_) => Outcome::Panicked,
    }
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Adds a handler.
    pub fn register(&self, handler: impl Handler + 'static) -> HandlerId {
        self.register_arc(Arc::new(handler))
    }

    /// Adds a shared handler.
    pub fn register_arc(&self, handler: Arc<dyn Handler>) -> HandlerId {
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, handler));
        id
    }

    /// Removes a handler. Returns `false` when it was not registered.
    pub fn unregister(&self, id: HandlerId) -> bool {
        let mut handlers = self.lock();
        let before = handlers.len();
        handlers.retain(|(candidate, _)| *candidate != id);
        handlers.len() != before
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn snapshot(&self) -> Vec<Entry> {
        self.lock().clone()
    }

    /// Runs [`Handler::connected`] on every registered handler.
    pub fn notify_connected(&self, connection: &Connection) -> DispatchReport {
        let mut report = DispatchReport::default();
        for (id, handler) in self.snapshot() {
            report.invoked = report.invoked.saturating_add(1);
            match invoke(|| handler.connected(connection)) {
                Outcome::Returned(()) => {}
                Outcome::Failed(error) => {
                    report.failed = report.failed.saturating_add(1);
                    warn!(
                        target: DISPATCH_TARGET,
                        handler = ?id,
                        error = %error,
                        "handler failed on connect"
                    );
                }
                Outcome::Panicked => {
                    report.failed = report.failed.saturating_add(1);
                    warn!(target: DISPATCH_TARGET, handler = ?id, "handler panicked on connect");
                }
            }
        }
        report
    }

    /// Offers `message` to every accepting handler, then removes one-shot
    /// handlers that consumed it.
    pub fn dispatch(&self, message: &Message, connection: &Connection) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut spent = Vec::new();
        for (id, handler) in self.snapshot() {
            let accepted = invoke(|| Ok(handler.accepts(message)));
            if !matches!(accepted, Outcome::Returned(true)) {
                continue;
            }
            report.invoked = report.invoked.saturating_add(1);
            match invoke(|| handler.handle(message, connection)) {
                Outcome::Returned(true) => {
                    report.consumed = report.consumed.saturating_add(1);
                    if handler.once() {
                        spent.push(id);
                    }
                }
                Outcome::Returned(false) => {}
                Outcome::Failed(error) => {
                    report.failed = report.failed.saturating_add(1);
                    warn!(
                        target: DISPATCH_TARGET,
                        handler = ?id,
                        command = %message.command(),
                        node = message.node(),
                        error = %error,
                        "handler failed"
                    );
                }
                Outcome::Panicked => {
                    report.failed = report.failed.saturating_add(1);
                    warn!(
                        target: DISPATCH_TARGET,
                        handler = ?id,
                        command = %message.command(),
                        node = message.node(),
                        "handler panicked"
                    );
                }
            }
        }
        if !spent.is_empty() {
            let mut handlers = self.lock();
            let before = handlers.len();
            handlers.retain(|(id, _)| !spent.contains(id));
            report.removed = before.saturating_sub(handlers.len());
        }
        report
    }
}
