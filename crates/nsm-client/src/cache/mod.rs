//! Last-known-value store for pushed records, plus observer fan-out.
//!
//! Status and configuration records live in separate namespaces keyed by the
//! node name of the message that carried them. Each entry remembers when it
//! arrived so consumers can judge staleness themselves.

mod observer;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use tracing::{debug, warn};

use nsm_proto::{Message, RecordKind, TypedRecord};

use crate::error::ClientError;

pub use observer::ObserverId;
use observer::{Delivery, ObserverSender, ObserverSlot, spawn_worker};

const CACHE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::cache");

/// A cached record and the time it was stored.
#[derive(Debug, Clone)]
pub struct CachedRecord {
    record: Arc<TypedRecord>,
    received_at: SystemTime,
}

impl CachedRecord {
    /// The record.
    #[must_use]
    pub const fn record(&self) -> &Arc<TypedRecord> {
        &self.record
    }

    /// When the record was stored.
    #[must_use]
    pub const fn received_at(&self) -> SystemTime {
        self.received_at
    }
}

type Namespace = RwLock<HashMap<String, CachedRecord>>;

/// Thread-safe cache of the most recent record per node and kind.
#[derive(Default)]
pub struct ListenerCache {
    status: Namespace,
    config: Namespace,
    observers: Mutex<Vec<ObserverSlot>>,
    next_observer: AtomicU64,
}

impl std::fmt::Debug for ListenerCache {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ListenerCache")
            .field("status", &self.names(RecordKind::Status))
            .field("config", &self.names(RecordKind::Configuration))
            .finish_non_exhaustive()
    }
}

fn read(namespace: &Namespace) -> RwLockReadGuard<'_, HashMap<String, CachedRecord>> {
    namespace.read().unwrap_or_else(|poison| poison.into_inner())
}

fn write(namespace: &Namespace) -> RwLockWriteGuard<'_, HashMap<String, CachedRecord>> {
    namespace.write().unwrap_or_else(|poison| poison.into_inner())
}

impl ListenerCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    const fn namespace(&self, kind: RecordKind) -> &Namespace {
        match kind {
            RecordKind::Status => &self.status,
            RecordKind::Configuration => &self.config,
        }
    }

    /// Stores a record under `name`, replacing any earlier one.
    pub fn store(&self, kind: RecordKind, name: &str, record: Arc<TypedRecord>) {
        let entry = CachedRecord {
            record,
            received_at: SystemTime::now(),
        };
        let replaced = write(self.namespace(kind))
            .insert(name.to_owned(), entry)
            .is_some();
        debug!(
            target: CACHE_TARGET,
            kind = %kind,
            key = name,
            replaced,
            "cached record"
        );
    }

    /// Latest record stored under `name`.
    #[must_use]
    pub fn get(&self, kind: RecordKind, name: &str) -> Option<Arc<TypedRecord>> {
        read(self.namespace(kind))
            .get(name)
            .map(|entry| Arc::clone(&entry.record))
    }

    /// Latest status record of `node`.
    #[must_use]
    pub fn status(&self, node: &str) -> Option<Arc<TypedRecord>> {
        self.get(RecordKind::Status, node)
    }

    /// Latest configuration record stored under `name`.
    #[must_use]
    pub fn config(&self, name: &str) -> Option<Arc<TypedRecord>> {
        self.get(RecordKind::Configuration, name)
    }

    /// Latest entry under `name`, including its receive time.
    #[must_use]
    pub fn entry(&self, kind: RecordKind, name: &str) -> Option<CachedRecord> {
        read(self.namespace(kind)).get(name).cloned()
    }

    /// Sorted names present in a namespace.
    #[must_use]
    pub fn names(&self, kind: RecordKind) -> Vec<String> {
        let mut names: Vec<String> = read(self.namespace(kind)).keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Total number of cached records across both namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.status).len().saturating_add(read(&self.config).len())
    }

    /// Whether both namespaces are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached record. Observers stay attached.
    pub fn clear(&self) {
        write(&self.status).clear();
        write(&self.config).clear();
    }

    fn allocate_observer(&self) -> ObserverId {
        ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed))
    }

    /// Delivers every dispatched message to `callback` on a dedicated thread.
    ///
    /// Messages arrive in dispatch order and never overlap. A panicking
    /// callback is logged and keeps receiving later messages. The queue in
    /// front of a slow callback is unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Spawn`] when the delivery thread cannot start.
    pub fn observe<F>(&self, callback: F) -> Result<ObserverId, ClientError>
    where
        F: FnMut(&Message) + Send + 'static,
    {
        let id = self.allocate_observer();
        let (sender, receiver) = mpsc::channel();
        spawn_worker(id, receiver, callback).map_err(|source| ClientError::Spawn {
            name: format!("nsm-observer-{}", id.0),
            source,
        })?;
        self.attach(ObserverSlot {
            id,
            sender: ObserverSender::Unbounded(sender),
        });
        Ok(id)
    }

    /// Attaches an observer drained by the caller, e.g. from an event loop.
    ///
    /// The channel is unbounded: a receiver that is never drained keeps every
    /// message alive. Use [`ListenerCache::observe_channel_bounded`] when the
    /// consumer may fall behind.
    #[must_use]
    pub fn observe_channel(&self) -> (ObserverId, Receiver<Arc<Message>>) {
        let id = self.allocate_observer();
        let (sender, receiver) = mpsc::channel();
        self.attach(ObserverSlot {
            id,
            sender: ObserverSender::Unbounded(sender),
        });
        (id, receiver)
    }

    /// Attaches a caller-drained observer holding at most `capacity` pending
    /// messages. Messages arriving while the queue is full are skipped for
    /// this observer and logged; the dispatching thread never blocks.
    #[must_use]
    pub fn observe_channel_bounded(
        &self,
        capacity: usize,
    ) -> (ObserverId, Receiver<Arc<Message>>) {
        let id = self.allocate_observer();
        let (sender, receiver) = mpsc::sync_channel(capacity);
        self.attach(ObserverSlot {
            id,
            sender: ObserverSender::Bounded(sender),
        });
        (id, receiver)
    }

    fn attach(&self, slot: ObserverSlot) {
        self.observers
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(slot);
    }

    /// Detaches an observer. Its delivery thread finishes the messages it has
    /// already received and then exits.
    pub fn unobserve(&self, id: ObserverId) -> bool {
        let mut observers = self
            .observers
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let before = observers.len();
        observers.retain(|slot| slot.id != id);
        observers.len() != before
    }

    /// Number of attached observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .len()
    }

    /// Queues `message` for every observer, dropping observers whose receiver
    /// has gone away.
    pub(crate) fn notify(&self, message: &Arc<Message>) {
        let mut observers = self
            .observers
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        observers.retain(|slot| match slot.deliver(message) {
            Delivery::Queued => true,
            Delivery::Full => {
                warn!(
                    target: CACHE_TARGET,
                    observer = slot.id.0,
                    command = %message.command(),
                    node = message.node(),
                    "observer queue full; message skipped"
                );
                true
            }
            Delivery::Closed => {
                debug!(
                    target: CACHE_TARGET,
                    observer = slot.id.0,
                    "dropping observer with closed channel"
                );
                false
            }
        });
    }
}
