//! Turns decoded messages into cache updates, observer deliveries and handler
//! callbacks.

mod handler;
mod registry;

use std::sync::Arc;

use tracing::{debug, info, warn};

use nsm_proto::{Command, Message};

use crate::cache::ListenerCache;
use crate::connection::Connection;

pub use handler::{FnHandler, Handler, HandlerBuilder};
pub use registry::{DispatchReport, HandlerId, HandlerRegistry};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Per-connection message pipeline.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    cache: Arc<ListenerCache>,
    registry: HandlerRegistry,
}

impl Dispatcher {
    /// Builds a dispatcher feeding `cache` and `registry`.
    #[must_use]
    pub const fn new(cache: Arc<ListenerCache>, registry: HandlerRegistry) -> Self {
        Self { cache, registry }
    }

    /// Shared cache updated by this dispatcher.
    #[must_use]
    pub const fn cache(&self) -> &Arc<ListenerCache> {
        &self.cache
    }

    /// Handlers invoked by this dispatcher.
    #[must_use]
    pub const fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Processes one inbound message.
    ///
    /// The trailing record, if any, is cached under the message's node name
    /// first. Reserved notifications are logged. The message then goes to
    /// every observer and finally to the handlers.
    pub fn dispatch(&self, decoded: Message, connection: &Connection) -> DispatchReport {
        let message = Arc::new(decoded);
        if let Some(record) = message.record() {
            self.cache
                .store(record.kind(), message.node(), Arc::clone(record));
        }
        log_reserved(&message);
        self.cache.notify(&message);
        self.registry.dispatch(&message, connection)
    }
}

fn log_reserved(message: &Message) {
    match message.command() {
        Command::Ok => debug!(
            target: DISPATCH_TARGET,
            node = message.node(),
            params = ?message.params(),
            "relay acknowledged"
        ),
        Command::Error => warn!(
            target: DISPATCH_TARGET,
            node = message.node(),
            detail = message.payload(),
            "relay reported an error"
        ),
        Command::Log => info!(
            target: DISPATCH_TARGET,
            node = message.node(),
            text = message.payload(),
            "remote log"
        ),
        _ => {}
    }
}
