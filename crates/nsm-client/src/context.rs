//! Explicit runtime context shared by every connection of a process.

use std::sync::Arc;

use crate::cache::ListenerCache;
use crate::connection::{
    ConnectionBuilder, ConnectionConfig, ConnectionHandle, LifecycleReporter,
    StructuredLifecycleReporter,
};
use crate::error::ClientError;

/// Owns the shared [`ListenerCache`] and the lifecycle reporter.
///
/// Construct one at startup and pass it to whatever needs to connect. Each
/// connection gets its own handler registry but feeds the same cache, so
/// several relays can be used side by side.
#[derive(Clone)]
pub struct NsmContext {
    cache: Arc<ListenerCache>,
    reporter: Arc<dyn LifecycleReporter>,
}

impl std::fmt::Debug for NsmContext {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("NsmContext")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Default for NsmContext {
    fn default() -> Self {
        Self::new()
    }
}

impl NsmContext {
    /// Creates a context that logs lifecycle events through `tracing`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_reporter(Arc::new(StructuredLifecycleReporter::new()))
    }

    /// Creates a context with a custom lifecycle reporter.
    #[must_use]
    pub fn with_reporter(reporter: Arc<dyn LifecycleReporter>) -> Self {
        Self {
            cache: Arc::new(ListenerCache::new()),
            reporter,
        }
    }

    /// The shared cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<ListenerCache> {
        &self.cache
    }

    /// Starts a builder wired to this context's cache and reporter.
    #[must_use]
    pub fn connection(&self, config: ConnectionConfig) -> ConnectionBuilder {
        ConnectionBuilder::new(config)
            .cache(Arc::clone(&self.cache))
            .reporter(Arc::clone(&self.reporter))
    }

    /// Spawns a connection with no handlers registered up front.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Spawn`] when the connection thread cannot start.
    pub fn connect(&self, config: ConnectionConfig) -> Result<ConnectionHandle, ClientError> {
        self.connection(config).spawn()
    }
}
