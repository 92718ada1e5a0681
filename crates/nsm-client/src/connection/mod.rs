//! Persistent relay connection with fixed-delay reconnect.
//!
//! Each connection owns one thread that dials the proxy, writes the
//! handshake, notifies handlers and then blocks in the read loop. Any read or
//! decode failure ends the session; the thread waits the reconnect delay and
//! dials again. It retries forever until [`Connection::close`] or
//! [`ConnectionHandle::stop`] is called.

mod lifecycle;
mod requests;
mod session;

use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use strum::Display;
use tracing::{debug, trace};

use nsm_config::{
    Config, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_RECONNECT_DELAY_MS, Endpoint,
};
use nsm_proto::Message;

use crate::cache::ListenerCache;
use crate::dispatch::{Dispatcher, Handler, HandlerId, HandlerRegistry};
use crate::error::ClientError;

pub use lifecycle::{LifecycleReporter, StructuredLifecycleReporter};

const CONNECTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::connection");

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// Addressing and timing for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    node_name: String,
    proxy: Endpoint,
    relay: Endpoint,
    reconnect_delay: Duration,
    connect_timeout: Duration,
}

impl ConnectionConfig {
    /// Creates a configuration with the default delay and timeout.
    #[must_use]
    pub fn new(node_name: impl Into<String>, proxy: Endpoint, relay: Endpoint) -> Self {
        Self {
            node_name: node_name.into(),
            proxy,
            relay,
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }

    /// Derives a connection configuration from loaded settings.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.node_name(),
            config.proxy().clone(),
            config.relay().clone(),
        )
        .with_reconnect_delay(config.reconnect_delay())
        .with_connect_timeout(config.connect_timeout())
    }

    /// Sets the wait between reconnect attempts.
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the TCP connect timeout. Zero means the OS default.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Node identity written in the handshake.
    #[must_use]
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Proxy the connection dials.
    #[must_use]
    pub const fn proxy(&self) -> &Endpoint {
        &self.proxy
    }

    /// Relay named in the handshake.
    #[must_use]
    pub const fn relay(&self) -> &Endpoint {
        &self.relay
    }

    /// Wait between reconnect attempts.
    #[must_use]
    pub const fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// TCP connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

/// Connection state, advanced only by the connection thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// No session; waiting to dial or stopped.
    Disconnected,
    /// Dialling the proxy and writing the handshake.
    Connecting,
    /// Session live; the read loop is running.
    Connected,
}

struct Shared {
    config: ConnectionConfig,
    dispatcher: Dispatcher,
    reporter: Arc<dyn LifecycleReporter>,
    state: Mutex<ConnectionState>,
    wake: Condvar,
    writer: Mutex<Option<TcpStream>>,
    control: Mutex<Option<TcpStream>>,
    closing: AtomicBool,
}

/// Cheap-clone handle to a connection.
///
/// Handlers receive it to reply, issue requests or manage handlers. Sends
/// from any thread serialize through one write lock, so a message and its
/// trailing record are never interleaved with another sender's bytes.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Connection")
            .field("proxy", &self.shared.config.proxy)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Connection {
    fn new(
        config: ConnectionConfig,
        dispatcher: Dispatcher,
        reporter: Arc<dyn LifecycleReporter>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                dispatcher,
                reporter,
                state: Mutex::new(ConnectionState::Disconnected),
                wake: Condvar::new(),
                writer: Mutex::new(None),
                control: Mutex::new(None),
                closing: AtomicBool::new(false),
            }),
        }
    }

    /// Addressing and timing of this connection.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *lock(&self.shared.state)
    }

    /// Whether a session is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Cache fed by this connection.
    #[must_use]
    pub fn cache(&self) -> &Arc<ListenerCache> {
        self.shared.dispatcher.cache()
    }

    /// Handlers of this connection.
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        self.shared.dispatcher.registry()
    }

    /// Registers a handler. It sees `connected` from the next session on.
    pub fn register(&self, handler: impl Handler + 'static) -> HandlerId {
        self.registry().register(handler)
    }

    /// Removes a handler.
    pub fn unregister(&self, id: HandlerId) -> bool {
        self.registry().unregister(id)
    }

    /// Encodes `message` and writes it to the live session.
    ///
    /// The whole frame is encoded before the write lock is taken. A failed
    /// write shuts the socket down so the read loop reconnects.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] without a live session,
    /// [`ClientError::Protocol`] when the message cannot be framed and
    /// [`ClientError::Send`] when the write fails.
    pub fn send(&self, message: &Message) -> Result<(), ClientError> {
        let bytes = message.to_bytes()?;
        let mut writer = lock(&self.shared.writer);
        let Some(stream) = writer.as_mut() else {
            return Err(ClientError::NotConnected);
        };
        if let Err(source) = stream.write_all(&bytes).and_then(|()| stream.flush()) {
            shutdown_stream(stream);
            *writer = None;
            return Err(ClientError::Send { source });
        }
        trace!(
            target: CONNECTION_TARGET,
            command = %message.command(),
            node = message.node(),
            bytes = bytes.len(),
            "sent message"
        );
        Ok(())
    }

    /// Asks the connection thread to stop without waiting for it.
    ///
    /// Sets the closing flag, interrupts the reconnect wait and shuts the
    /// socket down so a blocked read or send returns. Safe to call from
    /// handlers.
    pub fn close(&self) {
        self.shared.closing.store(true, Ordering::SeqCst);
        {
            let _state = lock(&self.shared.state);
            self.shared.wake.notify_all();
        }
        self.interrupt_session();
    }

    /// Whether [`Connection::close`] has been called.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.shared.closing.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: ConnectionState) {
        *lock(&self.shared.state) = state;
    }

    /// Waits the reconnect delay. Returns `false` when closing.
    fn wait_for_retry(&self) -> bool {
        let guard = lock(&self.shared.state);
        let delay = self.shared.config.reconnect_delay;
        let waited = self
            .shared
            .wake
            .wait_timeout_while(guard, delay, |_| !self.is_closing());
        drop(waited.unwrap_or_else(|poison| poison.into_inner()));
        !self.is_closing()
    }

    /// Records the socket used to interrupt the session. Fails when a stop
    /// request raced with the dial.
    fn publish_control(&self, stream: TcpStream) -> Result<(), ClientError> {
        *lock(&self.shared.control) = Some(stream);
        if self.is_closing() {
            self.end_session();
            return Err(ClientError::Closing);
        }
        Ok(())
    }

    fn publish_writer(&self, stream: TcpStream) {
        *lock(&self.shared.writer) = Some(stream);
    }

    /// Shuts the live socket down through the control clone. Never takes the
    /// write lock, so a send blocked on a stalled peer fails and releases it.
    fn interrupt_session(&self) {
        if let Some(stream) = lock(&self.shared.control).take() {
            shutdown_stream(&stream);
        }
    }

    fn end_session(&self) {
        self.interrupt_session();
        lock(&self.shared.writer).take();
    }

    fn dispatcher(&self) -> &Dispatcher {
        &self.shared.dispatcher
    }

    fn reporter(&self) -> &dyn LifecycleReporter {
        self.shared.reporter.as_ref()
    }
}

fn shutdown_stream(stream: &TcpStream) {
    if let Err(error) = stream.shutdown(Shutdown::Both) {
        debug!(
            target: CONNECTION_TARGET,
            error = %error,
            "socket already closed"
        );
    }
}

/// Assembles a connection before its thread starts.
///
/// Handlers registered here are in place for the first `connected` callback.
pub struct ConnectionBuilder {
    config: ConnectionConfig,
    cache: Arc<ListenerCache>,
    reporter: Arc<dyn LifecycleReporter>,
    registry: HandlerRegistry,
}

impl ConnectionBuilder {
    /// Starts a builder with a private cache and the structured reporter.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            cache: Arc::new(ListenerCache::new()),
            reporter: Arc::new(StructuredLifecycleReporter::new()),
            registry: HandlerRegistry::new(),
        }
    }

    /// Feeds a shared cache.
    #[must_use]
    pub fn cache(mut self, cache: Arc<ListenerCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Reports lifecycle events to `reporter`.
    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn LifecycleReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Registers a handler.
    #[must_use]
    pub fn handler(self, handler: impl Handler + 'static) -> Self {
        self.registry.register(handler);
        self
    }

    /// Registers a shared handler.
    #[must_use]
    pub fn handler_arc(self, handler: Arc<dyn Handler>) -> Self {
        self.registry.register_arc(handler);
        self
    }

    fn into_connection(self) -> Connection {
        Connection::new(
            self.config,
            Dispatcher::new(self.cache, self.registry),
            self.reporter,
        )
    }

    /// Builds a connection without starting its thread. It never dials, so
    /// sends report [`ClientError::NotConnected`].
    #[must_use]
    pub fn detached(self) -> Connection {
        self.into_connection()
    }

    /// Starts the connection thread.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Spawn`] when the thread cannot start.
    pub fn spawn(self) -> Result<ConnectionHandle, ClientError> {
        let connection = self.into_connection();
        let name = format!("nsm-connection-{}", connection.config().proxy());
        let worker = connection.clone();
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run(&worker))
            .map_err(|source| ClientError::Spawn { name, source })?;
        Ok(ConnectionHandle {
            connection,
            thread: Some(thread),
        })
    }
}

/// Owner of a running connection thread.
///
/// Dropping the handle signals the thread to stop without joining it.
#[derive(Debug)]
pub struct ConnectionHandle {
    connection: Connection,
    thread: Option<JoinHandle<()>>,
}

impl ConnectionHandle {
    /// The connection driven by this handle.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Signals the thread to stop without waiting.
    pub fn shutdown(&self) {
        self.connection.close();
    }

    /// Signals the thread to stop and waits for it to exit.
    ///
    /// Must not be called from a handler, which runs on that thread; use
    /// [`Connection::close`] there.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ThreadPanic`] when the thread panicked.
    pub fn stop(mut self) -> Result<(), ClientError> {
        self.connection.close();
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| ClientError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Deref for ConnectionHandle {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.connection.close();
    }
}

fn run(connection: &Connection) {
    let config = connection.config();
    let reporter = connection.reporter();
    let mut attempt: u64 = 0;

    while !connection.is_closing() {
        attempt = attempt.saturating_add(1);
        connection.set_state(ConnectionState::Connecting);
        reporter.connecting(config.proxy(), attempt);

        match session::open(connection) {
            Ok(stream) => {
                connection.set_state(ConnectionState::Connected);
                reporter.connected(config.proxy(), config.relay());
                connection.registry().notify_connected(connection);
                let cause = session::read_loop(connection, stream);
                connection.end_session();
                connection.set_state(ConnectionState::Disconnected);
                if connection.is_closing() {
                    break;
                }
                reporter.disconnected(config.proxy(), &cause);
            }
            Err(error) => {
                connection.end_session();
                connection.set_state(ConnectionState::Disconnected);
                if connection.is_closing() {
                    break;
                }
                reporter.connect_failed(config.proxy(), &error);
            }
        }

        reporter.retry_scheduled(config.proxy(), config.reconnect_delay());
        if !connection.wait_for_retry() {
            break;
        }
    }

    connection.set_state(ConnectionState::Disconnected);
    reporter.stopped(config.proxy());
}
