//! Handler trait and a closure-based builder.

use std::fmt;

use nsm_proto::{Command, Message};

use crate::connection::Connection;
use crate::error::HandlerError;

/// Callback registered against a connection.
///
/// `connected` runs once per established session; `handle` runs for every
/// dispatched message that [`Handler::accepts`]. Both run on the connection's
/// read thread, outside every registry lock, so they may send messages or
/// (un)register handlers through the [`Connection`].
pub trait Handler: Send + Sync {
    /// Invoked after each successful handshake.
    ///
    /// # Errors
    ///
    /// Failures are logged and do not affect other handlers.
    fn connected(&self, connection: &Connection) -> Result<(), HandlerError> {
        let _ = connection;
        Ok(())
    }

    /// Handles a message. Returning `true` marks it consumed, which removes
    /// handlers whose [`Handler::once`] is set.
    ///
    /// # Errors
    ///
    /// Failures are logged and do not affect other handlers.
    fn handle(&self, message: &Message, connection: &Connection) -> Result<bool, HandlerError>;

    /// Whether the handler is removed after it first consumes a message.
    fn once(&self) -> bool {
        false
    }

    /// Whether `handle` should run for this message.
    fn accepts(&self, message: &Message) -> bool {
        let _ = message;
        true
    }
}

type ConnectedFn = dyn Fn(&Connection) -> Result<(), HandlerError> + Send + Sync;
type MessageFn = dyn Fn(&Message, &Connection) -> Result<bool, HandlerError> + Send + Sync;

/// Builds handlers from closures, filtered by command and node.
///
/// ```ignore
/// let handler = HandlerBuilder::new()
///     .command(Command::StatusSet)
///     .node("ECL01")
///     .on_message(|message, _| Ok(message.record().is_some()))
///     .build();
/// ```
#[derive(Default)]
pub struct HandlerBuilder {
    command: Option<Command>,
    node: Option<String>,
    once: bool,
    on_connected: Option<Box<ConnectedFn>>,
    on_message: Option<Box<MessageFn>>,
}

impl HandlerBuilder {
    /// Starts a handler that accepts every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts only messages with this command.
    #[must_use]
    pub fn command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    /// Accepts only messages from or for this node.
    #[must_use]
    pub fn node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// Removes the handler after it first consumes a message.
    #[must_use]
    pub const fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Runs `callback` after each handshake.
    #[must_use]
    pub fn on_connected<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Connection) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.on_connected = Some(Box::new(callback));
        self
    }

    /// Runs `callback` for accepted messages.
    #[must_use]
    pub fn on_message<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Message, &Connection) -> Result<bool, HandlerError> + Send + Sync + 'static,
    {
        self.on_message = Some(Box::new(callback));
        self
    }

    /// Finishes the handler.
    #[must_use]
    pub fn build(self) -> FnHandler {
        FnHandler {
            command: self.command,
            node: self.node,
            once: self.once,
            on_connected: self.on_connected,
            on_message: self.on_message,
        }
    }
}

/// Handler assembled by [`HandlerBuilder`].
pub struct FnHandler {
    command: Option<Command>,
    node: Option<String>,
    once: bool,
    on_connected: Option<Box<ConnectedFn>>,
    on_message: Option<Box<MessageFn>>,
}

impl fmt::Debug for FnHandler {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FnHandler")
            .field("command", &self.command)
            .field("node", &self.node)
            .field("once", &self.once)
            .finish_non_exhaustive()
    }
}

impl Handler for FnHandler {
    fn connected(&self, connection: &Connection) -> Result<(), HandlerError> {
        self.on_connected
            .as_ref()
            .map_or(Ok(()), |callback| callback(connection))
    }

    fn handle(&self, message: &Message, connection: &Connection) -> Result<bool, HandlerError> {
        self.on_message
            .as_ref()
            .map_or(Ok(false), |callback| callback(message, connection))
    }

    fn once(&self) -> bool {
        self.once
    }

    fn accepts(&self, message: &Message) -> bool {
        let command_matches = self
            .command
            .as_ref()
            .is_none_or(|command| command == message.command());
        let node_matches = self
            .node
            .as_deref()
            .is_none_or(|node| node.eq_ignore_ascii_case(message.node()));
        command_matches && node_matches
    }
}
