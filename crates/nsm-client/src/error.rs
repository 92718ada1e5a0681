//! Error types for the client runtime.

use std::error::Error as StdError;
use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use nsm_proto::{CodecError, ProtocolError};

/// Errors surfaced by connections, the cache and the context.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No session is live, so the message could not be sent.
    #[error("not connected to the relay")]
    NotConnected,

    /// The message could not be framed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Resolving the proxy address failed.
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve {
        /// The endpoint being resolved.
        endpoint: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Resolution succeeded without yielding an address.
    #[error("no addresses resolved for {endpoint}")]
    ResolveEmpty {
        /// The endpoint being resolved.
        endpoint: String,
    },

    /// Connecting to the proxy failed.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// The address that was dialled.
        addr: SocketAddr,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing the handshake failed.
    #[error("handshake failed: {source}")]
    Handshake {
        /// The underlying codec error.
        #[source]
        source: CodecError,
    },

    /// Writing a message to the live session failed.
    #[error("failed to send message: {source}")]
    Send {
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A background thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        /// Name of the thread.
        name: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The connection was asked to stop while a session was being opened.
    #[error("connection is closing")]
    Closing,

    /// The connection thread panicked.
    #[error("connection thread panicked")]
    ThreadPanic,
}

/// Failure reported by a [`Handler`](crate::Handler).
///
/// Handler failures are logged and isolated; they never stop the dispatch
/// pass or the connection.
#[derive(Debug, Error)]
#[error("handler failed: {source}")]
pub struct HandlerError {
    #[source]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl HandlerError {
    /// Wraps any error.
    pub fn new(source: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Builds an error from a message.
    #[must_use]
    pub fn msg(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<ClientError> for HandlerError {
    fn from(error: ClientError) -> Self {
        Self::new(error)
    }
}
