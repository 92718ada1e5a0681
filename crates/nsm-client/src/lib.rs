//! Client runtime for the NSM relay protocol.
//!
//! A [`Connection`] keeps one TCP session to a proxy alive, writing the
//! handshake on every connect and reconnecting after a fixed delay whenever
//! the session fails. Decoded messages flow through the dispatcher: trailing
//! records are cached in the [`ListenerCache`], every message is fanned out to
//! observers, and accepting [`Handler`]s are invoked outside every lock.
//!
//! ```ignore
//! let context = NsmContext::new();
//! let handle = context
//!     .connection(ConnectionConfig::from_config(&config))
//!     .subscribe(RecordKind::Status, "ECL01", "ECL01")
//!     .spawn()?;
//! let status = context.cache().status("ECL01");
//! handle.stop()?;
//! ```

mod cache;
mod connection;
mod context;
mod dispatch;
mod error;

pub use cache::{CachedRecord, ListenerCache, ObserverId};
pub use connection::{
    Connection, ConnectionBuilder, ConnectionConfig, ConnectionHandle, ConnectionState,
    LifecycleReporter, StructuredLifecycleReporter,
};
pub use context::NsmContext;
pub use dispatch::{
    DispatchReport, Dispatcher, FnHandler, Handler, HandlerBuilder, HandlerId, HandlerRegistry,
};
pub use error::{ClientError, HandlerError};

#[cfg(test)]
mod tests;
