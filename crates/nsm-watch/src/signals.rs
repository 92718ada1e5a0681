//! Operator signals.
//!
//! SIGHUP asks for a snapshot of the cache and leaves the watcher running.
//! SIGTERM, SIGINT and SIGQUIT stop it.

use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

const SIGNAL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::signals");

/// How the watcher reacts to a delivered signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Log the cached records and keep watching.
    Snapshot,
    /// Stop the watcher.
    Stop,
}

impl SignalAction {
    /// Reaction to signal number `signal`.
    #[must_use]
    pub const fn for_signal(signal: i32) -> Self {
        if signal == SIGHUP {
            Self::Snapshot
        } else {
            Self::Stop
        }
    }
}

/// Source of operator requests while the watcher runs.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until the watcher should stop, calling `snapshot` for every
    /// snapshot request received in the meantime.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the listener cannot be installed.
    fn wait(&self, snapshot: &mut dyn FnMut()) -> Result<(), ShutdownError>;
}

/// Errors reported by signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Listens for SIGHUP, SIGTERM, SIGINT and SIGQUIT.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self, snapshot: &mut dyn FnMut()) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGHUP, SIGTERM, SIGINT, SIGQUIT])
            .map_err(|source| ShutdownError::Install { source })?;
        for signal in signals.forever() {
            match SignalAction::for_signal(signal) {
                SignalAction::Snapshot => {
                    info!(target: SIGNAL_TARGET, signal, "cache snapshot requested");
                    snapshot();
                }
                SignalAction::Stop => {
                    info!(target: SIGNAL_TARGET, signal, "shutdown signal received");
                    break;
                }
            }
        }
        Ok(())
    }
}
