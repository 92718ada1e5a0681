//! Process entry point: bootstrap, wait for a signal, stop.

use thiserror::Error;
use tracing::info;

use nsm_client::ClientError;

use crate::bootstrap::{BootstrapError, ConfigLoader, bootstrap_with};
use crate::report;
use crate::signals::{ShutdownError, ShutdownSignal};

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Errors that end the watcher process.
#[derive(Debug, Error)]
pub enum RunError {
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// Waiting for the termination signal failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    /// The connection did not stop cleanly.
    #[error("failed to stop connection: {source}")]
    Stop {
        /// Underlying client error.
        #[source]
        source: ClientError,
    },
}

/// Runs the watcher until `shutdown` fires, logging a cache snapshot for
/// every snapshot request in between.
///
/// The connection is stopped even when waiting for the signal fails.
///
/// # Errors
///
/// Returns [`RunError`] when bootstrap, signal handling or shutdown fails.
pub fn run(loader: &dyn ConfigLoader, shutdown: &dyn ShutdownSignal) -> Result<(), RunError> {
    let watcher = bootstrap_with(loader)?;
    let waited = shutdown.wait(&mut || {
        report::log_snapshot(watcher.context().cache());
    });
    info!(target: PROCESS_TARGET, "stopping watcher");
    watcher.stop().map_err(|source| RunError::Stop { source })?;
    waited?;
    Ok(())
}
