//! Operator tool for NSM relays.
//!
//! The watcher loads layered configuration, installs structured telemetry,
//! connects to the proxy and subscribes to the configured status and
//! configuration records. Every inbound update is logged until a termination
//! signal arrives; SIGHUP logs a snapshot of the cache.

mod bootstrap;
mod process;
mod report;
mod signals;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, StaticConfigLoader, SystemConfigLoader, Watcher, bootstrap_with,
};
pub use process::{RunError, run};
pub use report::{log_snapshot, log_update, summarise};
pub use signals::{ShutdownError, ShutdownSignal, SignalAction, SystemShutdownSignal};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};

#[cfg(test)]
mod tests;
