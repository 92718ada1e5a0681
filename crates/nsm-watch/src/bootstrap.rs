//! Watcher bootstrap: configuration, telemetry and the relay connection.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::{info, warn};

use nsm_client::{
    ClientError, Connection, ConnectionConfig, ConnectionHandle, NsmContext, ObserverId,
};
use nsm_config::Config;
use nsm_proto::RecordKind;

use crate::report;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the watcher configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader error when any configuration layer is invalid.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The update observer could not be attached.
    #[error("failed to attach update observer: {source}")]
    Observe {
        /// Underlying client error.
        #[source]
        source: ClientError,
    },
    /// The connection thread could not be started.
    #[error("failed to start connection: {source}")]
    Connect {
        /// Underlying client error.
        #[source]
        source: ClientError,
    },
}

/// A running watcher.
#[derive(Debug)]
pub struct Watcher {
    config: Config,
    context: NsmContext,
    handle: ConnectionHandle,
    observer: ObserverId,
    telemetry: TelemetryHandle,
}

impl Watcher {
    /// The resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Context holding the shared cache.
    #[must_use]
    pub const fn context(&self) -> &NsmContext {
        &self.context
    }

    /// The relay connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        self.handle.connection()
    }

    /// Settings of the installed telemetry subscriber.
    #[must_use]
    pub const fn telemetry(&self) -> &TelemetryHandle {
        &self.telemetry
    }

    /// Detaches the update observer and stops the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ThreadPanic`] when the connection thread
    /// panicked.
    pub fn stop(self) -> Result<(), ClientError> {
        self.context.cache().unobserve(self.observer);
        self.handle.stop()
    }
}

/// Bootstraps the watcher using the supplied loader.
///
/// Subscriptions from `watch_status` and `watch_config` are registered before
/// the connection starts, so the first session already seeds them.
///
/// # Errors
///
/// Returns [`BootstrapError`] describing the first step that failed.
pub fn bootstrap_with(loader: &dyn ConfigLoader) -> Result<Watcher, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    let context = NsmContext::new();
    let observer = context
        .cache()
        .observe(report::log_update)
        .map_err(|source| BootstrapError::Observe { source })?;

    let mut builder = context.connection(ConnectionConfig::from_config(&config));
    for (kind, watches, declared) in [
        (RecordKind::Status, config.status_watches(), config.watch_status.len()),
        (
            RecordKind::Configuration,
            config.config_watches(),
            config.watch_config.len(),
        ),
    ] {
        if watches.len() != declared {
            warn!(
                target: BOOTSTRAP_TARGET,
                %kind,
                skipped = declared.saturating_sub(watches.len()),
                "ignoring watch entries without a node:name separator"
            );
        }
        for (node, name) in watches {
            builder = builder.subscribe(kind, node, name);
        }
    }

    let handle = match builder.spawn() {
        Ok(handle) => handle,
        Err(source) => {
            context.cache().unobserve(observer);
            return Err(BootstrapError::Connect { source });
        }
    };
    info!(
        target: BOOTSTRAP_TARGET,
        node = config.node_name(),
        proxy = %config.proxy(),
        relay = %config.relay(),
        status_watches = config.watch_status.len(),
        config_watches = config.watch_config.len(),
        "watcher started"
    );

    Ok(Watcher {
        config,
        context,
        handle,
        observer,
        telemetry,
    })
}
