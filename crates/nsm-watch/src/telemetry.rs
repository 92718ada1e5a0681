//! Structured telemetry for the watcher.
//!
//! The process has one global subscriber. The first successful call installs
//! it and records the settings it was built from; later calls hand back that
//! record and warn when they asked for something else.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use nsm_config::{Config, LogFormat};

const TELEMETRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::telemetry");

static INSTALLED: OnceCell<TelemetryHandle> = OnceCell::new();

/// Settings of the installed subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryHandle {
    filter: String,
    format: LogFormat,
}

impl TelemetryHandle {
    pub(crate) fn new(filter: impl Into<String>, format: LogFormat) -> Self {
        Self {
            filter: filter.into(),
            format,
        }
    }

    /// Filter expression in effect.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Output format in effect.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }

    /// Whether `config` asks for exactly these settings.
    #[must_use]
    pub fn matches(&self, config: &Config) -> bool {
        self.filter == config.log_filter() && self.format == config.log_format()
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global subscriber on first use and returns its settings.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the filter expression is invalid
/// and [`TelemetryError::Subscriber`] when a foreign subscriber is installed.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let installed = INSTALLED.get_or_try_init(|| install(config))?;
    if !installed.matches(config) {
        warn!(
            target: TELEMETRY_TARGET,
            installed_filter = installed.filter(),
            installed_format = %installed.format(),
            requested_filter = config.log_filter(),
            requested_format = %config.log_format(),
            "telemetry already installed; keeping the first settings"
        );
    }
    Ok(installed.clone())
}

pub(crate) fn parse_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter(error.to_string()))
}

fn install(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let handle = TelemetryHandle::new(config.log_filter(), config.log_format());
    let filter = parse_filter(handle.filter())?;
    tracing::subscriber::set_global_default(subscriber(filter, handle.format()))
        .map_err(TelemetryError::Subscriber)?;
    Ok(handle)
}

/// Watcher output goes to stderr with thread names, since updates are logged
/// from observer and connection threads.
fn subscriber(filter: EnvFilter, format: LogFormat) -> Box<dyn Subscriber + Send + Sync> {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());
    match format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    }
}
