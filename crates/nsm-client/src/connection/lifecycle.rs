//! Structured reporting for connection lifecycle events.

use std::sync::Arc;
use std::time::Duration;

use nsm_config::Endpoint;
use nsm_proto::ProtocolError;

use crate::error::ClientError;

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Observer of connection state transitions.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked before each connection attempt.
    fn connecting(&self, proxy: &Endpoint, attempt: u64);

    /// Invoked once the handshake has been written.
    fn connected(&self, proxy: &Endpoint, relay: &Endpoint);

    /// Invoked when a connection attempt fails.
    fn connect_failed(&self, proxy: &Endpoint, error: &ClientError);

    /// Invoked when a live session ends because of a read error.
    fn disconnected(&self, proxy: &Endpoint, cause: &ProtocolError);

    /// Invoked before waiting for the next attempt.
    fn retry_scheduled(&self, proxy: &Endpoint, delay: Duration);

    /// Invoked when the connection thread exits.
    fn stopped(&self, proxy: &Endpoint);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter + ?Sized,
{
    fn connecting(&self, proxy: &Endpoint, attempt: u64) {
        (**self).connecting(proxy, attempt);
    }

    fn connected(&self, proxy: &Endpoint, relay: &Endpoint) {
        (**self).connected(proxy, relay);
    }

    fn connect_failed(&self, proxy: &Endpoint, error: &ClientError) {
        (**self).connect_failed(proxy, error);
    }

    fn disconnected(&self, proxy: &Endpoint, cause: &ProtocolError) {
        (**self).disconnected(proxy, cause);
    }

    fn retry_scheduled(&self, proxy: &Endpoint, delay: Duration) {
        (**self).retry_scheduled(proxy, delay);
    }

    fn stopped(&self, proxy: &Endpoint) {
        (**self).stopped(proxy);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn connecting(&self, proxy: &Endpoint, attempt: u64) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            event = "connecting",
            proxy = %proxy,
            attempt,
            "connecting to proxy"
        );
    }

    fn connected(&self, proxy: &Endpoint, relay: &Endpoint) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "connected",
            proxy = %proxy,
            relay = %relay,
            "session established"
        );
    }

    fn connect_failed(&self, proxy: &Endpoint, error: &ClientError) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            event = "connect_failed",
            proxy = %proxy,
            error = %error,
            "connection attempt failed"
        );
    }

    fn disconnected(&self, proxy: &Endpoint, cause: &ProtocolError) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            event = "disconnected",
            proxy = %proxy,
            transport = cause.is_transport(),
            error = %cause,
            "session lost"
        );
    }

    fn retry_scheduled(&self, proxy: &Endpoint, delay: Duration) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            event = "retry_scheduled",
            proxy = %proxy,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "reconnect scheduled"
        );
    }

    fn stopped(&self, proxy: &Endpoint) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "stopped",
            proxy = %proxy,
            "connection stopped"
        );
    }
}
