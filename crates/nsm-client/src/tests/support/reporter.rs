//! Test double for [`LifecycleReporter`] that records events for assertions.

use std::sync::Mutex;
use std::time::Duration;

use nsm_config::Endpoint;
use nsm_proto::ProtocolError;

use crate::{ClientError, LifecycleReporter};

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connecting(u64),
    Connected,
    ConnectFailed(String),
    Disconnected { transport: bool },
    RetryScheduled,
    Stopped,
}

/// Records lifecycle events.
#[derive(Debug, Default)]
pub struct RecordingLifecycleReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingLifecycleReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().expect("reporter mutex poisoned").clone()
    }

    /// Counts events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&LifecycleEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn connecting(&self, _proxy: &Endpoint, attempt: u64) {
        self.record(LifecycleEvent::Connecting(attempt));
    }

    fn connected(&self, _proxy: &Endpoint, _relay: &Endpoint) {
        self.record(LifecycleEvent::Connected);
    }

    fn connect_failed(&self, _proxy: &Endpoint, error: &ClientError) {
        self.record(LifecycleEvent::ConnectFailed(error.to_string()));
    }

    fn disconnected(&self, _proxy: &Endpoint, cause: &ProtocolError) {
        self.record(LifecycleEvent::Disconnected {
            transport: cause.is_transport(),
        });
    }

    fn retry_scheduled(&self, _proxy: &Endpoint, _delay: Duration) {
        self.record(LifecycleEvent::RetryScheduled);
    }

    fn stopped(&self, _proxy: &Endpoint) {
        self.record(LifecycleEvent::Stopped);
    }
}
