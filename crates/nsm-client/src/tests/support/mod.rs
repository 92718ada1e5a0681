//! Shared harness for the client behavioural suites.

mod relay;
mod reporter;

use std::time::{Duration, Instant};

use nsm_config::Endpoint;

use crate::ConnectionConfig;

pub use relay::{FakeRelay, Handshake, SessionPlan};
pub use reporter::{LifecycleEvent, RecordingLifecycleReporter};

pub const NODE_NAME: &str = "TESTER";
pub const RELAY_HOST: &str = "relay.example";
pub const RELAY_PORT: u16 = 8122;

/// Connection settings with short timings suited to tests.
pub fn test_config(proxy: Endpoint) -> ConnectionConfig {
    ConnectionConfig::new(NODE_NAME, proxy, Endpoint::new(RELAY_HOST, RELAY_PORT))
        .with_reconnect_delay(Duration::from_millis(20))
        .with_connect_timeout(Duration::from_millis(500))
}

/// Polls `condition` until it holds or the deadline passes.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
