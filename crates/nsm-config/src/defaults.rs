use crate::endpoint::Endpoint;
use crate::logging::LogFormat;

/// Default TCP port of the socket proxy that fronts the NSM relay.
pub const DEFAULT_PROXY_PORT: u16 = 9090;

/// Default port of the NSM relay daemon named in the handshake.
pub const DEFAULT_RELAY_PORT: u16 = 8122;

/// Default node identity announced during the handshake.
pub const DEFAULT_NODE_NAME: &str = "NSMWATCH";

/// Default delay between reconnect attempts, in milliseconds.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;

/// Default TCP connect timeout, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3_000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default node identity as an owned string (used by serde).
#[must_use]
pub fn default_node_name() -> String {
    DEFAULT_NODE_NAME.to_owned()
}

/// Default endpoint of the socket proxy.
#[must_use]
pub fn default_proxy() -> Endpoint {
    Endpoint::new("localhost", DEFAULT_PROXY_PORT)
}

/// Default relay endpoint forwarded in the handshake.
#[must_use]
pub fn default_relay() -> Endpoint {
    Endpoint::new("localhost", DEFAULT_RELAY_PORT)
}

/// Default reconnect delay.
#[must_use]
pub const fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY_MS
}

/// Default connect timeout.
#[must_use]
pub const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
