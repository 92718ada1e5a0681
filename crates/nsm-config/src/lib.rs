//! Shared configuration for the NSM monitoring client.
//!
//! Settings are layered by `ortho_config`: built-in defaults, then an optional
//! TOML file (`--config-path` or `NSM_CONFIG_PATH`), then `NSM_*` environment
//! variables, then command-line flags.

mod defaults;
mod endpoint;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_NODE_NAME, DEFAULT_PROXY_PORT,
    DEFAULT_RECONNECT_DELAY_MS, DEFAULT_RELAY_PORT, default_connect_timeout_ms,
    default_log_filter, default_log_filter_string, default_log_format, default_node_name,
    default_proxy, default_reconnect_delay_ms, default_relay,
};
pub use endpoint::{Endpoint, EndpointParseError};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime settings for a monitoring client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "NSM")]
pub struct Config {
    /// Node identity announced to the relay during the handshake.
    #[serde(default = "default_node_name")]
    #[ortho_config(default = default_node_name())]
    pub node_name: String,
    /// Socket proxy the client dials.
    #[serde(default = "default_proxy")]
    #[ortho_config(default = default_proxy())]
    pub proxy: Endpoint,
    /// Relay daemon the proxy forwards to, named in the handshake.
    #[serde(default = "default_relay")]
    #[ortho_config(default = default_relay())]
    pub relay: Endpoint,
    /// Fixed wait between reconnect attempts, in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    #[ortho_config(default = default_reconnect_delay_ms())]
    pub reconnect_delay_ms: u64,
    /// TCP connect timeout, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    #[ortho_config(default = default_connect_timeout_ms())]
    pub connect_timeout_ms: u64,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Status records requested from their owning node once connected, as
    /// `node:record` pairs.
    #[serde(default)]
    #[ortho_config(merge_strategy = "append")]
    pub watch_status: Vec<String>,
    /// Configuration objects requested once connected, as `node:object` pairs.
    #[serde(default)]
    #[ortho_config(merge_strategy = "append")]
    pub watch_config: Vec<String>,
}

impl Config {
    /// Node identity announced during the handshake.
    #[must_use]
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Socket proxy endpoint.
    #[must_use]
    pub const fn proxy(&self) -> &Endpoint {
        &self.proxy
    }

    /// Relay endpoint named in the handshake.
    #[must_use]
    pub const fn relay(&self) -> &Endpoint {
        &self.relay
    }

    /// Delay between reconnect attempts.
    #[must_use]
    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Status subscriptions split into `(node, record)` pairs.
    ///
    /// Entries without a `:` separator are skipped.
    #[must_use]
    pub fn status_watches(&self) -> Vec<(&str, &str)> {
        split_watches(&self.watch_status)
    }

    /// Configuration subscriptions split into `(node, object)` pairs.
    #[must_use]
    pub fn config_watches(&self) -> Vec<(&str, &str)> {
        split_watches(&self.watch_config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            proxy: default_proxy(),
            relay: default_relay(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            watch_status: Vec::new(),
            watch_config: Vec::new(),
        }
    }
}

fn split_watches(entries: &[String]) -> Vec<(&str, &str)> {
    entries
        .iter()
        .filter_map(|entry| entry.split_once(':'))
        .map(|(node, name)| (node.trim(), name.trim()))
        .filter(|(node, name)| !node.is_empty() && !name.is_empty())
        .collect()
}
