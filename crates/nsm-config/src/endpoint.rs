use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// A TCP endpoint named by host and port.
///
/// Endpoints accept `tcp://host:port` and bare `host:port` spellings, and may
/// appear in configuration files either as a string or as a
/// `{ host = "...", port = ... }` table.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(try_from = "EndpointRepr", into = "String")]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Builds an endpoint from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "tcp://{}:{}", self.host, self.port)
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EndpointParseError::Empty);
        }
        let candidate = if trimmed.contains("://") {
            trimmed.to_owned()
        } else {
            format!("tcp://{trimmed}")
        };

        let url = Url::parse(&candidate)?;
        if url.scheme() != "tcp" {
            return Err(EndpointParseError::UnsupportedScheme(
                url.scheme().to_owned(),
            ));
        }
        let host = url
            .host_str()
            .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;
        let port = url
            .port()
            .ok_or_else(|| EndpointParseError::MissingPort(input.to_owned()))?;
        Ok(Self::new(host, port))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EndpointRepr {
    Text(String),
    Table { host: String, port: u16 },
}

impl TryFrom<EndpointRepr> for Endpoint {
    type Error = EndpointParseError;

    fn try_from(repr: EndpointRepr) -> Result<Self, Self::Error> {
        match repr {
            EndpointRepr::Text(text) => text.parse(),
            EndpointRepr::Table { host, port } => {
                if host.trim().is_empty() {
                    return Err(EndpointParseError::Empty);
                }
                Ok(Self::new(host, port))
            }
        }
    }
}

/// Errors encountered while parsing an [`Endpoint`] from text.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// The endpoint text was blank.
    #[error("endpoint must not be empty")]
    Empty,
    /// Scheme was not `tcp`.
    #[error("unsupported endpoint scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing host in '{0}'")]
    MissingHost(String),
    /// Port was missing from the address.
    #[error("missing port in '{0}'")]
    MissingPort(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("tcp://daq-relay:9090", "daq-relay", 9090)]
    #[case("127.0.0.1:8122", "127.0.0.1", 8122)]
    #[case("  ropc01:50000 ", "ropc01", 50000)]
    fn parses_endpoints(#[case] input: &str, #[case] host: &str, #[case] port: u16) {
        let endpoint: Endpoint = input.parse().expect("endpoint should parse");
        assert_eq!(endpoint.host(), host);
        assert_eq!(endpoint.port(), port);
    }

    #[rstest]
    #[case("")]
    #[case("udp://relay:9090")]
    #[case("tcp://relay")]
    fn rejects_invalid_endpoints(#[case] input: &str) {
        assert!(input.parse::<Endpoint>().is_err(), "{input:?} should fail");
    }

    #[test]
    fn displays_as_tcp_url() {
        assert_eq!(Endpoint::new("relay", 9090).to_string(), "tcp://relay:9090");
    }
}
