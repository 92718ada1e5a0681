//! One relay session: dial, handshake and read loop.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace};

use nsm_config::Endpoint;
use nsm_proto::{CodecError, Message, ProtocolError, WireReader, WireWriter};

use super::{CONNECTION_TARGET, Connection, ConnectionConfig};
use crate::error::ClientError;

/// Dials the proxy and writes the handshake.
///
/// The write half is published only after the handshake is flushed, so no
/// concurrent send can precede it. Returns the read half.
pub(super) fn open(connection: &Connection) -> Result<TcpStream, ClientError> {
    let config = connection.config();
    let stream = dial(config.proxy(), config.connect_timeout())?;
    if let Err(error) = stream.set_nodelay(true) {
        debug!(target: CONNECTION_TARGET, error = %error, "TCP_NODELAY not applied");
    }

    let addr = stream
        .peer_addr()
        .map_err(|source| ClientError::Resolve {
            endpoint: config.proxy().to_string(),
            source,
        })?;
    let clone = |original: &TcpStream| {
        original
            .try_clone()
            .map_err(|source| ClientError::Connect { addr, source })
    };
    connection.publish_control(clone(&stream)?)?;

    let writer = clone(&stream)?;
    handshake(&writer, config).map_err(|source| ClientError::Handshake { source })?;
    connection.publish_writer(writer);
    Ok(stream)
}

fn dial(endpoint: &Endpoint, timeout: Duration) -> Result<TcpStream, ClientError> {
    let addrs = (endpoint.host(), endpoint.port())
        .to_socket_addrs()
        .map_err(|source| ClientError::Resolve {
            endpoint: endpoint.to_string(),
            source,
        })?;
    let mut last_error = None;
    for addr in addrs {
        let attempt = if timeout.is_zero() {
            TcpStream::connect(addr)
        } else {
            TcpStream::connect_timeout(&addr, timeout)
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(source) => last_error = Some(ClientError::Connect { addr, source }),
        }
    }
    Err(last_error.unwrap_or_else(|| ClientError::ResolveEmpty {
        endpoint: endpoint.to_string(),
    }))
}

/// Node name, relay host and relay port, in that order.
fn handshake(stream: &TcpStream, config: &ConnectionConfig) -> Result<(), CodecError> {
    let mut writer = WireWriter::new(BufWriter::new(stream));
    writer.write_string(config.node_name())?;
    writer.write_string(config.relay().host())?;
    writer.write_int(i32::from(config.relay().port()))?;
    writer.flush()
}

/// Decodes and dispatches messages until the stream fails. Returns the
/// error that ended the session.
pub(super) fn read_loop(connection: &Connection, stream: TcpStream) -> ProtocolError {
    let mut reader = WireReader::new(BufReader::new(stream));
    loop {
        match Message::decode(&mut reader) {
            Ok(message) => {
                trace!(
                    target: CONNECTION_TARGET,
                    command = %message.command(),
                    node = message.node(),
                    "received message"
                );
                let report = connection.dispatcher().dispatch(message, connection);
                trace!(
                    target: CONNECTION_TARGET,
                    invoked = report.invoked,
                    consumed = report.consumed,
                    failed = report.failed,
                    "dispatched message"
                );
            }
            Err(error) => return error,
        }
    }
}
