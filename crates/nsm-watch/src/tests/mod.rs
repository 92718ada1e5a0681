//! Tests for the watcher bootstrap and process loop.

use std::ffi::OsString;
use std::io::{BufReader, Read};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use rstest::{fixture, rstest};

use nsm_config::{Config, Endpoint, LogFormat};
use nsm_proto::{CodecError, Command, Message, WireReader};

use crate::bootstrap::{BootstrapError, ConfigLoader, StaticConfigLoader, bootstrap_with};
use crate::process::run;
use crate::signals::{ShutdownError, ShutdownSignal, SignalAction};
use crate::telemetry::{TelemetryError, TelemetryHandle, parse_filter};

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// What the relay double saw on its first session.
#[derive(Debug)]
enum Seen {
    Handshake { node: String, host: String, port: i32 },
    Message(Message),
}

struct Relay {
    endpoint: Endpoint,
    seen: Receiver<Seen>,
}

impl Relay {
    fn next(&self) -> Seen {
        self.seen
            .recv_timeout(RECEIVE_TIMEOUT)
            .expect("relay should observe traffic")
    }
}

/// Accepts one session and reports its handshake and messages.
#[fixture]
fn relay() -> Relay {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind relay");
    let addr = listener.local_addr().expect("relay addr");
    let (sender, seen) = mpsc::channel();
    thread::spawn(move || {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        serve(&stream, &sender);
    });
    Relay {
        endpoint: Endpoint::new(addr.ip().to_string(), addr.port()),
        seen,
    }
}

fn serve(stream: &TcpStream, sender: &mpsc::Sender<Seen>) {
    let mut reader = WireReader::new(BufReader::new(stream));
    let Ok(handshake) = read_handshake(&mut reader) else {
        return;
    };
    if sender.send(handshake).is_err() {
        return;
    }
    while let Ok(message) = Message::decode(&mut reader) {
        if sender.send(Seen::Message(message)).is_err() {
            return;
        }
    }
}

fn read_handshake<R: Read>(reader: &mut WireReader<R>) -> Result<Seen, CodecError> {
    Ok(Seen::Handshake {
        node: reader.read_string()?,
        host: reader.read_string()?,
        port: reader.read_int()?,
    })
}

fn watch_config(proxy: Endpoint) -> Config {
    Config {
        node_name: "WATCHER".to_owned(),
        proxy,
        relay: Endpoint::new("relay.example", 8122),
        reconnect_delay_ms: 20,
        connect_timeout_ms: 500,
        watch_status: vec!["ECL01:ECL01".to_owned(), "malformed".to_owned()],
        watch_config: vec!["daq:daq_conf".to_owned()],
        ..Config::default()
    }
}

/// Replays a fixed sequence of operator requests, then stops.
struct ScriptedSignals {
    snapshots: usize,
    delivered: AtomicUsize,
}

impl ScriptedSignals {
    const fn new(snapshots: usize) -> Self {
        Self {
            snapshots,
            delivered: AtomicUsize::new(0),
        }
    }
}

impl ShutdownSignal for ScriptedSignals {
    fn wait(&self, snapshot: &mut dyn FnMut()) -> Result<(), ShutdownError> {
        for _ in 0..self.snapshots {
            snapshot();
            self.delivered.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("nsm-watch"),
            OsString::from("--reconnect-delay-ms"),
            OsString::from("soon"),
        ])
    }
}

#[rstest]
fn bootstrap_connects_and_seeds_subscriptions(relay: Relay) {
    let loader = StaticConfigLoader::new(watch_config(relay.endpoint.clone()));
    let watcher = bootstrap_with(&loader).expect("bootstrap");

    match relay.next() {
        Seen::Handshake { node, host, port } => {
            assert_eq!(node, "WATCHER");
            assert_eq!(host, "relay.example");
            assert_eq!(port, 8122);
        }
        Seen::Message(message) => panic!("expected handshake, got {message:?}"),
    }

    let mut requests = Vec::new();
    for _ in 0..2 {
        let Seen::Message(message) = relay.next() else {
            panic!("expected a request");
        };
        requests.push((
            message.command().clone(),
            message.node().to_owned(),
            message.payload().to_owned(),
        ));
    }
    requests.sort_by_key(|(command, _, _)| command.id());
    assert_eq!(
        requests,
        vec![
            (Command::StatusGet, "ECL01".to_owned(), "ECL01".to_owned()),
            (Command::ConfigGet, "daq".to_owned(), "daq_conf".to_owned()),
        ]
    );

    assert_eq!(watcher.config().node_name(), "WATCHER");
    watcher.stop().expect("watcher stops");
}

#[rstest]
fn run_stops_after_the_shutdown_signal(relay: Relay) {
    let loader = StaticConfigLoader::new(watch_config(relay.endpoint.clone()));

    run(&loader, &ScriptedSignals::new(0)).expect("run completes");
}

#[rstest]
fn snapshot_requests_keep_the_watcher_running(relay: Relay) {
    let loader = StaticConfigLoader::new(watch_config(relay.endpoint.clone()));
    let signals = ScriptedSignals::new(2);

    run(&loader, &signals).expect("run completes");

    assert_eq!(signals.delivered.load(Ordering::SeqCst), 2);
}

#[rstest]
#[case(signal_hook::consts::signal::SIGHUP, SignalAction::Snapshot)]
#[case(signal_hook::consts::signal::SIGTERM, SignalAction::Stop)]
#[case(signal_hook::consts::signal::SIGINT, SignalAction::Stop)]
#[case(signal_hook::consts::signal::SIGQUIT, SignalAction::Stop)]
fn signals_map_to_watcher_actions(#[case] signal: i32, #[case] expected: SignalAction) {
    assert_eq!(SignalAction::for_signal(signal), expected);
}

#[rstest]
fn telemetry_handles_match_only_their_own_settings() {
    let handle = TelemetryHandle::new("nsm_client=debug,info", LogFormat::Json);
    let same = Config {
        log_filter: "nsm_client=debug,info".to_owned(),
        log_format: LogFormat::Json,
        ..Config::default()
    };
    let other_format = Config {
        log_format: LogFormat::Compact,
        ..same.clone()
    };

    assert!(handle.matches(&same));
    assert!(!handle.matches(&other_format));
}

#[rstest]
fn configuration_errors_abort_bootstrap() {
    let error = bootstrap_with(&FailingConfigLoader).expect_err("bootstrap should fail");

    assert!(matches!(error, BootstrapError::Configuration { .. }));
}

#[rstest]
#[case("info")]
#[case("nsm_client=debug,warn")]
fn accepts_valid_filters(#[case] expression: &str) {
    assert!(parse_filter(expression).is_ok());
}

#[rstest]
fn rejects_invalid_filters() {
    let error = parse_filter("nsm_client=loud").expect_err("invalid level");

    assert!(matches!(error, TelemetryError::Filter(_)));
}
