//! In-process relay double that records handshakes and client messages.

use std::collections::VecDeque;
use std::io::{BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nsm_config::Endpoint;
use nsm_proto::{Message, WireReader};

/// What the relay does with one accepted session after the handshake.
#[derive(Debug, Clone)]
pub enum SessionPlan {
    /// Close the socket.
    Drop,
    /// Decode client messages until the stream ends.
    Hold,
    /// Write raw bytes, then hold.
    Send(Vec<u8>),
    /// Decode this many client messages, then close the socket.
    CloseAfter(usize),
    /// Stop reading so the client's socket buffers fill up.
    Stall,
}

/// Handshake values read from one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub node: String,
    pub host: String,
    pub port: i32,
}

#[derive(Default)]
struct RelayLog {
    plans: Mutex<VecDeque<SessionPlan>>,
    handshakes: Mutex<Vec<Handshake>>,
    messages: Mutex<Vec<(usize, Message)>>,
    streams: Mutex<Vec<TcpStream>>,
    sessions: Mutex<Vec<JoinHandle<()>>>,
}

impl RelayLog {
    fn next_plan(&self) -> SessionPlan {
        self.plans
            .lock()
            .expect("plans lock")
            .pop_front()
            .unwrap_or(SessionPlan::Hold)
    }
}

/// Relay bound to an ephemeral loopback port.
pub struct FakeRelay {
    addr: SocketAddr,
    log: Arc<RelayLog>,
    running: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<()>>,
}

impl FakeRelay {
    /// Starts accepting. Sessions follow `plans` in order, then hold.
    pub fn start(plans: impl IntoIterator<Item = SessionPlan>) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind relay");
        listener.set_nonblocking(true).expect("nonblocking relay");
        let addr = listener.local_addr().expect("relay addr");
        let log = Arc::new(RelayLog {
            plans: Mutex::new(plans.into_iter().collect()),
            ..RelayLog::default()
        });
        let running = Arc::new(AtomicBool::new(true));
        let acceptor = {
            let log = Arc::clone(&log);
            let running = Arc::clone(&running);
            thread::spawn(move || accept_loop(&listener, &log, &running))
        };
        Self {
            addr,
            log,
            running,
            acceptor: Some(acceptor),
        }
    }

    /// Endpoint clients should dial.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.addr.ip().to_string(), self.addr.port())
    }

    pub fn handshakes(&self) -> Vec<Handshake> {
        self.log.handshakes.lock().expect("handshakes lock").clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.log
            .messages
            .lock()
            .expect("messages lock")
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Messages decoded on the `session`-th handshaken session.
    pub fn session_messages(&self, session: usize) -> Vec<Message> {
        self.log
            .messages
            .lock()
            .expect("messages lock")
            .iter()
            .filter(|(index, _)| *index == session)
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Writes `bytes` to the newest session.
    pub fn push(&self, bytes: &[u8]) {
        let streams = self.log.streams.lock().expect("streams lock");
        let mut stream = streams.last().expect("a live session");
        stream.write_all(bytes).expect("push bytes");
        stream.flush().expect("flush push");
    }
}

impl Drop for FakeRelay {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(acceptor) = self.acceptor.take() {
            let _ = acceptor.join();
        }
        for stream in self.log.streams.lock().expect("streams lock").drain(..) {
            let _ = stream.shutdown(Shutdown::Both);
        }
        let sessions: Vec<_> = self
            .log
            .sessions
            .lock()
            .expect("sessions lock")
            .drain(..)
            .collect();
        for session in sessions {
            let _ = session.join();
        }
    }
}

fn accept_loop(listener: &TcpListener, log: &Arc<RelayLog>, running: &Arc<AtomicBool>) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false).expect("blocking session");
                let writer = stream.try_clone().expect("clone session");
                log.streams.lock().expect("streams lock").push(writer);
                let session_log = Arc::clone(log);
                let session_running = Arc::clone(running);
                let session = thread::spawn(move || serve(stream, &session_log, &session_running));
                log.sessions.lock().expect("sessions lock").push(session);
            }
            Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(_) => break,
        }
    }
}

fn serve(stream: TcpStream, log: &RelayLog, running: &AtomicBool) {
    let mut reader = WireReader::new(BufReader::new(
        stream.try_clone().expect("clone session reader"),
    ));
    let Ok(handshake) = read_handshake(&mut reader) else {
        return;
    };
    let session = {
        let mut handshakes = log.handshakes.lock().expect("handshakes lock");
        handshakes.push(handshake);
        handshakes.len() - 1
    };

    let mut limit = None;
    match log.next_plan() {
        SessionPlan::Drop => {
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }
        SessionPlan::Send(bytes) => {
            let mut writer = &stream;
            if writer.write_all(&bytes).and_then(|()| writer.flush()).is_err() {
                return;
            }
        }
        SessionPlan::CloseAfter(count) => limit = Some(count),
        SessionPlan::Stall => {
            while running.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(10));
            }
            return;
        }
        SessionPlan::Hold => {}
    }

    let mut decoded = 0;
    while limit.is_none_or(|count| decoded < count) {
        let Ok(message) = Message::decode(&mut reader) else {
            return;
        };
        log.messages
            .lock()
            .expect("messages lock")
            .push((session, message));
        decoded += 1;
    }
    let _ = stream.shutdown(Shutdown::Both);
}

fn read_handshake<R: std::io::Read>(
    reader: &mut WireReader<R>,
) -> Result<Handshake, nsm_proto::CodecError> {
    Ok(Handshake {
        node: reader.read_string()?,
        host: reader.read_string()?,
        port: reader.read_int()?,
    })
}
