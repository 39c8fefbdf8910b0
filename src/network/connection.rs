//! Connection lifecycle around the receive thread
//!
//! `connect` and `disconnect` are idempotent and serialized by the lifecycle
//! lock, so at most one receive thread is ever live per manager. Session state
//! sits behind a separate lock that is never held while a thread is joined.
//! Status listeners are called after both are released, once per real
//! transition.

use parking_lot::Mutex;
use serde::Serialize;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::buffer::SharedMessageQueue;
use crate::config::NetworkConfig;
use crate::error::NetworkError;
use crate::network::events::{LinkEvents, SharedLinkEvents};
use crate::network::receiver::{DetectionReceiver, ReceiverShared, ReceiverStats, ReceiverStatsSnapshot};
use crate::network::udp::create_socket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// One bound socket and the thread reading it
struct Session {
    socket: Arc<UdpSocket>,
    receiver: DetectionReceiver,
    local_addr: SocketAddr,
}

struct Inner {
    state: ConnectionState,
    session: Option<Session>,
}

pub struct ConnectionManager {
    config: NetworkConfig,
    shared: ReceiverShared,
    lifecycle: Mutex<()>,
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    pub fn new(config: NetworkConfig, queue: SharedMessageQueue) -> Self {
        Self {
            config,
            shared: ReceiverShared {
                queue,
                events: Arc::new(LinkEvents::new()),
                stats: Arc::new(ReceiverStats::default()),
                active: Arc::new(AtomicUsize::new(0)),
            },
            lifecycle: Mutex::new(()),
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                session: None,
            }),
        }
    }

    /// Bind the socket and start receiving
    ///
    /// An existing session is fully torn down first. Failure is reported
    /// through the status listeners and the return value, never as a panic.
    pub fn connect(&self) -> bool {
        let lifecycle = self.lifecycle.lock();

        let previous = {
            let mut inner = self.inner.lock();
            inner.state = ConnectionState::Connecting;
            inner.session.take()
        };
        let closed_previous = previous.is_some();
        if let Some(session) = previous {
            self.close_session(session);
        }

        let connected = match self.open_session() {
            Ok(session) => {
                tracing::info!(
                    "UDP client started on {}, detection source {}:{}",
                    session.local_addr,
                    self.config.server_address,
                    self.config.server_port
                );
                let mut inner = self.inner.lock();
                inner.session = Some(session);
                inner.state = ConnectionState::Connected;
                true
            }
            Err(e) => {
                tracing::error!("Failed to start UDP client: {}", e);
                self.inner.lock().state = ConnectionState::Disconnected;
                false
            }
        };
        drop(lifecycle);

        for status in connect_transitions(closed_previous, connected) {
            self.shared.events.emit_status(status);
        }
        connected
    }

    /// Stop receiving, release the socket and drop queued messages
    ///
    /// Safe to call at any time. Returns `true` if a live session was closed;
    /// only then is the disconnected status raised.
    pub fn disconnect(&self) -> bool {
        let lifecycle = self.lifecycle.lock();

        let session = {
            let mut inner = self.inner.lock();
            inner.state = ConnectionState::Disconnected;
            inner.session.take()
        };
        let closed = session.is_some();
        if let Some(session) = session {
            self.close_session(session);
        }

        // Stale data from a previous session is never delivered
        self.shared.queue.clear();
        drop(lifecycle);

        if closed {
            tracing::info!("UDP client disconnected");
            self.shared.events.emit_status(false);
        }
        closed
    }

    /// Send text to the detection source from the listening socket
    pub fn send(&self, message: &str) -> Result<usize, NetworkError> {
        let socket = self
            .inner
            .lock()
            .session
            .as_ref()
            .map(|session| session.socket.clone())
            .ok_or(NetworkError::NotConnected)?;

        let endpoint = self
            .config
            .server_endpoint()
            .map_err(|e| NetworkError::InvalidAddress(e.to_string()))?;

        socket.send_to(message.as_bytes(), endpoint).map_err(|e| {
            tracing::error!("Failed to send UDP data: {}", e);
            NetworkError::SendFailed(e.to_string())
        })
    }

    fn open_session(&self) -> Result<Session, NetworkError> {
        let socket = Arc::new(create_socket(&self.config)?);
        let local_addr = socket.local_addr().map_err(|e| NetworkError::BindFailed {
            port: self.config.local_port,
            reason: e.to_string(),
        })?;

        let receiver = DetectionReceiver::start(&socket, self.shared.clone(), &self.config)?;

        Ok(Session {
            socket,
            receiver,
            local_addr,
        })
    }

    /// Stop the thread, then drop the only strong socket handle
    ///
    /// Runs without `inner` held, so listeners on the receive thread can
    /// still query the manager while it is being joined.
    fn close_session(&self, mut session: Session) {
        session.receiver.stop(self.config.join_timeout());
        drop(session.socket);
        self.shared.queue.clear();
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Bound local address of the live session
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.lock().session.as_ref().map(|s| s.local_addr)
    }

    /// Receive threads currently alive, including detached ones
    pub fn active_receivers(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }

    pub fn receiver_stats(&self) -> ReceiverStatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn events(&self) -> &SharedLinkEvents {
        &self.shared.events
    }

    pub fn queue(&self) -> &SharedMessageQueue {
        &self.shared.queue
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }
}

/// Status notifications raised by one `connect` call
fn connect_transitions(closed_previous: bool, connected: bool) -> Vec<bool> {
    let mut transitions = Vec::with_capacity(2);
    if closed_previous {
        transitions.push(false);
    }
    // A failed rebind after a teardown is not a second transition
    if connected || !closed_previous {
        transitions.push(connected);
    }
    transitions
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}
