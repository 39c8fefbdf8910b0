//! Detection receive thread
//!
//! Blocks on `recv_from` with a read timeout, pushes every datagram into the
//! shared queue and raises the message notification. The loop checks its
//! `running` flag at every timeout boundary, so a stop request is observed
//! within one receive timeout.
//!
//! The thread only holds a weak handle to the socket, upgraded for the span
//! of a single receive. Once the owner drops the socket and `stop` has woken
//! the pending receive, the port is free whether or not the thread has
//! exited yet.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::buffer::{RawMessage, SharedMessageQueue};
use crate::config::NetworkConfig;
use crate::error::NetworkError;
use crate::network::events::SharedLinkEvents;
use crate::network::udp::interrupt_receive;

/// Receive counters, updated by the receive thread
#[derive(Debug, Default)]
pub struct ReceiverStats {
    datagrams_received: AtomicU64,
    bytes_received: AtomicU64,
    receive_errors: AtomicU64,
}

impl ReceiverStats {
    pub fn snapshot(&self) -> ReceiverStatsSnapshot {
        ReceiverStatsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReceiverStatsSnapshot {
    pub datagrams_received: u64,
    pub bytes_received: u64,
    pub receive_errors: u64,
}

/// State shared between a receive thread and its owner
#[derive(Clone)]
pub struct ReceiverShared {
    pub queue: SharedMessageQueue,
    pub events: SharedLinkEvents,
    pub stats: Arc<ReceiverStats>,
    /// Number of receive threads currently alive
    pub active: Arc<AtomicUsize>,
}

/// What one `recv_from` call amounted to
#[derive(Debug)]
enum RecvOutcome {
    Datagram(usize, SocketAddr),
    Timeout,
    Shutdown,
    Transient(io::Error),
}

fn classify(result: io::Result<(usize, SocketAddr)>, running: &AtomicBool) -> RecvOutcome {
    match result {
        Ok((len, source)) => RecvOutcome::Datagram(len, source),
        // Anything that surfaces after a stop request, including the wakeup
        // from interrupt_receive, ends the loop
        Err(_) if !running.load(Ordering::Acquire) => RecvOutcome::Shutdown,
        Err(e) => match e.kind() {
            // Read timeout surfaces as WouldBlock on unix, TimedOut on windows
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => RecvOutcome::Timeout,
            // Stray signal while still running: retry at once
            io::ErrorKind::Interrupted => RecvOutcome::Timeout,
            _ => RecvOutcome::Transient(e),
        },
    }
}

/// Decrements the live-thread count and releases the exit channel, even if
/// the receive loop panics
struct ExitGuard {
    active: Arc<AtomicUsize>,
    _exited: Sender<()>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle to a running receive thread
pub struct DetectionReceiver {
    running: Arc<AtomicBool>,
    socket: Weak<UdpSocket>,
    thread_handle: Option<JoinHandle<()>>,
    exited_rx: Receiver<()>,
}

impl DetectionReceiver {
    /// Spawn the receive loop on a dedicated thread
    ///
    /// The caller keeps ownership of `socket`; dropping it after `stop`
    /// closes the port.
    pub fn start(
        socket: &Arc<UdpSocket>,
        shared: ReceiverShared,
        config: &NetworkConfig,
    ) -> Result<Self, NetworkError> {
        let running = Arc::new(AtomicBool::new(true));
        let (exited_tx, exited_rx) = bounded::<()>(1);

        let max_datagram_size = config.max_datagram_size;
        let error_backoff = config.error_backoff();

        shared.active.fetch_add(1, Ordering::SeqCst);
        let guard = ExitGuard {
            active: shared.active.clone(),
            _exited: exited_tx,
        };

        let loop_running = running.clone();
        let loop_socket = Arc::downgrade(socket);
        let handle = thread::Builder::new()
            .name("udp-detection-rx".to_string())
            .spawn(move || {
                let _guard = guard;
                let recv = |buf: &mut [u8]| -> Option<io::Result<(usize, SocketAddr)>> {
                    let socket = loop_socket.upgrade()?;
                    Some(socket.recv_from(buf))
                };
                receive_loop(recv, &shared, &loop_running, max_datagram_size, error_backoff);
            })
            // the unspawned closure is dropped with its guard, undoing the count
            .map_err(|e| NetworkError::ThreadSpawn(e.to_string()))?;

        Ok(Self {
            running,
            socket: Arc::downgrade(socket),
            thread_handle: Some(handle),
            exited_rx,
        })
    }

    /// Request the loop to stop and wait up to `join_timeout` for it
    ///
    /// A receive already in progress is woken immediately. Returns `true`
    /// if the thread exited in time. Otherwise the thread is detached; it
    /// holds no socket handle outside a receive call, so it cannot keep the
    /// port bound once the owner drops the socket.
    pub fn stop(&mut self, join_timeout: Duration) -> bool {
        self.running.store(false, Ordering::Release);
        if let Some(socket) = self.socket.upgrade() {
            interrupt_receive(&socket);
        }

        let Some(handle) = self.thread_handle.take() else {
            return true;
        };

        match self.exited_rx.recv_timeout(join_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    tracing::error!("UDP receive thread panicked");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "UDP receive thread did not stop within {:?}, detaching it",
                    join_timeout
                );
                false
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.thread_handle.is_some()
    }
}

impl Drop for DetectionReceiver {
    fn drop(&mut self) {
        self.stop(Duration::from_millis(crate::constants::DEFAULT_JOIN_TIMEOUT_MS));
    }
}

/// Runs until stopped or until `recv` reports the socket gone with `None`
fn receive_loop<F>(
    mut recv: F,
    shared: &ReceiverShared,
    running: &AtomicBool,
    max_datagram_size: usize,
    error_backoff: Duration,
) where
    F: FnMut(&mut [u8]) -> Option<io::Result<(usize, SocketAddr)>>,
{
    let mut buf = vec![0u8; max_datagram_size];

    while running.load(Ordering::Acquire) {
        let Some(result) = recv(&mut buf) else {
            break;
        };

        match classify(result, running) {
            RecvOutcome::Datagram(len, source) => {
                // Stopped while blocked: the queue may already be cleared
                if !running.load(Ordering::Acquire) {
                    break;
                }

                shared.stats.datagrams_received.fetch_add(1, Ordering::Relaxed);
                shared.stats.bytes_received.fetch_add(len as u64, Ordering::Relaxed);

                let text = String::from_utf8_lossy(&buf[..len]);
                let message = RawMessage::new(&*text).with_source(source);
                let payload = message.shared_payload();

                shared.queue.push(message);
                shared.events.emit_message(&payload);
            }
            RecvOutcome::Timeout => continue,
            RecvOutcome::Shutdown => break,
            RecvOutcome::Transient(e) => {
                shared.stats.receive_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Waiting for detection source: {}", NetworkError::ReceiveFailed(e.to_string()));
                thread::sleep(error_backoff);
            }
        }
    }

    tracing::info!("UDP receive thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::create_shared_queue;
    use crate::network::events::LinkEvents;
    use std::time::Instant;

    fn shared() -> ReceiverShared {
        ReceiverShared {
            queue: create_shared_queue(16),
            events: Arc::new(LinkEvents::new()),
            stats: Arc::new(ReceiverStats::default()),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn fast_config() -> NetworkConfig {
        NetworkConfig {
            local_port: 0,
            receive_timeout_ms: 50,
            ..Default::default()
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_classify_timeout_and_shutdown() {
        let running = AtomicBool::new(true);
        let timeout = Err(io::Error::from(io::ErrorKind::WouldBlock));
        assert!(matches!(classify(timeout, &running), RecvOutcome::Timeout));

        let interrupted = || Err(io::Error::from(io::ErrorKind::Interrupted));
        assert!(matches!(classify(interrupted(), &running), RecvOutcome::Timeout));

        let refused = || Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(matches!(classify(refused(), &running), RecvOutcome::Transient(_)));

        running.store(false, Ordering::Release);
        assert!(matches!(classify(interrupted(), &running), RecvOutcome::Shutdown));
        assert!(matches!(classify(refused(), &running), RecvOutcome::Shutdown));
    }

    #[test]
    fn test_transient_error_backs_off_and_keeps_receiving() {
        let shared = shared();
        let running = AtomicBool::new(true);
        let source: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let backoff = Duration::from_millis(30);
        let mut calls = 0;

        let started = Instant::now();
        receive_loop(
            |buf: &mut [u8]| {
                calls += 1;
                match calls {
                    1 => Some(Err(io::Error::from(io::ErrorKind::ConnectionRefused))),
                    2 => {
                        buf[..5].copy_from_slice(b"hello");
                        Some(Ok((5, source)))
                    }
                    _ => {
                        running.store(false, Ordering::Release);
                        Some(Err(io::Error::from(io::ErrorKind::WouldBlock)))
                    }
                }
            },
            &shared,
            &running,
            64,
            backoff,
        );

        assert!(started.elapsed() >= backoff);
        let stats = shared.stats.snapshot();
        assert_eq!(stats.receive_errors, 1);
        assert_eq!(stats.datagrams_received, 1);

        let message = shared.queue.try_pop().unwrap();
        assert_eq!(message.payload(), "hello");
        assert_eq!(message.source(), Some(source));
    }

    #[test]
    fn test_loop_ends_when_socket_is_gone() {
        let shared = shared();
        let running = AtomicBool::new(true);

        receive_loop(|_: &mut [u8]| None, &shared, &running, 64, Duration::from_millis(10));

        assert!(running.load(Ordering::Acquire));
        assert!(shared.queue.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_stop_releases_port_before_receive_timeout() {
        let mut config = fast_config();
        config.receive_timeout_ms = 5000;
        let socket = Arc::new(crate::network::udp::create_socket(&config).unwrap());
        let port = socket.local_addr().unwrap().port();
        let shared = shared();

        let mut receiver = DetectionReceiver::start(&socket, shared.clone(), &config).unwrap();
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        assert!(receiver.stop(Duration::from_secs(1)));
        assert!(started.elapsed() < Duration::from_secs(1));
        drop(socket);

        config.local_port = port;
        assert!(crate::network::udp::create_socket(&config).is_ok());
        assert_eq!(shared.stats.snapshot().receive_errors, 0);
    }

    #[test]
    fn test_receives_into_queue_and_stops() {
        let config = fast_config();
        let socket = Arc::new(crate::network::udp::create_socket(&config).unwrap());
        let port = socket.local_addr().unwrap().port();
        let shared = shared();

        let mut receiver = DetectionReceiver::start(&socket, shared.clone(), &config).unwrap();
        assert_eq!(shared.active.load(Ordering::SeqCst), 1);

        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client.send_to(b"1 2 3 4 5 6 0.1 7 0.9 \n", ("127.0.0.1", port)).unwrap();

        assert!(wait_until(|| shared.queue.len() == 1));
        let message = shared.queue.try_pop().unwrap();
        assert_eq!(message.payload(), "1 2 3 4 5 6 0.1 7 0.9 \n");
        assert_eq!(message.source(), Some(client.local_addr().unwrap()));

        let stats = shared.stats.snapshot();
        assert_eq!(stats.datagrams_received, 1);
        assert_eq!(stats.bytes_received, 23);

        assert!(receiver.stop(Duration::from_secs(1)));
        assert!(!receiver.is_running());
        assert_eq!(shared.active.load(Ordering::SeqCst), 0);

        // Second stop is a no-op
        assert!(receiver.stop(Duration::from_secs(1)));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let config = fast_config();
        let socket = Arc::new(crate::network::udp::create_socket(&config).unwrap());
        let port = socket.local_addr().unwrap().port();
        let shared = shared();
        let _receiver = DetectionReceiver::start(&socket, shared.clone(), &config).unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client.send_to(&[b'1', 0xff, b'2'], ("127.0.0.1", port)).unwrap();

        assert!(wait_until(|| !shared.queue.is_empty()));
        assert_eq!(shared.queue.try_pop().unwrap().payload(), "1\u{fffd}2");
    }
}
