//! UDP socket setup

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, UdpSocket};

use crate::config::NetworkConfig;
use crate::error::NetworkError;

/// Create the listening socket for the detection stream
///
/// Binds to every local address so datagrams are accepted from any source,
/// whatever NAT does to the sender address. The read timeout bounds how long
/// the receive loop can go without checking for shutdown.
pub fn create_socket(config: &NetworkConfig) -> Result<UdpSocket, NetworkError> {
    let port = config.local_port;
    let bind_failed = |e: std::io::Error| NetworkError::BindFailed {
        port,
        reason: e.to_string(),
    };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(bind_failed)?;

    if config.recv_buffer_size > 0 {
        if let Err(e) = socket.set_recv_buffer_size(config.recv_buffer_size) {
            tracing::warn!("Could not set receive buffer to {} bytes: {}", config.recv_buffer_size, e);
        }
    }

    socket
        .set_read_timeout(Some(config.receive_timeout()))
        .map_err(bind_failed)?;

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into()).map_err(bind_failed)?;

    Ok(socket.into())
}

/// Wake a thread blocked in `recv_from` on this socket
///
/// Linux reports `ENOTCONN` for an unconnected UDP socket but still marks it
/// shut down and wakes every waiter, whose receive then returns at once.
pub fn interrupt_receive(socket: &UdpSocket) {
    if let Err(e) = SockRef::from(socket).shutdown(Shutdown::Read) {
        tracing::debug!("Socket shutdown reported: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config(port: u16) -> NetworkConfig {
        NetworkConfig {
            local_port: port,
            receive_timeout_ms: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_ephemeral_bind_applies_timeout() {
        let socket = create_socket(&test_config(0)).unwrap();
        assert_ne!(socket.local_addr().unwrap().port(), 0);

        // The kernel rounds the timeout up to whole scheduler ticks
        let timeout = socket.read_timeout().unwrap().unwrap();
        assert!(timeout >= Duration::from_millis(50), "timeout {:?}", timeout);
        assert!(timeout < Duration::from_millis(100), "timeout {:?}", timeout);
    }

    #[test]
    fn test_port_in_use_is_bind_error() {
        let blocker = UdpSocket::bind("0.0.0.0:0").unwrap();
        let port = blocker.local_addr().unwrap().port();

        match create_socket(&test_config(port)) {
            Err(NetworkError::BindFailed { port: p, .. }) => assert_eq!(p, port),
            other => panic!("expected bind failure, got {:?}", other.map(|s| s.local_addr())),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_interrupt_wakes_blocked_receive() {
        let mut config = test_config(0);
        config.receive_timeout_ms = 5000;
        let socket = std::sync::Arc::new(create_socket(&config).unwrap());

        let reader = socket.clone();
        let started = std::time::Instant::now();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 16];
            let _ = reader.recv_from(&mut buf);
        });

        std::thread::sleep(Duration::from_millis(50));
        interrupt_receive(&socket);
        handle.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
