//! Network subsystem for the UDP detection stream

pub mod connection;
pub mod events;
pub mod receiver;
pub mod udp;

pub use connection::{ConnectionManager, ConnectionState};
pub use events::{LinkEvents, SharedLinkEvents};
pub use receiver::{DetectionReceiver, ReceiverStatsSnapshot};
pub use udp::create_socket;
