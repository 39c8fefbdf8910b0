//! # BEV Detection Link
//!
//! Receives 3D object detections from a real-time perception daemon over UDP
//! and hands them to a scene renderer at a bounded per-tick rate.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────┐
//! │   Perception daemon (remote) │   "x z y w l h yaw id conf \n" ...
//! └──────────────┬───────────────┘
//!                │ UDP datagrams
//!                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ConnectionManager (network::connection)                     │
//! │    connect / disconnect / send, status notifications         │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ Receive thread (network::receiver)                     │  │
//! │  │   recv_from with timeout ── on_message_received ──►    │  │
//! │  └──────────────────────┬─────────────────────────────────┘  │
//! └─────────────────────────┼────────────────────────────────────┘
//!                           ▼
//!            ┌─────────────────────────────┐
//!            │ MessageQueue (buffer)       │  capacity 490, drop-oldest
//!            └──────────────┬──────────────┘
//!                           │ try_pop, at most 10 per tick
//!                           ▼
//!            ┌─────────────────────────────┐
//!            │ Dispatcher::drain_once      │  called by the host each tick
//!            └──────────────┬──────────────┘
//!                           ▼
//!            ┌─────────────────────────────┐
//!            │ ScenePlotter::update(&str)  │  splits + decodes (protocol)
//!            └─────────────────────────────┘
//! ```

pub mod buffer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod network;
pub mod protocol;
pub mod scene;
pub mod ui;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default detection source address
    pub const DEFAULT_SERVER_ADDRESS: &str = "172.23.112.1";

    /// Default detection source port
    pub const DEFAULT_SERVER_PORT: u16 = 8080;

    /// Default local UDP listen port
    pub const DEFAULT_LOCAL_PORT: u16 = 8081;

    /// Default HTTP port for the status API
    pub const DEFAULT_HTTP_PORT: u16 = 8090;

    /// Default message queue capacity
    pub const DEFAULT_QUEUE_CAPACITY: usize = 490;

    /// Default number of messages drained per tick
    pub const DEFAULT_DRAIN_LIMIT: usize = 10;

    /// Default socket receive timeout in milliseconds
    pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 1000;

    /// Default wait for the receive thread on disconnect, longer than one
    /// receive timeout
    pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 1500;

    /// Pause after a transient receive error
    pub const DEFAULT_ERROR_BACKOFF_MS: u64 = 100;

    /// Default socket receive buffer size hint
    pub const DEFAULT_RECV_BUFFER_SIZE: usize = 256 * 1024;

    /// Largest UDP payload over IPv4
    pub const MAX_DATAGRAM_SIZE: usize = 65_507;

    /// Default host tick rate
    pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

    /// Queue depth is logged every this many ticks
    pub const DEFAULT_STATUS_LOG_INTERVAL: u64 = 60;

    /// Pivot correction added to every decoded y coordinate
    pub const GROUND_OFFSET_Y: f32 = 0.5;
}
