//! Inter-thread message buffering

pub mod queue;

pub use queue::{create_shared_queue, MessageQueue, QueueStats, RawMessage, SharedMessageQueue};
