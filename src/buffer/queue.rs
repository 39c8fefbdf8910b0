//! Bounded message queue between the receive thread and the tick thread
//!
//! Lock-free single-producer single-consumer queue with a drop-oldest
//! policy: under sustained overload the freshest detections survive.

use chrono::{DateTime, Utc};
use crossbeam::queue::ArrayQueue;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One datagram's payload, as received
#[derive(Debug, Clone)]
pub struct RawMessage {
    payload: Arc<str>,
    source: Option<SocketAddr>,
    received_at: DateTime<Utc>,
}

impl RawMessage {
    pub fn new(payload: impl Into<Arc<str>>) -> Self {
        Self {
            payload: payload.into(),
            source: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_source(mut self, source: SocketAddr) -> Self {
        self.source = Some(source);
        self
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Shared handle to the payload text
    pub fn shared_payload(&self) -> Arc<str> {
        Arc::clone(&self.payload)
    }

    /// Sender address, if received from the network
    pub fn source(&self) -> Option<SocketAddr> {
        self.source
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Empty or whitespace-only payloads carry nothing to dispatch
    pub fn is_blank(&self) -> bool {
        self.payload.trim().is_empty()
    }
}

/// Fixed-capacity FIFO of raw messages
pub struct MessageQueue {
    queue: ArrayQueue<RawMessage>,
    dropped_count: AtomicU64,
    pushed_count: AtomicU64,
}

impl MessageQueue {
    /// Create a queue holding at most `capacity` messages
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Queue capacity must be non-zero");

        Self {
            queue: ArrayQueue::new(capacity),
            dropped_count: AtomicU64::new(0),
            pushed_count: AtomicU64::new(0),
        }
    }

    /// Push a message, evicting the oldest one if the queue is full
    ///
    /// Always succeeds. Returns the evicted message, if any.
    pub fn push(&self, message: RawMessage) -> Option<RawMessage> {
        self.pushed_count.fetch_add(1, Ordering::Relaxed);

        let evicted = self.queue.force_push(message);
        if evicted.is_some() {
            self.dropped_count.fetch_add(1, Ordering::Relaxed);
        }
        evicted
    }

    /// Pop the oldest message without blocking
    pub fn try_pop(&self) -> Option<RawMessage> {
        self.queue.pop()
    }

    /// Discard everything currently queued
    ///
    /// Returns the number of messages discarded.
    pub fn clear(&self) -> usize {
        let mut cleared = 0;
        while self.queue.pop().is_some() {
            cleared += 1;
        }
        cleared
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Messages evicted by the drop-oldest policy
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn pushed_count(&self) -> u64 {
        self.pushed_count.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            len: self.len(),
            capacity: self.capacity(),
            pushed: self.pushed_count(),
            dropped: self.dropped_count(),
        }
    }
}

/// Queue statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueStats {
    pub len: usize,
    pub capacity: usize,
    pub pushed: u64,
    pub dropped: u64,
}

/// Thread-safe handle to a message queue
pub type SharedMessageQueue = Arc<MessageQueue>;

/// Create a new shared message queue
pub fn create_shared_queue(capacity: usize) -> SharedMessageQueue {
    Arc::new(MessageQueue::new(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn drain(queue: &MessageQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.try_pop())
            .map(|msg| msg.payload().to_string())
            .collect()
    }

    #[test]
    fn test_fifo_order() {
        let queue = MessageQueue::new(4);

        assert!(queue.push(RawMessage::new("a")).is_none());
        assert!(queue.push(RawMessage::new("b")).is_none());
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.try_pop().unwrap().payload(), "a");
        assert_eq!(queue.try_pop().unwrap().payload(), "b");
        assert!(queue.try_pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let capacity = 490;
        let queue = MessageQueue::new(capacity);

        for i in 0..capacity + 5 {
            queue.push(RawMessage::new(i.to_string()));
        }

        assert_eq!(queue.len(), capacity);
        assert_eq!(queue.dropped_count(), 5);

        let expected: Vec<String> = (5..capacity + 5).map(|i| i.to_string()).collect();
        assert_eq!(drain(&queue), expected);
    }

    #[test]
    fn test_push_returns_evicted() {
        let queue = MessageQueue::new(1);
        queue.push(RawMessage::new("old"));

        let evicted = queue.push(RawMessage::new("new")).unwrap();
        assert_eq!(evicted.payload(), "old");
        assert_eq!(queue.try_pop().unwrap().payload(), "new");
    }

    #[test]
    fn test_clear() {
        let queue = MessageQueue::new(8);
        for i in 0..5 {
            queue.push(RawMessage::new(i.to_string()));
        }

        assert_eq!(queue.clear(), 5);
        assert!(queue.is_empty());
        assert_eq!(queue.clear(), 0);
    }

    #[test]
    fn test_blank_detection() {
        assert!(RawMessage::new("").is_blank());
        assert!(RawMessage::new(" \n ").is_blank());
        assert!(!RawMessage::new("1 2 3").is_blank());
    }

    #[test]
    fn test_concurrent_producer_consumer_keeps_order() {
        let queue = create_shared_queue(64);
        let total = 10_000;

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..total {
                    queue.push(RawMessage::new(i.to_string()));
                }
            })
        };

        let mut seen = Vec::new();
        while !producer.is_finished() || !queue.is_empty() {
            if let Some(msg) = queue.try_pop() {
                seen.push(msg.payload().parse::<usize>().unwrap());
            }
        }
        producer.join().unwrap();

        // Drops are allowed, reordering is not
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.len() as u64 + queue.dropped_count(), total as u64);
    }
}
