//! Per-tick dispatch from the message queue to the scene consumer
//!
//! The host calls [`Dispatcher::drain_once`] at its own cadence (once per
//! rendering frame, say). Each call drains a bounded batch and never blocks.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::buffer::SharedMessageQueue;
use crate::constants::{DEFAULT_DRAIN_LIMIT, DEFAULT_STATUS_LOG_INTERVAL};

/// Consumer of raw detection payloads
///
/// Receives each non-blank payload exactly as it arrived; splitting and
/// decoding are up to the implementation.
pub trait ScenePlotter {
    fn update(&mut self, data: &str);
}

impl<P: ScenePlotter + ?Sized> ScenePlotter for Box<P> {
    fn update(&mut self, data: &str) {
        (**self).update(data)
    }
}

/// Work done by one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub drained: usize,
    pub forwarded: usize,
    pub skipped_blank: usize,
}

/// Running dispatch counters, readable from other threads
#[derive(Debug, Default)]
pub struct DispatchStats {
    ticks: AtomicU64,
    forwarded: AtomicU64,
    skipped_blank: AtomicU64,
}

impl DispatchStats {
    fn record(&self, report: &TickReport) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.forwarded.fetch_add(report.forwarded as u64, Ordering::Relaxed);
        self.skipped_blank.fetch_add(report.skipped_blank as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            skipped_blank: self.skipped_blank.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchStatsSnapshot {
    pub ticks: u64,
    pub forwarded: u64,
    pub skipped_blank: u64,
}

pub struct Dispatcher<P> {
    queue: SharedMessageQueue,
    plotter: P,
    drain_limit: usize,
    status_log_interval: u64,
    stats: Arc<DispatchStats>,
}

impl<P: ScenePlotter> Dispatcher<P> {
    pub fn new(queue: SharedMessageQueue, plotter: P) -> Self {
        Self {
            queue,
            plotter,
            drain_limit: DEFAULT_DRAIN_LIMIT,
            status_log_interval: DEFAULT_STATUS_LOG_INTERVAL,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    /// Maximum messages drained per tick (at least 1)
    pub fn with_drain_limit(mut self, drain_limit: usize) -> Self {
        self.drain_limit = drain_limit.max(1);
        self
    }

    /// Log queue depth every `ticks` ticks; 0 disables
    pub fn with_status_log_interval(mut self, ticks: u64) -> Self {
        self.status_log_interval = ticks;
        self
    }

    /// Drain up to the limit, forwarding non-blank payloads in FIFO order
    pub fn drain_once(&mut self) -> TickReport {
        let mut report = TickReport::default();

        while report.drained < self.drain_limit {
            let Some(message) = self.queue.try_pop() else {
                break;
            };
            report.drained += 1;

            if message.is_blank() {
                report.skipped_blank += 1;
                continue;
            }

            self.plotter.update(message.payload());
            report.forwarded += 1;
        }

        self.stats.record(&report);

        let ticks = self.stats.ticks.load(Ordering::Relaxed);
        if self.status_log_interval > 0 && ticks % self.status_log_interval == 0 {
            tracing::debug!("UDP queue size: {}", self.queue.len());
        }

        report
    }

    pub fn drain_limit(&self) -> usize {
        self.drain_limit
    }

    /// Shared handle to the dispatch counters
    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }

    pub fn plotter(&self) -> &P {
        &self.plotter
    }
}
