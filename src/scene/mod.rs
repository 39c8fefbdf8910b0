//! Latest-frame scene consumer
//!
//! Every payload from the detection source is one frame: all objects seen in
//! one inference pass. [`SceneSnapshot`] decodes each payload and keeps the
//! most recent frame for readers on other threads (the status API).

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::dispatch::ScenePlotter;
use crate::protocol::{decode_payload, Detection};

/// Most recent decoded frame plus decode counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct SceneFrame {
    /// Frames seen since start
    pub sequence: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub detections: Vec<Detection>,
    pub records_decoded: u64,
    pub decode_errors: u64,
    pub empty_records: u64,
    pub last_error: Option<String>,
}

/// Cloneable handle; all clones share one frame
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    inner: Arc<RwLock<SceneFrame>>,
}

impl SceneSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current frame
    pub fn latest(&self) -> SceneFrame {
        self.inner.read().clone()
    }

    pub fn detection_count(&self) -> usize {
        self.inner.read().detections.len()
    }
}

impl ScenePlotter for SceneSnapshot {
    fn update(&mut self, data: &str) {
        let decoded = decode_payload(data);

        for (line, e) in &decoded.errors {
            tracing::warn!("Skipping record {}: {}", line, e);
        }

        let mut frame = self.inner.write();
        frame.sequence += 1;
        frame.updated_at = Some(Utc::now());
        frame.records_decoded += decoded.detections.len() as u64;
        frame.decode_errors += decoded.errors.len() as u64;
        frame.empty_records += decoded.empty_records as u64;
        if let Some((_, e)) = decoded.errors.last() {
            frame.last_error = Some(e.to_string());
        }
        frame.detections = decoded.detections;
    }
}
