//! Observer registry for link notifications
//!
//! Listeners are invoked on the thread that raises the event: message
//! notifications on the receive thread, status changes on whichever thread
//! called `connect`/`disconnect`. No lock is held while a listener runs.

use parking_lot::RwLock;
use std::sync::Arc;

type MessageListener = Arc<dyn Fn(&str) + Send + Sync>;
type StatusListener = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
pub struct LinkEvents {
    message_listeners: RwLock<Vec<MessageListener>>,
    status_listeners: RwLock<Vec<StatusListener>>,
}

impl LinkEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for every received datagram payload
    pub fn on_message_received<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.message_listeners.write().push(Arc::new(listener));
    }

    /// Register a listener for connectivity transitions
    pub fn on_connection_status_changed<F>(&self, listener: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.status_listeners.write().push(Arc::new(listener));
    }

    pub(crate) fn emit_message(&self, payload: &str) {
        let listeners = self.message_listeners.read().clone();
        for listener in listeners {
            listener(payload);
        }
    }

    pub(crate) fn emit_status(&self, connected: bool) {
        let listeners = self.status_listeners.read().clone();
        for listener in listeners {
            listener(connected);
        }
    }
}

pub type SharedLinkEvents = Arc<LinkEvents>;
