//! Monitor events
//!
//! Monitors report what they do through a bounded channel so callers can
//! observe progress without touching monitor state. Emission never blocks:
//! when the channel is full the event is dropped and a warning is logged.

use crate::item::ItemKind;
use std::fmt;
use tokio::sync::mpsc;
use tracing::warn;

/// Why a monitor stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A handler returned [`crate::Outcome::Stop`]
    HandlerRequested,
    /// The cancellation token fired
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::HandlerRequested => f.write_str("handler requested stop"),
            StopReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Events emitted by monitors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Monitor entered its polling loop
    Started { monitor: String, path: String },

    /// Forward cold start recorded its baseline without dispatching
    BaselineEstablished {
        monitor: String,
        frontier: Option<String>,
    },

    /// An item was handed to its handler
    Dispatched {
        monitor: String,
        name: String,
        kind: ItemKind,
    },

    /// No known item was found; items between two cycles were missed
    ItemsLost {
        monitor: String,
        previous_frontier: String,
        new_frontier: String,
    },

    /// A fetch failed
    FetchFailed {
        monitor: String,
        error: String,
        transient: bool,
    },

    /// Monitor left its polling loop
    Stopped { monitor: String, reason: String },
}

/// Non-blocking sender side used by monitors
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::Sender<MonitorEvent>>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<MonitorEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub(crate) fn emit(&self, event: MonitorEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(event) {
            warn!("Monitor event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
