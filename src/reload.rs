//! Browser reload signalling.
//!
//! Tasks publish a [`ReloadSignal`] after they finish; the dev server
//! forwards each one to every connected browser over a WebSocket. With no
//! server running, signals are dropped.

use crate::build::TaskName;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Number of signals buffered for slow subscribers.
const CHANNEL_CAPACITY: usize = 16;

/// What a browser should do after a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadSignal {
    /// Re-fetch stylesheets in place
    Css,
    /// Reload the whole page
    Full,
}

impl ReloadSignal {
    /// Signal sent after `task` succeeds, if any.
    pub fn for_task(task: TaskName) -> Option<Self> {
        match task {
            TaskName::Styles => Some(ReloadSignal::Css),
            TaskName::Scripts | TaskName::Pages | TaskName::Images => Some(ReloadSignal::Full),
            _ => None,
        }
    }

    /// JSON text sent over the socket.
    pub fn to_message(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(_) => r#"{"type":"full"}"#.to_string(),
        }
    }
}

/// Fan-out handle for reload signals.
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Debug, Clone)]
pub struct Reloader {
    tx: broadcast::Sender<ReloadSignal>,
}

impl Reloader {
    /// Create a reloader with no subscribers.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to future signals.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadSignal> {
        self.tx.subscribe()
    }

    /// Publish a signal. Returns how many subscribers received it.
    pub fn notify(&self, signal: ReloadSignal) -> usize {
        match self.tx.send(signal) {
            Ok(n) => {
                tracing::debug!(?signal, receivers = n, "reload signal sent");
                n
            }
            Err(_) => 0,
        }
    }

    /// Number of live subscribers.
    pub fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Reloader {
    fn default() -> Self {
        Self::new()
    }
}
