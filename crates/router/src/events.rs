//! Realtime event contract emitted by both routers.

use chrono::{DateTime, Utc};
use dialogue_core::{Message, Session};
use tokio::sync::broadcast;

/// The wire events a realtime transport (out of scope here) forwards to
/// subscribers. `round` is `None` for v1 stage/summary/finalize messages,
/// which carry no round number.
#[derive(Debug, Clone)]
pub enum RouterEvent {
    /// `v2-message`, and the v1 "invoked once per appended message"
    /// progress callback.
    Message { session_id: String, message: Message, round: Option<u32> },
    /// The v1 progress callback's session-level form, fired once the
    /// sequence completes.
    SessionCompleted { session_id: String, session: Box<Session> },
    /// `v2-round-start`.
    RoundStart { session_id: String, round: u32, timestamp: DateTime<Utc> },
    /// `v2-consensus-update`.
    ConsensusUpdate { session_id: String, consensus_level: f32, round: u32 },
    /// `v2-facilitator-action`.
    FacilitatorAction { session_id: String, action: String, target: Option<String>, reason: String },
}

/// Broadcast fan-out for realtime subscribers. A router is handed a
/// clone and emits into it; the HTTP/WebSocket layer (out of scope)
/// subscribes to forward events to clients.
#[derive(Clone)]
pub struct EventSink {
    tx: broadcast::Sender<RouterEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.tx.subscribe()
    }

    /// Best-effort: a send with no subscribers is not an error.
    pub fn emit(&self, event: RouterEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new(256)
    }
}
