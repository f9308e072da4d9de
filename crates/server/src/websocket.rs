//! WebSocket transport for the realtime event contract. Subscribes to the shared `EventSink` and forwards
//! each `RouterEvent` to the connected client as a tagged JSON frame;
//! it does not filter by session, since `RouterEvent` always carries
//! `session_id` and clients are expected to filter client-side.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use dialogue_router::RouterEvent;
use serde::Serialize;

use crate::state::AppState;

pub struct WebSocketHandler;

impl WebSocketHandler {
    pub async fn handle(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
        ws.on_upgrade(move |socket| Self::run(socket, state))
    }

    async fn run(mut socket: WebSocket, state: AppState) {
        let mut events = state.events.subscribe();

        loop {
            tokio::select! {
                received = events.recv() => {
                    match received {
                        Ok(event) => {
                            let frame = WireEvent::from(event);
                            let Ok(text) = serde_json::to_string(&frame) else { continue };
                            if socket.send(WsMessage::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "websocket client lagged behind the event stream");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                incoming = socket.recv() => {
                    match incoming {
                        Some(Ok(WsMessage::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(_)) => break,
                    }
                }
            }
        }
    }
}

/// Wire shape for the events named: `v2-message`, `v2-round-start`,
/// `v2-consensus-update`, `v2-facilitator-action`.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum WireEvent {
    #[serde(rename = "v2-message")]
    Message { session_id: String, message: dialogue_core::Message, round: Option<u32> },
    #[serde(rename = "v2-session-completed")]
    SessionCompleted { session_id: String, session: Box<dialogue_core::Session> },
    #[serde(rename = "v2-round-start")]
    RoundStart { session_id: String, round: u32, timestamp: chrono::DateTime<chrono::Utc> },
    #[serde(rename = "v2-consensus-update")]
    ConsensusUpdate { session_id: String, consensus_level: f32, round: u32 },
    #[serde(rename = "v2-facilitator-action")]
    FacilitatorAction { session_id: String, action: String, target: Option<String>, reason: String },
}

impl From<RouterEvent> for WireEvent {
    fn from(event: RouterEvent) -> Self {
        match event {
            RouterEvent::Message { session_id, message, round } => {
                WireEvent::Message { session_id, message, round }
            }
            RouterEvent::SessionCompleted { session_id, session } => {
                WireEvent::SessionCompleted { session_id, session }
            }
            RouterEvent::RoundStart { session_id, round, timestamp } => {
                WireEvent::RoundStart { session_id, round, timestamp }
            }
            RouterEvent::ConsensusUpdate { session_id, consensus_level, round } => {
                WireEvent::ConsensusUpdate { session_id, consensus_level, round }
            }
            RouterEvent::FacilitatorAction { session_id, action, target, reason } => {
                WireEvent::FacilitatorAction { session_id, action, target, reason }
            }
        }
    }
}
