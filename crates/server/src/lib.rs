//! HTTP and WebSocket transport for the dialogue orchestration engine.
//! It wires the routers and stores into the HTTP surface and realtime
//! event contract, but carries none of the orchestration logic itself.

pub mod http;
pub mod metrics;
pub mod rate_limit;
pub mod registry;
pub mod session;
pub mod state;
pub mod websocket;

pub use http::create_router;
pub use metrics::{init_metrics, metrics_handler, record_error, record_request, record_sequence_completed, record_stage_latency};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
pub use session::SessionManager;
pub use state::AppState;
pub use websocket::WebSocketHandler;

use thiserror::Error;

/// Server errors.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("rate limit exceeded")]
    RateLimit,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::SessionNotFound(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::RateLimit => axum::http::StatusCode::TOO_MANY_REQUESTS,
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
