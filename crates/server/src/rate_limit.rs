//! Per-client fixed-window rate limiting, gated by
//! `dialogue_config::RateLimitConfig`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::Mutex;

use crate::state::AppState;

struct Window {
    started_at: Instant,
    count: u32,
}

pub struct RateLimiter {
    windows: Mutex<HashMap<SocketAddr, Window>>,
    limit_per_minute: u32,
}

impl RateLimiter {
    pub fn new(limit_per_minute: u32) -> Self {
        Self { windows: Mutex::new(HashMap::new()), limit_per_minute }
    }

    fn allow(&self, client: SocketAddr) -> bool {
        let mut windows = self.windows.lock();
        let now = Instant::now();
        let window = windows.entry(client).or_insert(Window { started_at: now, count: 0 });

        if now.duration_since(window.started_at) >= Duration::from_secs(60) {
            window.started_at = now;
            window.count = 0;
        }

        window.count += 1;
        window.count <= self.limit_per_minute
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !state.settings.server.rate_limit.enabled {
        return Ok(next.run(request).await);
    }

    if state.rate_limiter.allow(addr) {
        Ok(next.run(request).await)
    } else {
        crate::metrics::record_error("rate_limited");
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}
