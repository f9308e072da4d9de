//! Prometheus metrics (ambient observability, carried regardless of the
//! answer-quality/evaluation Non-goal — this instruments the transport,
//! not the dialogue itself).

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the global recorder. Safe to call once at process start;
/// later calls are no-ops.
pub fn init_metrics() {
    if HANDLE.get().is_some() {
        return;
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("prometheus recorder installs exactly once per process");
    let _ = HANDLE.set(handle);
}

pub async fn metrics_handler() -> String {
    HANDLE.get().map(|h| h.render()).unwrap_or_default()
}

pub fn record_request(route: &'static str, status: u16) {
    metrics::counter!("dialogue_http_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
}

pub fn record_stage_latency(stage: &'static str, millis: u64) {
    metrics::histogram!("dialogue_stage_latency_ms", "stage" => stage).record(millis as f64);
}

pub fn record_sequence_completed(version: &'static str) {
    metrics::counter!("dialogue_sequences_completed_total", "version" => version).increment(1);
}

pub fn record_error(kind: &'static str) {
    metrics::counter!("dialogue_errors_total", "kind" => kind).increment(1);
}
