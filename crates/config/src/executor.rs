//! Executor backend configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorBackend {
    /// Deterministic canned responses, no network calls.
    Mock,
    /// Generic HTTP backend (OpenAI-compatible or Ollama-style endpoint).
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_backend")]
    pub backend: ExecutorBackend,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Attempt budget for retryable faults, first attempt included.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Cap applied to the doubling backoff so a flaky backend cannot stall
    /// a round indefinitely.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_backend() -> ExecutorBackend {
    ExecutorBackend::Mock
}
fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "qwen2.5:7b-instruct-q4_K_M".to_string()
}
fn default_max_tokens() -> usize {
    1024
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_seconds() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    250
}
fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_mock_backend() {
        let cfg = ExecutorConfig::default();
        assert_eq!(cfg.backend, ExecutorBackend::Mock);
        assert!(cfg.max_retries >= 1);
    }
}
