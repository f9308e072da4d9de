//! Executor backends — the uniform language-model contract
//!
//! - `MockExecutor` - deterministic canned responses, used by default and in tests
//! - `HttpExecutor` - generic HTTP backend with bounded exponential backoff retry

pub mod http;
pub mod mock;

pub use http::HttpExecutor;
pub use mock::MockExecutor;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timeout")]
    Timeout,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for ExecutorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExecutorError::Timeout
        } else {
            ExecutorError::Network(err.to_string())
        }
    }
}

/// Build the configured executor backend.
pub fn build_executor(
    config: &dialogue_config::ExecutorConfig,
) -> Result<Box<dyn dialogue_core::Executor>, ExecutorError> {
    use dialogue_config::ExecutorBackend;
    match config.backend {
        ExecutorBackend::Mock => Ok(Box::new(MockExecutor::new(config.model.clone()))),
        ExecutorBackend::Http => Ok(Box::new(HttpExecutor::new(config.clone())?)),
    }
}
