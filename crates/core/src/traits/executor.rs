//! Executor — the uniform contract every dialogue stage call goes through
//!.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One prompt/response round trip to a language model backend.
///
/// Implementations:
/// - `MockExecutor` - deterministic canned responses for tests and local runs
/// - `HttpExecutor` - generic HTTP backend with retry/backoff
///
/// Every implementation is responsible for classifying its own failures:
/// `execute` returns `Err` only for retryable faults exhausted past the
/// configured attempt budget, or for faults the caller has no business
/// retrying (auth, malformed request). Callers do not inspect error kind;
/// they treat any `Err` as final for the current attempt.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Run one prompt against the backend. `system` carries the stage's
    /// persona/instruction prompt; `user` carries the composed stage input.
    async fn execute(&self, system: &str, user: &str) -> Result<ExecutionResult>;

    /// Backend identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Whether the backend currently looks reachable. Used by health/ready
    /// endpoints; never gates `execute` itself.
    async fn is_available(&self) -> bool {
        true
    }
}

/// Result of one `Executor::execute` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub content: String,
    /// Number of attempts the backend made before returning, including the
    /// first. `1` for a first-try success.
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ExecutionResult {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), attempts: 1, model: None }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoExecutor;

    #[async_trait]
    impl Executor for EchoExecutor {
        async fn execute(&self, _system: &str, user: &str) -> Result<ExecutionResult> {
            Ok(ExecutionResult::new(user.to_string()))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn echo_executor_returns_user_prompt() {
        let executor = EchoExecutor;
        let result = executor.execute("sys", "hello").await.unwrap();
        assert_eq!(result.content, "hello");
        assert_eq!(result.attempts, 1);
    }
}
