//! Generic HTTP executor, modeled on an Ollama-style chat completion
//! endpoint, with bounded exponential backoff retry.

use std::time::Duration;

use async_trait::async_trait;
use dialogue_config::ExecutorConfig;
use dialogue_core::{ExecutionResult, Executor};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ExecutorError;

/// Strips thinking-tag markers some reasoning models emit around their
/// scratch work, so downstream stage parsing only ever sees the answer.
pub fn sanitize_content(raw: &str) -> String {
    let mut out = raw.to_string();
    while let (Some(start), Some(end)) = (out.find("<think>"), out.find("</think>")) {
        if end < start {
            break;
        }
        out.replace_range(start..end + "</think>".len(), "");
    }
    out.trim().to_string()
}

pub struct HttpExecutor {
    client: Client,
    config: ExecutorConfig,
}

impl HttpExecutor {
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ExecutorError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint, path)
    }

    async fn execute_request(&self, request: &ChatRequest) -> Result<ChatResponse, ExecutorError> {
        let mut req = self.client.post(self.api_url("/chat")).json(request);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }
        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status.is_server_error() || status.as_u16() == 429 {
                return Err(ExecutorError::Network(format!("server error {status}: {body}")));
            }
            return Err(ExecutorError::Backend(body));
        }

        response.json().await.map_err(|e| ExecutorError::InvalidResponse(e.to_string()))
    }

    fn is_retryable(error: &ExecutorError) -> bool {
        matches!(error, ExecutorError::Network(_) | ExecutorError::Timeout)
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn execute(&self, system: &str, user: &str) -> dialogue_core::Result<ExecutionResult> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: system.to_string() },
                ChatMessage { role: "user".to_string(), content: user.to_string() },
            ],
            stream: false,
            options: Some(ChatOptions {
                temperature: Some(self.config.temperature),
                num_predict: Some(self.config.max_tokens as i32),
            }),
        };

        let mut backoff = Duration::from_millis(self.config.initial_backoff_ms);
        let max_backoff = Duration::from_millis(self.config.max_backoff_ms);
        let mut last_error = None;

        for attempt in 0..self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(attempt, backoff_ms = backoff.as_millis() as u64, "executor request retrying");
                tokio::time::sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, max_backoff);
            }

            match self.execute_request(&request).await {
                Ok(response) => {
                    let content = sanitize_content(&response.message.content);
                    return Ok(ExecutionResult::new(content)
                        .with_attempts(attempt + 1)
                        .with_model(self.config.model.clone()));
                }
                Err(e) if Self::is_retryable(&e) => last_error = Some(e),
                Err(e) => return Err(map_error(e)),
            }
        }

        Err(map_error(last_error.unwrap_or(ExecutorError::Network("retries exhausted".to_string()))))
    }

    fn name(&self) -> &str {
        "http"
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.config.endpoint))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

fn map_error(err: ExecutorError) -> dialogue_core::Error {
    dialogue_core::Error::Serialization(err.to_string())
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_single_think_block() {
        let raw = "<think>scratch work here</think>final answer";
        assert_eq!(sanitize_content(raw), "final answer");
    }

    #[test]
    fn sanitize_leaves_plain_text_untouched() {
        assert_eq!(sanitize_content("plain answer"), "plain answer");
    }

    #[test]
    fn sanitize_strips_multiple_think_blocks() {
        let raw = "<think>a</think>mid<think>b</think>end";
        assert!(!sanitize_content(raw).contains("<think>"));
        assert_eq!(sanitize_content(raw), "midend");
    }
}
