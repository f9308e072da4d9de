//! Deterministic executor used for tests and local runs without a real
//! language model backend.

use async_trait::async_trait;
use dialogue_core::{ExecutionResult, Executor};

/// Echoes a short, deterministic response derived from the user prompt.
/// When the prompt names candidate agent ids in an `Eligible voters:` line
/// (the convention `dialogue-agent`'s output-generation stage uses to ask
/// for a vote), the mock casts a vote for the first listed id that is not
/// the asking agent itself, so vote-extraction tests have something to
/// parse without a live backend.
pub struct MockExecutor {
    name: String,
}

impl MockExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new("mock")
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, _system: &str, user: &str) -> dialogue_core::Result<ExecutionResult> {
        let mut content = format!("Acknowledged: {}", truncate(user, 120));
        if let Some(vote_line) = build_vote_line(user) {
            content.push_str("\n\n");
            content.push_str(&vote_line);
        }
        Ok(ExecutionResult::new(content).with_model(self.name.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn build_vote_line(prompt: &str) -> Option<String> {
    let marker = "Eligible voters:";
    let start = prompt.find(marker)? + marker.len();
    let rest = &prompt[start..];
    let line_end = rest.find('\n').unwrap_or(rest.len());
    let candidate = rest[..line_end]
        .split(',')
        .map(str::trim)
        .find(|id| !id.is_empty())?;
    Some(format!("VOTE: {candidate}"))
}
