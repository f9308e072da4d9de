//! Stage summarization and vote extraction.
//!
//! - `Summarizer::summarize_stage` drives one executor call per stage to
//!   condense that stage's agent messages into a per-speaker position,
//!   then parses the result with [`parser::parse_positions`].
//! - `votes::analyze_votes` is pure: it extracts already-cast votes from
//!   `output-generation` content without another executor call.

pub mod parser;
pub mod votes;

pub use votes::{analyze_votes, ballots, VoteAnalysis, VoteRecord};

use std::sync::Arc;

use dialogue_core::{AgentProfile, Executor, Message, SpeakerPosition, StageSummary};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummarizerError {
    #[error("executor error: {0}")]
    Executor(String),
}

impl From<SummarizerError> for dialogue_core::Error {
    fn from(err: SummarizerError) -> Self {
        dialogue_core::Error::Serialization(err.to_string())
    }
}

const SUMMARY_SYSTEM_PROMPT: &str = "You summarize one stage of a multi-agent dialogue. For each \
    participating agent, write one dashed line in the form `- <agent name>: <one to two \
    sentences capturing their position>`. Cover every agent exactly once.";

pub struct Summarizer {
    executor: Arc<dyn Executor>,
}

impl Summarizer {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    /// Condense `messages_in_stage` into one position per participating
    /// agent. `sequence_number` and `stage` are attached to the returned
    /// `StageSummary` as-is; the caller supplies them from the session.
    pub async fn summarize_stage(
        &self,
        stage: &str,
        messages_in_stage: &[&Message],
        agents: &[AgentProfile],
        sequence_number: u32,
    ) -> Result<StageSummary, SummarizerError> {
        let transcript = messages_in_stage
            .iter()
            .map(|m| format!("[{}] {}", m.agent_id, m.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let user_prompt = format!("Stage: {stage}\n\n{transcript}");

        let result = self
            .executor
            .execute(SUMMARY_SYSTEM_PROMPT, &user_prompt)
            .await
            .map_err(|e| SummarizerError::Executor(e.to_string()))?;

        let positions = parser::parse_positions(&result.content, agents)
            .into_iter()
            .map(|(speaker, position)| SpeakerPosition { speaker, position })
            .collect();

        Ok(StageSummary { stage: stage.to_string(), sequence_number, positions })
    }
}
