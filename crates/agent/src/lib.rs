//! Stateful dialogue participants
//!
//! - Binds an `AgentProfile` to an `Executor` and an optional `Retriever`
//! - Runs the per-stage prompt/response cycle, isolating executor failures
//!   so one struggling agent never aborts a round
//! - Compresses prior-turn history into a token-budgeted prompt context

pub mod agent;
pub mod consensus_parse;
pub mod context;

pub use agent::{Agent, AgentEvent, AgentResponse};
pub use consensus_parse::{parse_consensus_indicator, CONSENSUS_RESPONSE_FORMAT};
pub use context::{estimate_tokens, select_context};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("executor error: {0}")]
    Executor(String),

    #[error("retrieval error: {0}")]
    Retrieval(String),
}

impl From<dialogue_executor::ExecutorError> for AgentError {
    fn from(err: dialogue_executor::ExecutorError) -> Self {
        AgentError::Executor(err.to_string())
    }
}
