//! Crate-wide error type for the dialogue data model

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("invalid stage transition: {from} -> {to}")]
    InvalidStageTransition { from: String, to: String },

    #[error("session {0} is not active")]
    SessionNotActive(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
