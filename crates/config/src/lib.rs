//! Configuration management for the dialogue orchestration engine
//!
//! Supports loading configuration from:
//! - A TOML file
//! - Environment variables (`DIALOGUE_` prefix)
//! - Built-in defaults (every field has one, so no layer is required)

pub mod consensus;
pub mod executor;
pub mod facilitator;
pub mod memory;
pub mod rag;
pub mod router;
pub mod settings;
pub mod storage;

pub use consensus::ConsensusConfig;
pub use executor::{ExecutorBackend, ExecutorConfig};
pub use facilitator::FacilitatorConfig;
pub use memory::MemoryConfig;
pub use rag::RagConfig;
pub use router::RouterConfig;
pub use settings::{load_settings, RateLimitConfig, ServerConfig, Settings};
pub use storage::StorageConfig;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
