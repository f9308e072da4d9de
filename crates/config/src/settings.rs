//! Top-level settings, layered from defaults, an optional TOML file, and
//! `DIALOGUE_*` environment variables.

use serde::{Deserialize, Serialize};

use crate::consensus::ConsensusConfig;
use crate::executor::ExecutorConfig;
use crate::facilitator::FacilitatorConfig;
use crate::memory::MemoryConfig;
use crate::rag::RagConfig;
use crate::router::RouterConfig;
use crate::storage::StorageConfig;
use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_enabled: bool,

    /// Allowed origins when `cors_enabled` is true. Empty means
    /// localhost-only defaults (see `dialogue-server::build_cors_layer`).
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    #[serde(default = "default_session_timeout_seconds")]
    pub session_timeout_seconds: u64,

    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_max_sessions() -> usize {
    1000
}
fn default_session_timeout_seconds() -> u64 {
    3600
}
fn default_cleanup_interval_seconds() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: false,
            cors_origins: Vec::new(),
            max_sessions: default_max_sessions(),
            session_timeout_seconds: default_session_timeout_seconds(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

fn default_requests_per_minute() -> u32 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { enabled: false, requests_per_minute: default_requests_per_minute() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub consensus: ConsensusConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub facilitator: FacilitatorConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub router: RouterConfig,
}

/// Layered load: built-in defaults, then an optional TOML file at
/// `config_path` (if it exists), then `DIALOGUE_*` environment variables,
/// each layer overriding the previous one.
pub fn load_settings(config_path: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = config_path {
        if std::path::Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }
    }

    let builder = builder.add_source(
        config::Environment::with_prefix("DIALOGUE")
            .separator("__")
            .try_parsing(true),
    );

    // Every field carries a `#[serde(default = ...)]`, so an empty or
    // partial layer stack still deserializes into a complete `Settings`.
    let settings: Settings = builder.build()?.try_deserialize()?;
    Ok(Settings {
        consensus: settings.consensus.clamp(),
        ..settings
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_settings_without_file_returns_defaults() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.consensus.max_rounds, 15);
    }
}
