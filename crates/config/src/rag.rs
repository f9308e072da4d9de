//! Knowledge retrieval hook configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

fn default_enabled() -> bool {
    false
}
fn default_top_k() -> usize {
    5
}
fn default_min_score() -> f32 {
    0.3
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { enabled: default_enabled(), top_k: default_top_k(), min_score: default_min_score() }
    }
}
