//! Per-agent context compression policy.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Most recent messages kept verbatim regardless of token budget.
    #[serde(default = "default_recent_messages")]
    pub recent_messages_kept: usize,

    /// Approximate token budget for composed stage input. Older messages
    /// beyond `recent_messages_kept` are dropped, oldest first, until the
    /// remaining context estimate fits.
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,
}

fn default_recent_messages() -> usize {
    12
}
fn default_token_budget() -> usize {
    6000
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            recent_messages_kept: default_recent_messages(),
            token_budget: default_token_budget(),
        }
    }
}
