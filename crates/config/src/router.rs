//! Pacing and fallback knobs shared by the staged and dynamic routers
//!.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Sleep between consecutive agent calls within a stage/round,
    /// skipped before the first agent.
    #[serde(default = "default_inter_agent_delay_ms")]
    pub inter_agent_delay_ms: u64,

    /// Sleep before invoking the stage summarizer.
    #[serde(default = "default_summarizer_delay_ms")]
    pub summarizer_delay_ms: u64,

    /// Finalizer chosen when a vote analysis yields no winners, e.g. a
    /// lone agent's self-vote was discarded.
    #[serde(default = "default_fallback_finalizer_id")]
    pub fallback_finalizer_id: String,
}

fn default_inter_agent_delay_ms() -> u64 {
    500
}
fn default_summarizer_delay_ms() -> u64 {
    250
}
fn default_fallback_finalizer_id() -> String {
    "agent-a".to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            inter_agent_delay_ms: default_inter_agent_delay_ms(),
            summarizer_delay_ms: default_summarizer_delay_ms(),
            fallback_finalizer_id: default_fallback_finalizer_id(),
        }
    }
}
