//! Per-invocation facilitator log record.

use chrono::{DateTime, Utc};
use dialogue_core::{FacilitatorAction, FacilitatorActionType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitatorDecision {
    pub reasoning: String,
    pub data_analyzed: serde_json::Value,
    pub suggested_actions: Vec<FacilitatorAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_action: Option<FacilitatorActionType>,
}

/// One record appended per `Facilitator::analyze` call. The router
/// persists the accumulated log to `logs/<sessionId>/facilitator/` at
/// session end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitatorLogRecord {
    pub round_number: u32,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub decision: FacilitatorDecision,
    pub execution_details: serde_json::Value,
}
