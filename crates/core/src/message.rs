//! Message — a single append-only entry in a session's dialogue log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
    System,
}

/// Free-form metadata carried on a message: reasoning, confidence, a
/// resolved vote, a facilitator action tag, or a stage-specific data
/// payload used by later stages of the same sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Resolved vote target, written in during output-generation vote
    /// analysis. `None` until analyzed, and stays `None` for a discarded
    /// self-vote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facilitator_action: Option<String>,
    /// Structured payload carried forward for later-stage prompt
    /// composition (e.g. the raw `individual-thought` response used
    /// unsummarized by `mutual-reflection`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_data: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// A registered agent id, `"user"`, `"system"`, or `"facilitator-001"`.
    pub agent_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub sequence_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    pub fn new(
        agent_id: impl Into<String>,
        content: impl Into<String>,
        role: MessageRole,
        sequence_number: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
            role,
            stage: None,
            sequence_number,
            metadata: None,
        }
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn user(content: impl Into<String>, sequence_number: u32) -> Self {
        Self::new(crate::USER_AGENT_ID, content, MessageRole::User, sequence_number)
    }

    pub fn system(content: impl Into<String>, sequence_number: u32) -> Self {
        Self::new(crate::SYSTEM_AGENT_ID, content, MessageRole::System, sequence_number)
    }
}
