//! Agent descriptor — identity and personality metadata.
//!
//! This is the lightweight, serializable profile owned by the process-wide
//! agent registry. The stateful participant that binds a profile to a
//! session and executes dialogue stages lives in `dialogue-agent`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStyle {
    Logical,
    Emotive,
    Critical,
    Intuitive,
    Analytical,
    Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentPriority {
    Precision,
    Breadth,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryScope {
    Local,
    Session,
    CrossSession,
}

/// Agent descriptor as held by the agent registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    pub style: AgentStyle,
    pub priority: AgentPriority,
    pub personality: String,
    #[serde(default)]
    pub preferences: Vec<String>,
    pub memory_scope: MemoryScope,
    pub tone: String,
    pub communication_style: String,
}

impl AgentProfile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        style: AgentStyle,
        priority: AgentPriority,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            style,
            priority,
            personality: String::new(),
            preferences: Vec::new(),
            memory_scope: MemoryScope::Session,
            tone: String::new(),
            communication_style: String::new(),
        }
    }

    pub fn with_personality(mut self, personality: impl Into<String>) -> Self {
        self.personality = personality.into();
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    /// `true` for the reserved pseudo-ids used in `Message::agent_id`
    ///.
    pub fn is_reserved_id(id: &str) -> bool {
        matches!(id, "user" | "system" | "facilitator-001")
    }
}

pub const FACILITATOR_AGENT_ID: &str = "facilitator-001";
pub const USER_AGENT_ID: &str = "user";
pub const SYSTEM_AGENT_ID: &str = "system";
