//! Session — the dialogue aggregate root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent_profile::AgentProfile;
use crate::message::Message;
use crate::stage::{DialogueStage, Language, Version};

/// Defaults to `Completed` on load when the field is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    #[default]
    Completed,
}

/// One `{speaker, position}` pair produced by the stage summarizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerPosition {
    pub speaker: String,
    pub position: String,
}

/// Output of `summarizeStage` for one stage of one sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: String,
    pub sequence_number: u32,
    pub positions: Vec<SpeakerPosition>,
}

/// Execution record appended to `stageHistory` once per stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageHistoryEntry {
    pub stage: DialogueStage,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub agent_responses: Vec<String>,
    pub sequence_number: u32,
}

/// `{ approach }` comparison used to derive conflicts feeding
/// `conflict-resolution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub agent_a: String,
    pub agent_b: String,
    pub description: String,
    pub severity: ConflictSeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub agents: Vec<AgentProfile>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub current_stage: DialogueStage,
    #[serde(default)]
    pub stage_history: Vec<StageHistoryEntry>,
    #[serde(default)]
    pub stage_summaries: Vec<StageSummary>,
    #[serde(default = "default_sequence_number")]
    pub sequence_number: u32,
    pub language: Language,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus_history: Option<Vec<crate::consensus::DialogueState>>,
    /// Maps sequence number to output artifact id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_output_files: Option<std::collections::HashMap<u32, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

fn default_sequence_number() -> u32 {
    1
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        agents: Vec<AgentProfile>,
        language: Language,
        version: Version,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            agents,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            status: SessionStatus::Active,
            current_stage: DialogueStage::IndividualThought,
            stage_history: Vec::new(),
            stage_summaries: Vec::new(),
            sequence_number: 1,
            language,
            version,
            consensus_history: if matches!(version, Version::V2) { Some(Vec::new()) } else { None },
            sequence_output_files: None,
            metadata: None,
        }
    }

    /// Append a message, bump `updated_at`. Callers are responsible for
    /// persisting immediately after.
    pub fn append_message(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Messages belonging to the current sequence number.
    pub fn current_sequence_messages(&self) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|m| m.sequence_number == self.sequence_number)
            .collect()
    }

    pub fn messages_in_stage(&self, stage: &str, sequence_number: u32) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|m| m.sequence_number == sequence_number && m.stage.as_deref() == Some(stage))
            .collect()
    }

    /// Starts a new sequence if the previous one was completed, per the
    /// lifecycle rule ("reopens to 'active' when a new sequence
    /// starts"). No-op if the session is already active (mid-sequence).
    pub fn begin_sequence_if_completed(&mut self) {
        if self.status == SessionStatus::Completed {
            self.sequence_number += 1;
            self.status = SessionStatus::Active;
            self.current_stage = DialogueStage::IndividualThought;
        }
    }

    pub fn record_output_file(&mut self, sequence_number: u32, output_id: impl Into<String>) {
        self.sequence_output_files
            .get_or_insert_with(std::collections::HashMap::new)
            .insert(sequence_number, output_id.into());
    }

    pub fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.updated_at = Utc::now();
    }

    pub fn find_agent(&self, id: &str) -> Option<&AgentProfile> {
        self.agents.iter().find(|a| a.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_profile::{AgentPriority, AgentStyle};
    use crate::message::MessageRole;

    fn sample_agents() -> Vec<AgentProfile> {
        vec![AgentProfile::new("a1", "Alpha", AgentStyle::Logical, AgentPriority::Precision)]
    }

    #[test]
    fn new_session_starts_active_at_sequence_one() {
        let s = Session::new("s1", "t", sample_agents(), Language::En, Version::V1);
        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.sequence_number, 1);
    }

    #[test]
    fn completed_session_reopens_on_new_sequence() {
        let mut s = Session::new("s1", "t", sample_agents(), Language::En, Version::V1);
        s.complete();
        assert_eq!(s.status, SessionStatus::Completed);
        s.begin_sequence_if_completed();
        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.sequence_number, 2);
    }

    #[test]
    fn active_session_sequence_unaffected_by_begin_sequence() {
        let mut s = Session::new("s1", "t", sample_agents(), Language::En, Version::V1);
        s.begin_sequence_if_completed();
        assert_eq!(s.sequence_number, 1);
    }

    #[test]
    fn append_is_ordered_and_filters_by_sequence() {
        let mut s = Session::new("s1", "t", sample_agents(), Language::En, Version::V1);
        s.append_message(Message::new("a1", "hi", MessageRole::Agent, 1));
        s.append_message(Message::new("a1", "there", MessageRole::Agent, 1));
        assert_eq!(s.current_sequence_messages().len(), 2);
    }
}
