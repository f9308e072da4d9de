//! Dialogue stage and dynamic-round stage labels

use serde::{Deserialize, Serialize};

/// The five fixed v1 dialogue stages, plus `Finalize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DialogueStage {
    #[default]
    IndividualThought,
    MutualReflection,
    ConflictResolution,
    SynthesisAttempt,
    OutputGeneration,
    Finalize,
}

impl DialogueStage {
    /// The fixed stage ordering used by the v1 staged router.
    pub const ORDER: [DialogueStage; 6] = [
        DialogueStage::IndividualThought,
        DialogueStage::MutualReflection,
        DialogueStage::ConflictResolution,
        DialogueStage::SynthesisAttempt,
        DialogueStage::OutputGeneration,
        DialogueStage::Finalize,
    ];

    /// Whether this stage's agent messages are followed by a summarizer
    /// system message. `OutputGeneration` and `Finalize` are not summarized.
    pub fn is_summarized(&self) -> bool {
        !matches!(self, DialogueStage::OutputGeneration | DialogueStage::Finalize)
    }

    pub fn index(&self) -> usize {
        Self::ORDER.iter().position(|s| s == self).expect("stage in ORDER")
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueStage::IndividualThought => "individual-thought",
            DialogueStage::MutualReflection => "mutual-reflection",
            DialogueStage::ConflictResolution => "conflict-resolution",
            DialogueStage::SynthesisAttempt => "synthesis-attempt",
            DialogueStage::OutputGeneration => "output-generation",
            DialogueStage::Finalize => "finalize",
        }
    }

    pub fn summary_stage_name(&self) -> String {
        format!("{}-summary", self.as_str())
    }
}

impl std::fmt::Display for DialogueStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// v2 dynamic-round pseudo-stage labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DynamicStage {
    DeepDive,
    Clarification,
    PerspectiveShift,
    Summary,
    Redirect,
    Facilitator,
    Voting,
}

impl DynamicStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DynamicStage::DeepDive => "deep-dive",
            DynamicStage::Clarification => "clarification",
            DynamicStage::PerspectiveShift => "perspective-shift",
            DynamicStage::Summary => "summary",
            DynamicStage::Redirect => "redirect",
            DynamicStage::Facilitator => "facilitator",
            DynamicStage::Voting => "voting",
        }
    }
}

impl std::fmt::Display for DynamicStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dialogue protocol version for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    V1,
    V2,
}

/// Session language, fixed to `en`/`ja`; other languages are out of scope
/// for the dialogue engine itself (agent prompt text is a collaborator
/// concern).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ja,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_matches_pipeline() {
        assert_eq!(DialogueStage::IndividualThought.index(), 0);
        assert_eq!(DialogueStage::Finalize.index(), 5);
    }

    #[test]
    fn summarized_stages_exclude_output_and_finalize() {
        assert!(DialogueStage::SynthesisAttempt.is_summarized());
        assert!(!DialogueStage::OutputGeneration.is_summarized());
        assert!(!DialogueStage::Finalize.is_summarized());
    }
}
