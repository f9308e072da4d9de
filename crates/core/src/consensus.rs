//! Consensus tracking for the v2 dynamic router.

use serde::{Deserialize, Serialize};

use crate::voting::FacilitatorAction;

/// One agent's self-reported standing for the current round, gathered by
/// `gatherConsensus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusIndicator {
    pub agent_id: String,
    /// 1.0-10.0. Falls back to the configured default on a parse failure.
    pub satisfaction_level: f32,
    /// Whether the agent says it still has points to raise.
    pub has_additional_points: bool,
    /// Questions this agent wants to put to the other participants.
    pub questions_for_others: Vec<String>,
    pub ready_to_finalize: bool,
    /// Falls back to `"no specific reasoning"` on a parse failure.
    pub reasoning: String,
}

/// One round's aggregated state, appended to `Session.consensus_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueState {
    pub round: u32,
    pub indicators: Vec<ConsensusIndicator>,
    pub overall_consensus: f32,
    /// Up to 2 actions, "Output: a `DialogueState` containing up
    /// to 2 `FacilitatorAction`s".
    #[serde(default)]
    pub suggested_actions: Vec<FacilitatorAction>,
    pub should_continue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergence_reason: Option<String>,
}

impl DialogueState {
    /// Mean satisfaction across indicators; `0.0` for an empty round, which
    /// can only happen before the first agent responds.
    pub fn compute_overall_consensus(indicators: &[ConsensusIndicator]) -> f32 {
        if indicators.is_empty() {
            return 0.0;
        }
        let sum: f32 = indicators.iter().map(|i| i.satisfaction_level).sum();
        sum / indicators.len() as f32
    }

    /// Majority of registered agents report `ready_to_finalize`.
    pub fn has_natural_majority(indicators: &[ConsensusIndicator], agent_count: usize) -> bool {
        let ready = indicators.iter().filter(|i| i.ready_to_finalize).count();
        let majority = agent_count.div_ceil(2);
        ready >= majority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicator(level: f32, ready: bool) -> ConsensusIndicator {
        ConsensusIndicator {
            agent_id: "a".into(),
            satisfaction_level: level,
            has_additional_points: !ready,
            questions_for_others: vec![],
            ready_to_finalize: ready,
            reasoning: "no specific reasoning".into(),
        }
    }

    #[test]
    fn overall_consensus_is_mean() {
        let indicators = vec![indicator(6.0, false), indicator(8.0, true)];
        assert_eq!(DialogueState::compute_overall_consensus(&indicators), 7.0);
    }

    #[test]
    fn empty_round_has_zero_consensus() {
        assert_eq!(DialogueState::compute_overall_consensus(&[]), 0.0);
    }

    #[test]
    fn majority_rounds_up_for_odd_agent_counts() {
        let indicators = vec![indicator(9.0, true), indicator(9.0, false), indicator(9.0, false)];
        // 3 agents -> majority is 2; only 1 ready here.
        assert!(!DialogueState::has_natural_majority(&indicators, 3));
        let indicators = vec![indicator(9.0, true), indicator(9.0, true), indicator(9.0, false)];
        assert!(DialogueState::has_natural_majority(&indicators, 3));
    }
}
