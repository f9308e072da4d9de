//! Facilitator actions and the finalize-stage voting ballot.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FacilitatorActionType {
    DeepDive,
    Clarification,
    PerspectiveShift,
    Summarize,
    Redirect,
}

impl FacilitatorActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacilitatorActionType::DeepDive => "deep_dive",
            FacilitatorActionType::Clarification => "clarification",
            FacilitatorActionType::PerspectiveShift => "perspective_shift",
            FacilitatorActionType::Summarize => "summarize",
            FacilitatorActionType::Redirect => "redirect",
        }
    }
}

/// One decision emitted by `facilitator.analyze` for a round.
/// `target` is never `"all"` or `"auto"`: the facilitator always resolves a
/// concrete agent id (or omits the field for `summarize`/`redirect`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitatorAction {
    pub action: FacilitatorActionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub reasoning: String,
    pub prompt: String,
}

/// One resolved vote cast during `output-generation` (v1) or the finalize
/// round (v2). `voter` never equals `target`: self-votes are discarded
/// before a ballot is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingBallot {
    pub voter: String,
    pub target: String,
}

impl VotingBallot {
    /// Tally votes, returning winners in order of first appearance among
    /// the tied top vote-getters.
    pub fn tally(ballots: &[VotingBallot], candidate_order: &[String]) -> Vec<String> {
        let mut counts: std::collections::HashMap<&str, u32> = std::collections::HashMap::new();
        for b in ballots {
            *counts.entry(b.target.as_str()).or_insert(0) += 1;
        }
        let Some(&max) = counts.values().max() else {
            return Vec::new();
        };
        candidate_order
            .iter()
            .filter(|c| counts.get(c.as_str()).copied().unwrap_or(0) == max)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_preserves_candidate_order_on_tie() {
        let ballots = vec![
            VotingBallot { voter: "a".into(), target: "c".into() },
            VotingBallot { voter: "b".into(), target: "d".into() },
        ];
        let order = vec!["c".to_string(), "d".to_string()];
        let winners = VotingBallot::tally(&ballots, &order);
        assert_eq!(winners, vec!["c".to_string(), "d".to_string()]);
    }

    #[test]
    fn tally_picks_sole_majority() {
        let ballots = vec![
            VotingBallot { voter: "a".into(), target: "c".into() },
            VotingBallot { voter: "b".into(), target: "c".into() },
            VotingBallot { voter: "d".into(), target: "e".into() },
        ];
        let order = vec!["c".to_string(), "e".to_string()];
        assert_eq!(VotingBallot::tally(&ballots, &order), vec!["c".to_string()]);
    }

    #[test]
    fn empty_ballots_tally_empty() {
        assert!(VotingBallot::tally(&[], &["c".to_string()]).is_empty());
    }
}
