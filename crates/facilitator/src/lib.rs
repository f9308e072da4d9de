//! The dynamic router's facilitator: a pure per-round analyser
//! that accumulates a per-session intervention log as its one side
//! effect, flushed by the caller at session end.

pub mod log;

pub use log::{FacilitatorDecision, FacilitatorLogRecord};

use std::collections::HashMap;

use chrono::Utc;
use dialogue_config::FacilitatorConfig;
use dialogue_core::{
    AgentProfile, AgentStyle, ConsensusIndicator, DialogueState, FacilitatorAction, FacilitatorActionType,
    VotingBallot,
};
use parking_lot::Mutex;

const ALL_ACTION_TYPES: [FacilitatorActionType; 5] = [
    FacilitatorActionType::DeepDive,
    FacilitatorActionType::Clarification,
    FacilitatorActionType::PerspectiveShift,
    FacilitatorActionType::Summarize,
    FacilitatorActionType::Redirect,
];

/// Input to one `Facilitator::analyze` call.
pub struct AnalysisInput<'a> {
    pub round: u32,
    pub indicators: &'a [ConsensusIndicator],
    pub agents: &'a [AgentProfile],
    /// Agent messages authored so far this sequence, including round 0.
    pub participation: &'a HashMap<String, u32>,
    /// Action types selected in the most recent rounds, oldest first,
    /// used to enforce the intervention cooldown.
    pub recent_action_types: &'a [FacilitatorActionType],
    /// Agents most recently chosen as a `deep_dive` target, most recent
    /// last, used to rotate targets.
    pub recent_deep_dive_targets: &'a [String],
}

pub struct Facilitator {
    config: FacilitatorConfig,
    log: Mutex<Vec<FacilitatorLogRecord>>,
}

impl Facilitator {
    pub fn new(config: FacilitatorConfig) -> Self {
        Self { config, log: Mutex::new(Vec::new()) }
    }

    /// Analyze one round and return its `DialogueState`, appending a log
    /// record as the method's one side effect.
    pub fn analyze(&self, input: AnalysisInput<'_>) -> DialogueState {
        let overall_consensus = DialogueState::compute_overall_consensus(input.indicators);
        let agent_count = input.agents.len();
        let natural_majority = DialogueState::has_natural_majority(input.indicators, agent_count);
        let should_continue =
            input.indicators.is_empty() || !(natural_majority || overall_consensus >= self.config.convergence_threshold);

        let suggested_actions = self.select_actions(&input, overall_consensus);

        let reasoning = if input.indicators.is_empty() {
            "no consensus data gathered yet; continuing exploration".to_string()
        } else if !should_continue {
            format!("overall consensus {overall_consensus:.1} with a natural majority ready to finalize")
        } else {
            format!("overall consensus {overall_consensus:.1}; selecting {} intervention(s)", suggested_actions.len())
        };

        self.record(&input, &reasoning, &suggested_actions);

        DialogueState {
            round: input.round,
            indicators: input.indicators.to_vec(),
            overall_consensus,
            suggested_actions,
            should_continue,
            convergence_reason: None,
        }
    }

    fn select_actions(&self, input: &AnalysisInput<'_>, overall_consensus: f32) -> Vec<FacilitatorAction> {
        if input.indicators.is_empty() {
            return Vec::new();
        }

        let median = median_participation(input.participation, input.agents);
        let cooldown = self.config.intervention_cooldown_rounds as usize;

        let mut scored: Vec<(FacilitatorActionType, f32)> = ALL_ACTION_TYPES
            .iter()
            .copied()
            .filter(|t| !cooling_down(*t, input.recent_action_types, cooldown))
            .map(|t| {
                let weight = *self.config.action_priority.get(t.as_str()).unwrap_or(&1) as f32;
                (t, weight)
            })
            .collect();

        // Prefer urgency proportional to how far below the convergence
        // threshold the group still sits, so low-consensus rounds pick
        // more assertive interventions first.
        let urgency = (self.config.convergence_threshold - overall_consensus).max(0.0);
        scored.sort_by(|a, b| (b.1 + urgency_bonus(b.0, urgency)).partial_cmp(&(a.1 + urgency_bonus(a.0, urgency))).unwrap());

        scored
            .into_iter()
            .take(2)
            .filter_map(|(action_type, _)| self.build_action(action_type, input, median))
            .collect()
    }

    fn build_action(
        &self,
        action_type: FacilitatorActionType,
        input: &AnalysisInput<'_>,
        median: f32,
    ) -> Option<FacilitatorAction> {
        match action_type {
            FacilitatorActionType::DeepDive | FacilitatorActionType::Clarification | FacilitatorActionType::PerspectiveShift => {
                let target = pick_underrepresented_target(input, median, input.recent_deep_dive_targets)?;
                Some(FacilitatorAction {
                    action: action_type,
                    reasoning: format!(
                        "{} has participated less than the group median; draw out more from them",
                        target
                    ),
                    prompt: format!("Invite {target} to go deeper on a point the group hasn't fully explored."),
                    target: Some(target),
                })
            }
            FacilitatorActionType::Summarize => {
                let preferred = pick_analytical_agent(input.agents);
                Some(FacilitatorAction {
                    action: action_type,
                    reasoning: "the round has accumulated enough positions to benefit from a recap".to_string(),
                    prompt: "Summarize the key insights, agreements, and remaining disagreements so far.".to_string(),
                    target: preferred,
                })
            }
            FacilitatorActionType::Redirect => Some(FacilitatorAction {
                action: action_type,
                reasoning: "the discussion may be drifting from the original query".to_string(),
                prompt: "Refocus the discussion on the original query.".to_string(),
                target: None,
            }),
        }
    }

    fn record(&self, input: &AnalysisInput<'_>, reasoning: &str, suggested_actions: &[FacilitatorAction]) {
        let record = FacilitatorLogRecord {
            round_number: input.round,
            timestamp: Utc::now(),
            action: "analyze".to_string(),
            decision: FacilitatorDecision {
                reasoning: reasoning.to_string(),
                data_analyzed: serde_json::json!({
                    "indicatorCount": input.indicators.len(),
                    "participation": input.participation,
                }),
                suggested_actions: suggested_actions.to_vec(),
                selected_action: suggested_actions.first().map(|a| a.action),
            },
            execution_details: serde_json::json!({ "agentCount": input.agents.len() }),
        };
        self.log.lock().push(record);
    }

    /// Drain the accumulated per-session log. Called once at session end.
    pub fn drain_log(&self) -> Vec<FacilitatorLogRecord> {
        std::mem::take(&mut *self.log.lock())
    }

    /// Tally finalize-round ballots, returning every agent id tied for
    /// the maximal vote count, in `candidate_order`. Empty input yields an empty set.
    pub fn tally_finalize_votes(ballots: &[VotingBallot], candidate_order: &[String]) -> Vec<String> {
        VotingBallot::tally(ballots, candidate_order)
    }
}

fn cooling_down(action_type: FacilitatorActionType, recent: &[FacilitatorActionType], cooldown: usize) -> bool {
    if cooldown == 0 || recent.len() < cooldown {
        return false;
    }
    recent[recent.len() - cooldown..].iter().all(|t| *t == action_type)
}

fn urgency_bonus(action_type: FacilitatorActionType, urgency: f32) -> f32 {
    match action_type {
        FacilitatorActionType::DeepDive | FacilitatorActionType::PerspectiveShift => urgency * 0.5,
        _ => 0.0,
    }
}

fn median_participation(participation: &HashMap<String, u32>, agents: &[AgentProfile]) -> f32 {
    let mut counts: Vec<u32> = agents.iter().map(|a| *participation.get(&a.id).unwrap_or(&0)).collect();
    if counts.is_empty() {
        return 0.0;
    }
    counts.sort_unstable();
    let mid = counts.len() / 2;
    if counts.len() % 2 == 0 {
        (counts[mid - 1] + counts[mid]) as f32 / 2.0
    } else {
        counts[mid] as f32
    }
}

/// Pick the least-participating agent below the median, excluding the
/// most recent rotation targets when an alternative exists.
fn pick_underrepresented_target(
    input: &AnalysisInput<'_>,
    median: f32,
    recent_targets: &[String],
) -> Option<String> {
    let mut candidates: Vec<&AgentProfile> = input
        .agents
        .iter()
        .filter(|a| (*input.participation.get(&a.id).unwrap_or(&0) as f32) < median)
        .collect();
    if candidates.is_empty() {
        candidates = input.agents.iter().collect();
    }

    let fresh: Vec<&&AgentProfile> = candidates.iter().filter(|a| !recent_targets.contains(&a.id)).collect();
    let pool: Vec<&AgentProfile> = if fresh.is_empty() { candidates } else { fresh.into_iter().copied().collect() };

    pool.into_iter()
        .min_by_key(|a| (*input.participation.get(&a.id).unwrap_or(&0), a.id.clone()))
        .map(|a| a.id.clone())
}

fn pick_analytical_agent(agents: &[AgentProfile]) -> Option<String> {
    agents
        .iter()
        .find(|a| matches!(a.style, AgentStyle::Analytical | AgentStyle::Logical))
        .or_else(|| agents.first())
        .map(|a| a.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_core::AgentPriority;

    fn agents() -> Vec<AgentProfile> {
        vec![
            AgentProfile::new("agent-a", "Alpha", AgentStyle::Logical, AgentPriority::Precision),
            AgentProfile::new("agent-b", "Beta", AgentStyle::Emotive, AgentPriority::Breadth),
            AgentProfile::new("agent-c", "Gamma", AgentStyle::Analytical, AgentPriority::Depth),
        ]
    }

    fn indicator(agent_id: &str, satisfaction: f32, ready: bool) -> ConsensusIndicator {
        ConsensusIndicator {
            agent_id: agent_id.to_string(),
            satisfaction_level: satisfaction,
            has_additional_points: !ready,
            questions_for_others: vec![],
            ready_to_finalize: ready,
            reasoning: "no specific reasoning".into(),
        }
    }

    #[test]
    fn empty_indicators_continue_with_no_actions() {
        let facilitator = Facilitator::new(FacilitatorConfig::default());
        let participation = HashMap::new();
        let state = facilitator.analyze(AnalysisInput {
            round: 0,
            indicators: &[],
            agents: &agents(),
            participation: &participation,
            recent_action_types: &[],
            recent_deep_dive_targets: &[],
        });
        assert!(state.should_continue);
        assert!(state.suggested_actions.is_empty());
    }

    #[test]
    fn high_consensus_with_majority_stops_continuing() {
        let facilitator = Facilitator::new(FacilitatorConfig::default());
        let indicators = vec![indicator("agent-a", 9.0, true), indicator("agent-b", 9.0, true), indicator("agent-c", 9.0, false)];
        let participation = HashMap::new();
        let state = facilitator.analyze(AnalysisInput {
            round: 3,
            indicators: &indicators,
            agents: &agents(),
            participation: &participation,
            recent_action_types: &[],
            recent_deep_dive_targets: &[],
        });
        assert!(!state.should_continue);
    }

    #[test]
    fn underrepresented_agent_is_targeted() {
        let facilitator = Facilitator::new(FacilitatorConfig::default());
        let indicators = vec![indicator("agent-a", 5.0, false), indicator("agent-b", 5.0, false), indicator("agent-c", 5.0, false)];
        let mut participation = HashMap::new();
        participation.insert("agent-a".to_string(), 5);
        participation.insert("agent-b".to_string(), 5);
        participation.insert("agent-c".to_string(), 0);

        let state = facilitator.analyze(AnalysisInput {
            round: 2,
            indicators: &indicators,
            agents: &agents(),
            participation: &participation,
            recent_action_types: &[],
            recent_deep_dive_targets: &[],
        });

        let targeted: Vec<&str> = state.suggested_actions.iter().filter_map(|a| a.target.as_deref()).collect();
        assert!(targeted.contains(&"agent-c"));
    }

    #[test]
    fn action_type_on_cooldown_is_skipped() {
        let facilitator = Facilitator::new(FacilitatorConfig::default());
        let indicators = vec![indicator("agent-a", 5.0, false)];
        let participation = HashMap::new();
        let recent = vec![
            FacilitatorActionType::DeepDive,
            FacilitatorActionType::DeepDive,
            FacilitatorActionType::DeepDive,
        ];
        let state = facilitator.analyze(AnalysisInput {
            round: 4,
            indicators: &indicators,
            agents: &agents(),
            participation: &participation,
            recent_action_types: &recent,
            recent_deep_dive_targets: &[],
        });
        assert!(state.suggested_actions.iter().all(|a| a.action != FacilitatorActionType::DeepDive));
    }

    #[test]
    fn log_accumulates_and_drains() {
        let facilitator = Facilitator::new(FacilitatorConfig::default());
        let participation = HashMap::new();
        let _ = facilitator.analyze(AnalysisInput {
            round: 0,
            indicators: &[],
            agents: &agents(),
            participation: &participation,
            recent_action_types: &[],
            recent_deep_dive_targets: &[],
        });
        let drained = facilitator.drain_log();
        assert_eq!(drained.len(), 1);
        assert!(facilitator.drain_log().is_empty());
    }

    #[test]
    fn tally_finalize_votes_preserves_ties() {
        let ballots = vec![
            VotingBallot { voter: "agent-a".into(), target: "agent-b".into() },
            VotingBallot { voter: "agent-c".into(), target: "agent-d".into() },
        ];
        let order = vec!["agent-b".to_string(), "agent-d".to_string()];
        let winners = Facilitator::tally_finalize_votes(&ballots, &order);
        assert_eq!(winners, vec!["agent-b".to_string(), "agent-d".to_string()]);
    }
}
