//! The v2 dynamic router: a round-based loop driven by the facilitator,
//! gathering consensus and intervening until convergence or a round cap
//!.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use dialogue_agent::Agent;
use dialogue_config::{ConsensusConfig, RouterConfig};
use dialogue_core::{
    ConsensusIndicator, DialogueState, DynamicStage, FacilitatorAction, FacilitatorActionType, Message,
    MessageMetadata, MessageRole, Session, VotingBallot, FACILITATOR_AGENT_ID,
};
use dialogue_facilitator::{AnalysisInput, Facilitator};
use dialogue_store::{OutputStore, SessionStore};

use crate::common::response_to_message;
use crate::error::Result;
use crate::events::{EventSink, RouterEvent};

/// Recent-speaker/action-type rotation windows ( "tracks recent
/// speakers (bounded to 3)").
const RECENT_SPEAKER_WINDOW: usize = 3;

pub struct DynamicRouter {
    agents: Vec<Arc<Agent>>,
    facilitator: Facilitator,
    store: Arc<dyn SessionStore>,
    output_store: Arc<OutputStore>,
    data_dir: std::path::PathBuf,
    consensus_config: ConsensusConfig,
    router_config: RouterConfig,
    events: EventSink,
}

impl DynamicRouter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agents: Vec<Arc<Agent>>,
        facilitator: Facilitator,
        store: Arc<dyn SessionStore>,
        output_store: Arc<OutputStore>,
        data_dir: impl Into<std::path::PathBuf>,
        consensus_config: ConsensusConfig,
        router_config: RouterConfig,
        events: EventSink,
    ) -> Self {
        Self {
            agents,
            facilitator,
            store,
            output_store,
            data_dir: data_dir.into(),
            consensus_config,
            router_config,
            events,
        }
    }

    pub async fn run_sequence(&self, session: &mut Session, prompt: &str) -> Result<()> {
        session.begin_sequence_if_completed();
        let sequence_number = session.sequence_number;

        let mut participation: HashMap<String, u32> = HashMap::new();
        let mut recent_speakers: VecDeque<String> = VecDeque::new();
        let mut recent_action_types: Vec<FacilitatorActionType> = Vec::new();
        let mut recent_deep_dive_targets: Vec<String> = Vec::new();

        let user_message = Message::user(prompt, sequence_number);
        self.append_and_emit(session, user_message, None).await?;

        let initial_responses = self.gather_initial_responses(prompt).await;
        for response in &initial_responses {
            track_participation(&mut participation, &mut recent_speakers, &response.agent_id);
            let message = response_to_message(response, sequence_number);
            self.append_and_emit(session, message, Some(0)).await?;
        }

        let initial_state = self.facilitator.analyze(AnalysisInput {
            round: 0,
            indicators: &[],
            agents: &session.agents,
            participation: &participation,
            recent_action_types: &recent_action_types,
            recent_deep_dive_targets: &recent_deep_dive_targets,
        });
        self.record_round(session, initial_state.clone());
        self.append_facilitator_message(session, &initial_state, 0).await?;

        let mut round = 0u32;
        let mut convergence_reason: Option<String> = None;

        while round < self.consensus_config.max_rounds {
            round += 1;
            self.events.emit(RouterEvent::RoundStart { session_id: session.id.clone(), round, timestamp: Utc::now() });

            let (indicators, dialogue_state) = if round == 1 {
                let state = self.facilitator.analyze(AnalysisInput {
                    round,
                    indicators: &[],
                    agents: &session.agents,
                    participation: &participation,
                    recent_action_types: &recent_action_types,
                    recent_deep_dive_targets: &recent_deep_dive_targets,
                });
                (Vec::new(), state)
            } else {
                let recent = last_n_messages(session, 5);
                let guidance = format!("Round {round} consensus check for: {prompt}");
                let indicators = self.gather_consensus(&guidance, &recent).await;
                let state = self.facilitator.analyze(AnalysisInput {
                    round,
                    indicators: &indicators,
                    agents: &session.agents,
                    participation: &participation,
                    recent_action_types: &recent_action_types,
                    recent_deep_dive_targets: &recent_deep_dive_targets,
                });
                let snapshot = consensus_snapshot_message(&indicators, state.overall_consensus, sequence_number);
                self.append_and_emit(session, snapshot, Some(round)).await?;
                self.events.emit(RouterEvent::ConsensusUpdate {
                    session_id: session.id.clone(),
                    consensus_level: state.overall_consensus,
                    round,
                });
                (indicators, state)
            };

            self.append_facilitator_message(session, &dialogue_state, round).await?;

            if let Some(reason) = evaluate_convergence(&dialogue_state, &indicators, round, session.agents.len()) {
                let mut converged_state = dialogue_state.clone();
                converged_state.convergence_reason = Some(reason.clone());
                self.record_round(session, converged_state);
                let message = convergence_message(&reason, sequence_number);
                self.append_and_emit(session, message, Some(round)).await?;
                convergence_reason = Some(reason);
                break;
            }
            self.record_round(session, dialogue_state.clone());

            for action in dialogue_state.suggested_actions.iter().take(2) {
                let target_id = resolve_target(action, &self.agents, &participation, &recent_speakers);
                let Some(agent) = self.agents.iter().find(|a| a.profile().id == target_id) else { continue };

                let history: Vec<Message> = session.messages.clone();
                let prompt_text = compose_action_prompt(action);
                let response = agent.dynamic_action(pseudo_stage_for(action.action), &prompt_text, &history).await;

                track_participation(&mut participation, &mut recent_speakers, &target_id);
                recent_action_types.push(action.action);
                if action.action == FacilitatorActionType::DeepDive {
                    recent_deep_dive_targets.push(target_id.clone());
                    if recent_deep_dive_targets.len() > RECENT_SPEAKER_WINDOW {
                        recent_deep_dive_targets.remove(0);
                    }
                }

                let mut message = response_to_message(&response, sequence_number);
                message.metadata.get_or_insert_with(Default::default).facilitator_action =
                    Some(action.action.as_str().to_string());
                self.append_and_emit(session, message, Some(round)).await?;
            }
        }

        if convergence_reason.is_none() {
            let message = convergence_message("max_rounds", sequence_number);
            self.append_and_emit(session, message, Some(round)).await?;
        }

        self.run_finalizer_voting(session).await?;

        dialogue_store::save_facilitator_log(&self.data_dir, &session.id, &self.facilitator.drain_log())?;

        session.complete();
        self.store.save_session(session).await?;
        self.events.emit(RouterEvent::SessionCompleted { session_id: session.id.clone(), session: Box::new(session.clone()) });
        Ok(())
    }

    async fn gather_initial_responses(&self, prompt: &str) -> Vec<dialogue_agent::AgentResponse> {
        let futures = self.agents.iter().map(|agent| {
            let agent = Arc::clone(agent);
            let prompt = prompt.to_string();
            async move { agent.individual_thought(&prompt, &[]).await }
        });
        futures::future::join_all(futures).await
    }

    /// `gatherConsensus`: shuffle agents, poll each for a consensus
    /// indicator, early-exit once a majority favor continuing, and
    /// synthesize a record for any agent left unpolled.
    async fn gather_consensus(&self, round_guidance: &str, recent_messages: &[Message]) -> Vec<ConsensusIndicator> {
        let shuffled = crate::common::shuffle_agents(&self.agents, None);
        let majority = shuffled.len().div_ceil(2);

        let mut indicators = Vec::new();
        let mut continuing = 0usize;
        let mut polled = std::collections::HashSet::new();

        for agent in &shuffled {
            let id = agent.profile().id.clone();
            if polled.contains(&id) {
                continue;
            }
            let indicator = agent
                .consensus_indicator(round_guidance, recent_messages, self.consensus_config.fallback_satisfaction_level)
                .await;
            polled.insert(id);
            if indicator.has_additional_points || !indicator.ready_to_finalize {
                continuing += 1;
            }
            indicators.push(indicator);
            if continuing >= majority {
                break;
            }
        }

        for agent in &shuffled {
            let id = agent.profile().id.clone();
            if !polled.contains(&id) {
                indicators.push(ConsensusIndicator {
                    agent_id: id,
                    satisfaction_level: 6.0,
                    has_additional_points: true,
                    questions_for_others: Vec::new(),
                    ready_to_finalize: false,
                    reasoning: "assumed continuing".to_string(),
                });
            }
        }
        indicators
    }

    async fn run_finalizer_voting(&self, session: &mut Session) -> Result<()> {
        let sequence_number = session.sequence_number;
        let candidates: Vec<String> = self.agents.iter().map(|a| a.profile().id.clone()).collect();
        let history: Vec<Message> = session.messages.clone();

        let mut ballots = Vec::new();
        for agent in &self.agents {
            let candidates_for_agent: Vec<String> =
                candidates.iter().filter(|id| *id != &agent.profile().id).cloned().collect();
            let response = agent.vote_for_finalizer(&candidates_for_agent, &history).await;
            if let Some(target) = &response.vote {
                ballots.push(VotingBallot { voter: response.agent_id.clone(), target: target.clone() });
            }
        }

        let winners = Facilitator::tally_finalize_votes(&ballots, &candidates);
        let winners = if winners.is_empty() {
            vec![self.router_config.fallback_finalizer_id.clone()]
        } else {
            winners
        };

        let mut last_content = String::new();
        let total = winners.len();
        for (idx, winner_id) in winners.iter().enumerate() {
            let Some(agent) = self.agents.iter().find(|a| a.profile().id == *winner_id) else { continue };
            let turn_note = collaborative_turn_note(idx, total);
            let winning_output =
                if last_content.is_empty() { turn_note.to_string() } else { format!("{last_content}\n\n{turn_note}") };
            let response = agent.finalize(&winning_output).await;
            last_content = response.content.clone();
            let message = response_to_message(&response, sequence_number);
            self.append_and_emit(session, message, None).await?;
        }

        if !last_content.is_empty() {
            let output_id = self.output_store.save_output(&last_content)?;
            session.record_output_file(sequence_number, output_id);
        }
        Ok(())
    }

    async fn append_facilitator_message(&self, session: &mut Session, state: &DialogueState, round: u32) -> Result<()> {
        let message = facilitator_message(state, session.sequence_number);
        let primary = state.suggested_actions.first();
        self.append_and_emit(session, message, Some(round)).await?;
        self.events.emit(RouterEvent::FacilitatorAction {
            session_id: session.id.clone(),
            action: primary.map(|a| a.action.as_str().to_string()).unwrap_or_else(|| "none".to_string()),
            target: primary.and_then(|a| a.target.clone()),
            reason: primary.map(|a| a.reasoning.clone()).unwrap_or_else(|| "no intervention needed this round".to_string()),
        });
        Ok(())
    }

    async fn append_and_emit(&self, session: &mut Session, message: Message, round: Option<u32>) -> Result<()> {
        session.append_message(message.clone());
        self.store.save_session(session).await?;
        self.events.emit(RouterEvent::Message { session_id: session.id.clone(), message, round });
        Ok(())
    }

    fn record_round(&self, session: &mut Session, state: DialogueState) {
        session.consensus_history.get_or_insert_with(Vec::new).push(state);
    }
}

fn track_participation(participation: &mut HashMap<String, u32>, recent_speakers: &mut VecDeque<String>, agent_id: &str) {
    *participation.entry(agent_id.to_string()).or_insert(0) += 1;
    recent_speakers.push_back(agent_id.to_string());
    while recent_speakers.len() > RECENT_SPEAKER_WINDOW {
        recent_speakers.pop_front();
    }
}

fn last_n_messages(session: &Session, n: usize) -> Vec<Message> {
    let current = session.current_sequence_messages();
    current.into_iter().rev().take(n).rev().cloned().collect()
}

fn consensus_snapshot_message(indicators: &[ConsensusIndicator], overall: f32, sequence_number: u32) -> Message {
    let lines: Vec<String> = indicators
        .iter()
        .map(|i| format!("{}: satisfaction {:.1}, ready={}", i.agent_id, i.satisfaction_level, i.ready_to_finalize))
        .collect();
    let content = format!("Consensus check — overall {overall:.1}/10\n{}", lines.join("\n"));
    Message::new(FACILITATOR_AGENT_ID, content, MessageRole::System, sequence_number).with_stage("consensus-snapshot")
}

fn facilitator_message(state: &DialogueState, sequence_number: u32) -> Message {
    let primary = state.suggested_actions.first();
    let content = match primary {
        Some(a) => format!("Facilitator: {} (target: {}) — {}", a.action.as_str(), a.target.as_deref().unwrap_or("group"), a.reasoning),
        None => "Facilitator: continuing discussion, no intervention needed this round.".to_string(),
    };
    Message::new(FACILITATOR_AGENT_ID, content, MessageRole::System, sequence_number)
        .with_stage(DynamicStage::Facilitator.as_str())
        .with_metadata(MessageMetadata {
            facilitator_action: primary.map(|a| a.action.as_str().to_string()),
            ..Default::default()
        })
}

fn convergence_message(reason: &str, sequence_number: u32) -> Message {
    Message::system(format!("Dialogue converged: {reason}"), sequence_number).with_stage("convergence")
}

/// Router-level convergence rule. Evaluated in the documented
/// priority order; overlapping conditions resolve to the first match
/// (see DESIGN.md for the Open-Question decision).
fn evaluate_convergence(
    state: &DialogueState,
    indicators: &[ConsensusIndicator],
    round: u32,
    agent_count: usize,
) -> Option<String> {
    if indicators.is_empty() {
        return None;
    }
    if !state.should_continue {
        return Some("facilitator_decision".to_string());
    }
    if state.overall_consensus >= 7.0 && round >= 3 {
        return Some("natural_consensus".to_string());
    }
    let ready_count = indicators.iter().filter(|i| i.ready_to_finalize).count();
    let majority = agent_count.div_ceil(2);
    if state.overall_consensus >= 8.0 && ready_count >= majority && round >= 2 {
        return Some("high_satisfaction".to_string());
    }
    None
}

fn pseudo_stage_for(action_type: FacilitatorActionType) -> &'static str {
    match action_type {
        FacilitatorActionType::DeepDive => DynamicStage::DeepDive.as_str(),
        FacilitatorActionType::Clarification => DynamicStage::Clarification.as_str(),
        FacilitatorActionType::PerspectiveShift => DynamicStage::PerspectiveShift.as_str(),
        FacilitatorActionType::Summarize => DynamicStage::Summary.as_str(),
        FacilitatorActionType::Redirect => DynamicStage::Redirect.as_str(),
    }
}

fn compose_action_prompt(action: &FacilitatorAction) -> String {
    match action.action {
        FacilitatorActionType::Summarize => format!(
            "{} Close by naming the overall direction the group seems to be heading in.",
            action.prompt
        ),
        FacilitatorActionType::Redirect => format!(
            "{} Note explicitly that the conversation may have drifted and must return to the original query.",
            action.prompt
        ),
        _ => format!(
            "{}\n\nGround your reply in specific points other participants have raised. Avoid a formulaic \
             greeting. Aim for roughly 150-200 words and close with a question or a well-chosen metaphor \
             that invites a response.",
            action.prompt
        ),
    }
}

/// Resolve a concrete target for an action, falling back to the
/// least-participating agent (excluding recent speakers when an
/// alternative exists) when the facilitator left no explicit target
///.
fn resolve_target(
    action: &FacilitatorAction,
    agents: &[Arc<Agent>],
    participation: &HashMap<String, u32>,
    recent_speakers: &VecDeque<String>,
) -> String {
    if let Some(target) = &action.target {
        return target.clone();
    }
    let candidates: Vec<&Arc<Agent>> = agents.iter().collect();
    let fresh: Vec<&&Arc<Agent>> =
        candidates.iter().filter(|a| !recent_speakers.contains(&a.profile().id)).collect();
    let pool: Vec<&Arc<Agent>> = if fresh.is_empty() { candidates } else { fresh.into_iter().copied().collect() };
    pool.into_iter()
        .min_by_key(|a| *participation.get(&a.profile().id).unwrap_or(&0))
        .map(|a| a.profile().id.clone())
        .unwrap_or_else(|| agents[0].profile().id.clone())
}

fn collaborative_turn_note(index: usize, total: usize) -> &'static str {
    if total <= 1 {
        "The group selected your output. Confirm you stand behind it, or note any final objection."
    } else if index == 0 {
        "You are the first of several co-selected finalizers. Set the frame the others will build on."
    } else if index == total - 1 {
        "You are the final finalizer. Produce the group's definitive answer, weaving in the prior finalizers' framing."
    } else {
        "You are a middle finalizer. Build on the prior finalizer's framing before passing it on."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convergence_honors_facilitator_decision_first() {
        let state = DialogueState {
            round: 3,
            indicators: vec![],
            overall_consensus: 9.0,
            suggested_actions: vec![],
            should_continue: false,
            convergence_reason: None,
        };
        let indicators = vec![sample_indicator("a", 9.0, true)];
        assert_eq!(evaluate_convergence(&state, &indicators, 3, 3), Some("facilitator_decision".to_string()));
    }

    #[test]
    fn convergence_via_natural_consensus_requires_round_three() {
        let state = DialogueState {
            round: 2,
            indicators: vec![],
            overall_consensus: 8.0,
            suggested_actions: vec![],
            should_continue: true,
            convergence_reason: None,
        };
        let indicators = vec![sample_indicator("a", 8.0, false)];
        assert_eq!(evaluate_convergence(&state, &indicators, 2, 3), None);
        assert_eq!(evaluate_convergence(&state, &indicators, 3, 3), Some("natural_consensus".to_string()));
    }

    #[test]
    fn empty_indicators_never_converge() {
        let state = DialogueState {
            round: 5,
            indicators: vec![],
            overall_consensus: 0.0,
            suggested_actions: vec![],
            should_continue: false,
            convergence_reason: None,
        };
        assert_eq!(evaluate_convergence(&state, &[], 5, 3), None);
    }

    fn sample_indicator(agent_id: &str, satisfaction: f32, ready: bool) -> ConsensusIndicator {
        ConsensusIndicator {
            agent_id: agent_id.to_string(),
            satisfaction_level: satisfaction,
            has_additional_points: !ready,
            questions_for_others: vec![],
            ready_to_finalize: ready,
            reasoning: "no specific reasoning".into(),
        }
    }
}
