//! The v1 staged router: five fixed stages per sequence, per-stage
//! summarization, and a voting-elected finalizer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dialogue_agent::Agent;
use dialogue_config::RouterConfig;
use dialogue_core::{DialogueStage, Message, Session, StageHistoryEntry, StageSummary};
use dialogue_facilitator::Facilitator;
use dialogue_store::{OutputStore, SessionStore};
use dialogue_summarizer::{analyze_votes, ballots, Summarizer};
use tokio::time::sleep;

use crate::common::{response_to_message, shuffle_agents};
use crate::conflict::{conflicts_as_history, derive_conflicts};
use crate::error::Result;
use crate::events::{EventSink, RouterEvent};

const SUMMARIZED_STAGES: [DialogueStage; 4] = [
    DialogueStage::IndividualThought,
    DialogueStage::MutualReflection,
    DialogueStage::ConflictResolution,
    DialogueStage::SynthesisAttempt,
];

pub struct StagedRouter {
    agents: Vec<Arc<Agent>>,
    summarizer: Summarizer,
    store: Arc<dyn SessionStore>,
    output_store: Arc<OutputStore>,
    config: RouterConfig,
    events: EventSink,
    seed: Option<u64>,
}

impl StagedRouter {
    pub fn new(
        agents: Vec<Arc<Agent>>,
        summarizer: Summarizer,
        store: Arc<dyn SessionStore>,
        output_store: Arc<OutputStore>,
        config: RouterConfig,
        events: EventSink,
    ) -> Self {
        Self { agents, summarizer, store, output_store, config, events, seed: None }
    }

    /// Deterministic agent ordering for tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Run one full sequence: append the user message, then the four
    /// summarized stages, then output-generation/voting/finalize
    ///. `prompt` is the sequence's user query.
    pub async fn run_sequence(&self, session: &mut Session, prompt: &str) -> Result<()> {
        session.begin_sequence_if_completed();
        let sequence_number = session.sequence_number;

        let user_message = Message::user(prompt, sequence_number);
        session.append_message(user_message.clone());
        self.store.save_session(session).await?;
        self.emit_message(session, user_message);

        for stage in SUMMARIZED_STAGES {
            self.run_stage(session, stage, prompt).await?;
        }

        self.run_output_generation(session).await?;
        Ok(())
    }

    async fn run_stage(&self, session: &mut Session, stage: DialogueStage, prompt: &str) -> Result<()> {
        let sequence_number = session.sequence_number;
        let start_time = Utc::now();
        let shuffled = shuffle_agents(&self.agents, self.seed);
        let history = self.stage_input(session, stage, sequence_number);

        let mut agent_responses = Vec::new();
        for (i, agent) in shuffled.iter().enumerate() {
            if i > 0 {
                sleep(Duration::from_millis(self.config.inter_agent_delay_ms)).await;
            }
            let response = match stage {
                DialogueStage::IndividualThought => agent.individual_thought(prompt, &history).await,
                DialogueStage::MutualReflection => agent.mutual_reflection(&history).await,
                DialogueStage::ConflictResolution => agent.conflict_resolution(&history).await,
                DialogueStage::SynthesisAttempt => agent.synthesis_attempt(&history).await,
                _ => unreachable!("run_stage only handles the four summarized stages"),
            };
            agent_responses.push(response.agent_id.clone());
            let message = response_to_message(&response, sequence_number);
            session.append_message(message.clone());
            self.store.save_session(session).await?;
            self.emit_message(session, message);
        }

        session.stage_history.push(StageHistoryEntry {
            stage,
            start_time,
            end_time: Utc::now(),
            agent_responses,
            sequence_number,
        });
        session.current_stage = stage;

        sleep(Duration::from_millis(self.config.summarizer_delay_ms)).await;
        let messages_in_stage = session.messages_in_stage(stage.as_str(), sequence_number);
        let summary = self
            .summarizer
            .summarize_stage(stage.as_str(), &messages_in_stage, &session.agents, sequence_number)
            .await
            .map_err(|e| dialogue_core::Error::Serialization(e.to_string()))?;

        let summary_message =
            Message::system(render_summary(&summary), sequence_number).with_stage(stage.summary_stage_name());
        session.append_message(summary_message.clone());
        session.stage_summaries.push(summary);
        self.store.save_session(session).await?;
        self.emit_message(session, summary_message);
        Ok(())
    }

    /// Stage input composition rules: each stage sees a narrow,
    /// deliberately chosen slice of prior history rather than the full
    /// transcript.
    fn stage_input(&self, session: &Session, stage: DialogueStage, sequence_number: u32) -> Vec<Message> {
        match stage {
            DialogueStage::IndividualThought => prior_sequence_conclusions(session, sequence_number),
            DialogueStage::MutualReflection => session
                .messages_in_stage(DialogueStage::IndividualThought.as_str(), sequence_number)
                .into_iter()
                .cloned()
                .collect(),
            DialogueStage::ConflictResolution => {
                let individual_thoughts =
                    session.messages_in_stage(DialogueStage::IndividualThought.as_str(), sequence_number);
                conflicts_as_history(&derive_conflicts(&individual_thoughts), sequence_number)
            }
            DialogueStage::SynthesisAttempt => {
                let mut history: Vec<Message> = session
                    .messages_in_stage(DialogueStage::MutualReflection.as_str(), sequence_number)
                    .into_iter()
                    .cloned()
                    .collect();
                history.extend(
                    session
                        .messages_in_stage(&DialogueStage::ConflictResolution.summary_stage_name(), sequence_number)
                        .into_iter()
                        .cloned(),
                );
                history
            }
            _ => Vec::new(),
        }
    }

    async fn run_output_generation(&self, session: &mut Session) -> Result<()> {
        let sequence_number = session.sequence_number;
        let start_time = Utc::now();

        let mut history: Vec<Message> = session
            .messages_in_stage(DialogueStage::MutualReflection.as_str(), sequence_number)
            .into_iter()
            .cloned()
            .collect();
        history.extend(
            session
                .messages_in_stage(&DialogueStage::SynthesisAttempt.summary_stage_name(), sequence_number)
                .into_iter()
                .cloned(),
        );

        let voter_candidates: Vec<String> = session.agents.iter().map(|a| a.id.clone()).collect();
        let shuffled = shuffle_agents(&self.agents, self.seed);

        let mut responses = Vec::new();
        for (i, agent) in shuffled.iter().enumerate() {
            if i > 0 {
                sleep(Duration::from_millis(self.config.inter_agent_delay_ms)).await;
            }
            let candidates_for_agent: Vec<String> =
                voter_candidates.iter().filter(|id| *id != &agent.profile().id).cloned().collect();
            let response = agent.output_generation(&history, &candidates_for_agent).await;
            let message = response_to_message(&response, sequence_number);
            session.append_message(message.clone());
            self.store.save_session(session).await?;
            self.emit_message(session, message);
            responses.push(response);
        }

        session.stage_history.push(StageHistoryEntry {
            stage: DialogueStage::OutputGeneration,
            start_time,
            end_time: Utc::now(),
            agent_responses: responses.iter().map(|r| r.agent_id.clone()).collect(),
            sequence_number,
        });
        session.current_stage = DialogueStage::OutputGeneration;

        sleep(Duration::from_millis(self.config.inter_agent_delay_ms)).await;
        let vote_inputs: Vec<(String, String)> =
            responses.iter().map(|r| (r.agent_id.clone(), r.content.clone())).collect();
        let analysis = analyze_votes(&vote_inputs, &session.agents);

        for vote in &analysis.votes {
            if let Some(message) = session
                .messages
                .iter_mut()
                .rev()
                .find(|m| m.agent_id == vote.agent_id && m.stage.as_deref() == Some(DialogueStage::OutputGeneration.as_str()))
            {
                message.metadata.get_or_insert_with(Default::default).vote = vote.voted_agent.clone();
            }
        }
        self.store.save_session(session).await?;

        let winners = Facilitator::tally_finalize_votes(&ballots(&analysis), &voter_candidates);
        let winners = if winners.is_empty() { vec![self.config.fallback_finalizer_id.clone()] } else { winners };

        let all_outputs: String =
            responses.iter().map(|r| format!("[{}] {}", r.agent_id, r.content)).collect::<Vec<_>>().join("\n\n");
        let winning_output = format!("Votes:\n{}\n\nProposed outputs:\n{all_outputs}", analysis.content);

        let mut last_content = String::new();
        for winner_id in &winners {
            let Some(agent) = self.agents.iter().find(|a| a.profile().id == *winner_id) else { continue };
            let response = agent.finalize(&winning_output).await;
            last_content = response.content.clone();
            let message = response_to_message(&response, sequence_number);
            session.append_message(message.clone());
            self.store.save_session(session).await?;
            self.emit_message(session, message);
        }

        if !last_content.is_empty() {
            let output_id = self.output_store.save_output(&last_content)?;
            session.record_output_file(sequence_number, output_id);
        }

        session.current_stage = DialogueStage::Finalize;
        session.complete();
        self.store.save_session(session).await?;
        self.events.emit(RouterEvent::SessionCompleted { session_id: session.id.clone(), session: Box::new(session.clone()) });
        Ok(())
    }

    fn emit_message(&self, session: &Session, message: Message) {
        self.events.emit(RouterEvent::Message { session_id: session.id.clone(), message, round: None });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_config::MemoryConfig;
    use dialogue_core::{AgentPriority, AgentProfile, AgentStyle, Language, SessionStatus, Version};
    use dialogue_executor::MockExecutor;
    use dialogue_store::FileSessionStore;

    fn router(dir: &std::path::Path) -> (StagedRouter, Vec<AgentProfile>) {
        let profiles = vec![
            dialogue_core::AgentProfile::new("agent-a", "Alpha", AgentStyle::Logical, AgentPriority::Precision),
            dialogue_core::AgentProfile::new("agent-b", "Beta", AgentStyle::Emotive, AgentPriority::Breadth),
            dialogue_core::AgentProfile::new("agent-c", "Gamma", AgentStyle::Critical, AgentPriority::Depth),
        ];
        let agents: Vec<Arc<Agent>> = profiles
            .iter()
            .map(|p| Arc::new(Agent::new(p.clone(), Arc::new(MockExecutor::new(p.id.clone())), MemoryConfig::default())))
            .collect();
        let summarizer = Summarizer::new(Arc::new(MockExecutor::new("summarizer")));
        let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(dir));
        let output_store = Arc::new(OutputStore::new(dir));
        let router = StagedRouter::new(agents, summarizer, store, output_store, RouterConfig::default(), EventSink::default())
            .with_seed(7);
        (router, profiles)
    }

    #[tokio::test]
    async fn happy_path_runs_every_stage_and_completes() {
        let dir = tempfile::tempdir().unwrap();
        let (router, profiles) = router(dir.path());
        let mut session = Session::new("s1", "budget debate", profiles, Language::En, Version::V1);

        router.run_sequence(&mut session, "should we ship v1 this quarter?").await.unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.current_stage, DialogueStage::Finalize);

        let user_messages: Vec<_> = session.messages.iter().filter(|m| m.role == dialogue_core::MessageRole::User).collect();
        assert_eq!(user_messages.len(), 1);

        for stage in SUMMARIZED_STAGES {
            let summary_count =
                session.messages.iter().filter(|m| m.stage.as_deref() == Some(stage.summary_stage_name().as_str())).count();
            assert_eq!(summary_count, 1, "expected exactly one summary for {stage:?}");
        }

        let output_summary_count = session
            .messages
            .iter()
            .filter(|m| m.stage.as_deref() == Some(DialogueStage::OutputGeneration.summary_stage_name().as_str()))
            .count();
        assert_eq!(output_summary_count, 0);

        let finalize_count =
            session.messages.iter().filter(|m| m.stage.as_deref() == Some(DialogueStage::Finalize.as_str())).count();
        assert!(finalize_count >= 1);

        assert!(session.sequence_output_files.as_ref().unwrap().contains_key(&1));
    }

    #[tokio::test]
    async fn output_generation_votes_never_target_the_voter_itself() {
        let dir = tempfile::tempdir().unwrap();
        let (router, profiles) = router(dir.path());
        let mut session = Session::new("s2", "naming debate", profiles, Language::En, Version::V1);

        router.run_sequence(&mut session, "what should we name the release?").await.unwrap();

        for message in session.messages.iter().filter(|m| m.stage.as_deref() == Some(DialogueStage::OutputGeneration.as_str())) {
            if let Some(vote) = message.metadata.as_ref().and_then(|m| m.vote.as_ref()) {
                assert_ne!(vote, &message.agent_id, "a resolved vote must never target the voter itself");
            }
        }
    }

    #[tokio::test]
    async fn second_sequence_reopens_and_advances_sequence_number() {
        let dir = tempfile::tempdir().unwrap();
        let (router, profiles) = router(dir.path());
        let mut session = Session::new("s3", "round two", profiles, Language::En, Version::V1);

        router.run_sequence(&mut session, "first question").await.unwrap();
        assert_eq!(session.sequence_number, 1);
        router.run_sequence(&mut session, "follow-up question").await.unwrap();
        assert_eq!(session.sequence_number, 2);
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(session.sequence_output_files.as_ref().unwrap().contains_key(&2));
    }
}

fn render_summary(summary: &StageSummary) -> String {
    summary.positions.iter().map(|p| format!("- {}: {}", p.speaker, p.position)).collect::<Vec<_>>().join("\n")
}

/// The prior-sequence `finalize` messages, used as `individual-thought`'s
/// "conclusions" input for a later sequence in the same session.
fn prior_sequence_conclusions(session: &Session, current_sequence: u32) -> Vec<Message> {
    session
        .messages
        .iter()
        .filter(|m| m.sequence_number < current_sequence && m.stage.as_deref() == Some(DialogueStage::Finalize.as_str()))
        .cloned()
        .collect()
}
