//! The stateful dialogue participant: binds an `AgentProfile` to an
//! `Executor` and runs the per-stage prompt/response cycle.

use std::sync::Arc;

use dialogue_config::MemoryConfig;
use dialogue_core::{
    AgentProfile, ConsensusIndicator, DialogueStage, Document, Executor, Message, RetrieveOptions, Retriever,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::consensus_parse::{parse_consensus_indicator, CONSENSUS_RESPONSE_FORMAT};
use crate::context::select_context;

/// Events an agent emits while processing a stage, for realtime consumers.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    Thinking { stage: String },
    Responded { stage: String, content: String },
    Failed { stage: String, reason: String },
}

/// Outcome of one stage call. `success = false`
/// carries a user-safe placeholder in `content` rather than propagating
/// the underlying executor error, so a single failing agent never aborts
/// a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent_id: String,
    pub content: String,
    pub success: bool,
    pub stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote: Option<String>,
    /// Structured payload carried forward for later-stage prompt
    /// composition, e.g. `individual-thought`'s `{"approach": "..."}`
    /// used unsummarized by `mutual-reflection` and `conflict-resolution`
    ///.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_data: Option<serde_json::Value>,
}

pub struct Agent {
    profile: AgentProfile,
    executor: Arc<dyn Executor>,
    retriever: Option<Arc<dyn Retriever>>,
    memory: MemoryConfig,
    event_tx: broadcast::Sender<AgentEvent>,
}

impl Agent {
    pub fn new(profile: AgentProfile, executor: Arc<dyn Executor>, memory: MemoryConfig) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self { profile, executor, retriever: None, memory, event_tx }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.event_tx.subscribe()
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub async fn individual_thought(&self, topic: &str, history: &[Message]) -> AgentResponse {
        let user = self.compose_input(
            &format!(
                "The group is discussing: {topic}\nShare your independent initial thinking. End \
                 with a single line `APPROACH: <a short label for your overall approach>`."
            ),
            history,
        ).await;
        let mut response = self.run(DialogueStage::IndividualThought.as_str(), &user).await;
        response.stage_data = Some(serde_json::json!({ "approach": extract_approach(&response.content) }));
        response
    }

    pub async fn mutual_reflection(&self, history: &[Message]) -> AgentResponse {
        let user = self.compose_input(
            "Review the other participants' individual thoughts above. Note where you agree \
             and where you differ.",
            history,
        ).await;
        self.run(DialogueStage::MutualReflection.as_str(), &user).await
    }

    pub async fn conflict_resolution(&self, history: &[Message]) -> AgentResponse {
        let user = self.compose_input(
            "Focus on the disagreements surfaced above. Propose a concrete way to reconcile them.",
            history,
        ).await;
        self.run(DialogueStage::ConflictResolution.as_str(), &user).await
    }

    pub async fn synthesis_attempt(&self, history: &[Message]) -> AgentResponse {
        let user = self.compose_input(
            "Attempt to synthesize the group's reconciled positions into one coherent proposal.",
            history,
        ).await;
        self.run(DialogueStage::SynthesisAttempt.as_str(), &user).await
    }

    /// `voter_candidates` excludes this agent's own id.
    pub async fn output_generation(&self, history: &[Message], voter_candidates: &[String]) -> AgentResponse {
        let candidates = voter_candidates.join(", ");
        let user = self.compose_input(
            &format!(
                "Produce your final proposed output for this sequence. Then cast a vote for the \
                 participant whose output the group should adopt, on its own line formatted \
                 exactly as `VOTE: <agent-id>`.\nEligible voters: {candidates}"
            ),
            history,
        ).await;
        let mut response = self.run(DialogueStage::OutputGeneration.as_str(), &user).await;
        response.vote = extract_vote(&response.content, &self.profile.id, voter_candidates);
        response
    }

    pub async fn finalize(&self, winning_output: &str) -> AgentResponse {
        let user = format!(
            "The group selected the following output. Confirm you stand behind it, or note any \
             final objection:\n\n{winning_output}"
        );
        self.run(DialogueStage::Finalize.as_str(), &user).await
    }

    /// The v2 dynamic router's per-round `gatherConsensus` call. `round_guidance` embeds the round number and any
    /// facilitator framing; `recent_messages` is the last ~5 messages of
    /// the dialogue, pre-selected by the caller.
    pub async fn consensus_indicator(
        &self,
        round_guidance: &str,
        recent_messages: &[Message],
        fallback_satisfaction: f32,
    ) -> ConsensusIndicator {
        let transcript: String = recent_messages
            .iter()
            .map(|m| format!("[{}] {}", m.agent_id, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let user = format!("{round_guidance}\n\nRecent discussion:\n{transcript}\n\n{CONSENSUS_RESPONSE_FORMAT}");

        let response = self.run("consensus-check", &user).await;
        parse_consensus_indicator(&self.profile.id, &response.content, fallback_satisfaction)
    }

    /// One v2 round intervention (`deep_dive`, `clarification`,
    /// `perspective_shift`, `summarize`, `redirect`) targeted at this
    /// agent by the facilitator.
    pub async fn dynamic_action(&self, pseudo_stage: &str, action_prompt: &str, history: &[Message]) -> AgentResponse {
        let user = self.compose_input(action_prompt, history).await;
        self.run(pseudo_stage, &user).await
    }

    /// v2 finalizer-election vote: "who should author the final
    /// synthesis", reusing the same `VOTE:`
    /// token contract as v1 output-generation.
    pub async fn vote_for_finalizer(&self, candidates: &[String], history: &[Message]) -> AgentResponse {
        let candidate_list = candidates.join(", ");
        let user = self
            .compose_input(
                &format!(
                    "The dialogue is concluding. Vote for the participant best suited to author \
                     the final synthesis, on its own line formatted exactly as `VOTE: <agent-id>`, \
                     with a short reason.\nEligible voters: {candidate_list}"
                ),
                history,
            )
            .await;
        let mut response = self.run("voting", &user).await;
        response.vote = extract_vote(&response.content, &self.profile.id, candidates);
        response
    }

    async fn compose_input(&self, instruction: &str, history: &[Message]) -> String {
        let selected = select_context(history, &self.memory);
        let transcript: String = selected
            .iter()
            .map(|m| format!("[{}] {}", m.agent_id, m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let knowledge = self.retrieve_knowledge(instruction).await;

        let mut sections = vec![transcript, instruction.to_string()];
        if let Some(knowledge) = knowledge {
            sections.push(format!("Relevant background:\n{knowledge}"));
        }
        sections.join("\n\n")
    }

    async fn retrieve_knowledge(&self, query: &str) -> Option<String> {
        let retriever = self.retriever.as_ref()?;
        let docs = retriever
            .retrieve(query, &RetrieveOptions::default())
            .await
            .ok()?;
        if docs.is_empty() {
            return None;
        }
        Some(docs.iter().map(|d: &Document| d.content.clone()).collect::<Vec<_>>().join("\n"))
    }

    async fn run(&self, stage: &str, user: &str) -> AgentResponse {
        let _ = self.event_tx.send(AgentEvent::Thinking { stage: stage.to_string() });

        let system = self.system_prompt();
        match self.executor.execute(&system, user).await {
            Ok(result) => {
                let _ = self.event_tx.send(AgentEvent::Responded {
                    stage: stage.to_string(),
                    content: result.content.clone(),
                });
                AgentResponse {
                    agent_id: self.profile.id.clone(),
                    content: result.content,
                    success: true,
                    stage: stage.to_string(),
                    reasoning: None,
                    confidence: None,
                    vote: None,
                    stage_data: None,
                }
            }
            Err(err) => {
                let reason = err.to_string();
                tracing::warn!(agent_id = %self.profile.id, stage, error = %reason, "stage execution failed");
                let _ = self.event_tx.send(AgentEvent::Failed { stage: stage.to_string(), reason: reason.clone() });
                AgentResponse {
                    agent_id: self.profile.id.clone(),
                    content: format!("[{} could not respond this round]", self.profile.name),
                    success: false,
                    stage: stage.to_string(),
                    reasoning: Some(reason),
                    confidence: None,
                    vote: None,
                    stage_data: None,
                }
            }
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are {}, participating in a multi-agent dialogue. Style: {:?}. Priority: {:?}. \
             Personality: {}. Tone: {}.",
            self.profile.name, self.profile.style, self.profile.priority, self.profile.personality,
            self.profile.tone
        )
    }
}

/// Parse a `VOTE: <agent-id>` line, discarding self-votes and votes for
/// ids outside `candidates`.
fn extract_vote(content: &str, self_id: &str, candidates: &[String]) -> Option<String> {
    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("VOTE:") {
            let target = rest.trim();
            if target == self_id {
                return None;
            }
            if candidates.iter().any(|c| c == target) {
                return Some(target.to_string());
            }
        }
    }
    None
}

/// Parse the `APPROACH: <label>` line `individual_thought` asks for, used
/// to derive conflicts by comparing every pair's approach. Falls back
/// to a truncated prefix of the reply when the agent didn't include the
/// line.
fn extract_approach(content: &str) -> String {
    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("APPROACH:") {
            let label = rest.trim();
            if !label.is_empty() {
                return label.to_string();
            }
        }
    }
    content.trim().chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dialogue_core::{AgentPriority, AgentStyle, ExecutionResult};

    struct StubExecutor(String);

    #[async_trait]
    impl Executor for StubExecutor {
        async fn execute(&self, _system: &str, _user: &str) -> dialogue_core::Result<ExecutionResult> {
            Ok(ExecutionResult::new(self.0.clone()))
        }
        fn name(&self) -> &str {
            "stub"
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl Executor for FailingExecutor {
        async fn execute(&self, _system: &str, _user: &str) -> dialogue_core::Result<ExecutionResult> {
            Err(dialogue_core::Error::Serialization("boom".to_string()))
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    fn profile() -> AgentProfile {
        AgentProfile::new("agent-a", "Alpha", AgentStyle::Logical, AgentPriority::Precision)
    }

    #[tokio::test]
    async fn individual_thought_succeeds_with_stub_executor() {
        let agent = Agent::new(profile(), Arc::new(StubExecutor("my thought".into())), MemoryConfig::default());
        let response = agent.individual_thought("budget", &[]).await;
        assert!(response.success);
        assert_eq!(response.content, "my thought");
    }

    #[tokio::test]
    async fn individual_thought_records_approach_in_stage_data() {
        let agent = Agent::new(
            profile(),
            Arc::new(StubExecutor("Some reasoning.\nAPPROACH: incremental rollout".into())),
            MemoryConfig::default(),
        );
        let response = agent.individual_thought("budget", &[]).await;
        assert_eq!(
            response.stage_data.unwrap()["approach"],
            serde_json::json!("incremental rollout")
        );
    }

    #[tokio::test]
    async fn failure_is_isolated_not_propagated() {
        let agent = Agent::new(profile(), Arc::new(FailingExecutor), MemoryConfig::default());
        let response = agent.individual_thought("budget", &[]).await;
        assert!(!response.success);
        assert!(response.reasoning.is_some());
    }

    #[tokio::test]
    async fn output_generation_extracts_vote_for_other_agent() {
        let agent = Agent::new(
            profile(),
            Arc::new(StubExecutor("My proposal.\nVOTE: agent-b".into())),
            MemoryConfig::default(),
        );
        let response = agent
            .output_generation(&[], &["agent-b".to_string(), "agent-c".to_string()])
            .await;
        assert_eq!(response.vote, Some("agent-b".to_string()));
    }

    #[tokio::test]
    async fn output_generation_discards_self_vote() {
        let agent = Agent::new(
            profile(),
            Arc::new(StubExecutor("VOTE: agent-a".into())),
            MemoryConfig::default(),
        );
        let response = agent
            .output_generation(&[], &["agent-b".to_string()])
            .await;
        assert_eq!(response.vote, None);
    }

    #[tokio::test]
    async fn consensus_indicator_parses_executor_reply() {
        let agent = Agent::new(
            profile(),
            Arc::new(StubExecutor("SATISFACTION: 8\nREADY: yes\nADDITIONAL_POINTS: no\nQUESTIONS: none\nREASONING: clear".into())),
            MemoryConfig::default(),
        );
        let indicator = agent.consensus_indicator("Round 2 guidance", &[], 5.0).await;
        assert_eq!(indicator.satisfaction_level, 8.0);
        assert!(indicator.ready_to_finalize);
    }

    #[tokio::test]
    async fn dynamic_action_tags_response_with_pseudo_stage() {
        let agent = Agent::new(profile(), Arc::new(StubExecutor("a deeper point".into())), MemoryConfig::default());
        let response = agent.dynamic_action("deep-dive", "Go deeper on X.", &[]).await;
        assert_eq!(response.content, "a deeper point");
        assert_eq!(response.stage, "deep-dive");
    }

    #[tokio::test]
    async fn vote_for_finalizer_extracts_vote_for_other_agent() {
        let agent = Agent::new(
            profile(),
            Arc::new(StubExecutor("I'll stand by my synthesis.\nVOTE: agent-b".into())),
            MemoryConfig::default(),
        );
        let response = agent.vote_for_finalizer(&["agent-b".to_string()], &[]).await;
        assert_eq!(response.vote, Some("agent-b".to_string()));
    }
}
