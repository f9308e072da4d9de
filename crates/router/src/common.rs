//! Helpers shared by the staged and dynamic routers.

use std::sync::Arc;

use dialogue_agent::{Agent, AgentResponse};
use dialogue_core::{Message, MessageMetadata, MessageRole};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Convert one stage's `AgentResponse` into an appendable `Message`,
/// carrying its reasoning/confidence/vote/stageData into message
/// metadata.
pub fn response_to_message(response: &AgentResponse, sequence_number: u32) -> Message {
    let metadata = MessageMetadata {
        reasoning: response.reasoning.clone(),
        confidence: response.confidence,
        vote: response.vote.clone(),
        facilitator_action: None,
        stage_data: response.stage_data.clone(),
        extra: Default::default(),
    };
    Message::new(response.agent_id.clone(), response.content.clone(), MessageRole::Agent, sequence_number)
        .with_stage(response.stage.clone())
        .with_metadata(metadata)
}

/// Uniform random permutation of the agent list, deterministic only
/// when `seed` is given.
pub fn shuffle_agents(agents: &[Arc<Agent>], seed: Option<u64>) -> Vec<Arc<Agent>> {
    let mut shuffled: Vec<Arc<Agent>> = agents.to_vec();
    match seed {
        Some(seed) => shuffled.shuffle(&mut StdRng::seed_from_u64(seed)),
        None => shuffled.shuffle(&mut rand::thread_rng()),
    }
    shuffled
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_config::MemoryConfig;
    use dialogue_core::{AgentPriority, AgentProfile, AgentStyle};
    use dialogue_executor::MockExecutor;

    fn agent(id: &str) -> Arc<Agent> {
        Arc::new(Agent::new(
            AgentProfile::new(id, id, AgentStyle::Logical, AgentPriority::Precision),
            Arc::new(MockExecutor::default()),
            MemoryConfig::default(),
        ))
    }

    #[test]
    fn seeded_shuffle_is_deterministic() {
        let agents = vec![agent("a"), agent("b"), agent("c"), agent("d")];
        let first = shuffle_agents(&agents, Some(7));
        let second = shuffle_agents(&agents, Some(7));
        let first_ids: Vec<&str> = first.iter().map(|a| a.profile().id.as_str()).collect();
        let second_ids: Vec<&str> = second.iter().map(|a| a.profile().id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn response_to_message_carries_metadata() {
        let response = AgentResponse {
            agent_id: "agent-a".into(),
            content: "hi".into(),
            success: true,
            stage: "individual-thought".into(),
            reasoning: Some("because".into()),
            confidence: Some(0.8),
            vote: None,
            stage_data: Some(serde_json::json!({ "approach": "x" })),
        };
        let message = response_to_message(&response, 1);
        assert_eq!(message.stage.as_deref(), Some("individual-thought"));
        assert_eq!(message.metadata.unwrap().reasoning.as_deref(), Some("because"));
    }
}
