//! Derives `conflict-resolution` stage input from `individual-thought`
//! `stageData`.

use dialogue_core::{Conflict, ConflictSeverity, Message, MessageRole};

/// Compare every pair of `individual-thought` responses' `approach`
/// field and emit a `Conflict` for each differing pair,
/// ("conflicts are generated by comparing every pair and emitting a
/// `Conflict` record for differing `approach` fields with severity
/// `medium`").
pub fn derive_conflicts(individual_thought_messages: &[&Message]) -> Vec<Conflict> {
    let approaches: Vec<(&str, &str)> = individual_thought_messages
        .iter()
        .filter_map(|m| {
            let approach = m.metadata.as_ref()?.stage_data.as_ref()?.get("approach")?.as_str()?;
            Some((m.agent_id.as_str(), approach))
        })
        .collect();

    let mut conflicts = Vec::new();
    for i in 0..approaches.len() {
        for j in (i + 1)..approaches.len() {
            let (agent_a, approach_a) = approaches[i];
            let (agent_b, approach_b) = approaches[j];
            if approach_a != approach_b {
                conflicts.push(Conflict {
                    agent_a: agent_a.to_string(),
                    agent_b: agent_b.to_string(),
                    description: format!(
                        "{agent_a} favors \"{approach_a}\" while {agent_b} favors \"{approach_b}\""
                    ),
                    severity: ConflictSeverity::Medium,
                });
            }
        }
    }
    conflicts
}

/// Render derived conflicts as synthetic, non-persisted messages so they
/// can be fed through `Agent::conflict_resolution`'s ordinary
/// history-composition path without a separate prompt-building branch.
pub fn conflicts_as_history(conflicts: &[Conflict], sequence_number: u32) -> Vec<Message> {
    conflicts
        .iter()
        .map(|c| {
            Message::new(
                dialogue_core::SYSTEM_AGENT_ID,
                format!("Conflict: {}", c.description),
                MessageRole::System,
                sequence_number,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_core::MessageMetadata;

    fn thought(agent_id: &str, approach: &str, sequence_number: u32) -> Message {
        Message::new(agent_id, "reasoning", MessageRole::Agent, sequence_number).with_metadata(MessageMetadata {
            stage_data: Some(serde_json::json!({ "approach": approach })),
            ..Default::default()
        })
    }

    #[test]
    fn differing_approaches_produce_a_conflict() {
        let a = thought("agent-a", "top-down", 1);
        let b = thought("agent-b", "bottom-up", 1);
        let conflicts = derive_conflicts(&[&a, &b]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].agent_a, "agent-a");
        assert_eq!(conflicts[0].agent_b, "agent-b");
    }

    #[test]
    fn matching_approaches_produce_no_conflict() {
        let a = thought("agent-a", "top-down", 1);
        let b = thought("agent-b", "top-down", 1);
        assert!(derive_conflicts(&[&a, &b]).is_empty());
    }

    #[test]
    fn three_agents_compares_every_pair() {
        let a = thought("agent-a", "x", 1);
        let b = thought("agent-b", "y", 1);
        let c = thought("agent-c", "x", 1);
        let conflicts = derive_conflicts(&[&a, &b, &c]);
        assert_eq!(conflicts.len(), 2);
    }

    #[test]
    fn missing_approach_data_is_skipped() {
        let a = Message::new("agent-a", "no stage data", MessageRole::Agent, 1);
        let b = thought("agent-b", "y", 1);
        assert!(derive_conflicts(&[&a, &b]).is_empty());
    }
}
