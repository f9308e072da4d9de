//! Parses an agent's free-text consensus-check reply into a
//! `ConsensusIndicator`.

use dialogue_core::ConsensusIndicator;

/// `gatherConsensus`'s structured prompt, embedded in the round guidance
/// the router composes, asks the agent to answer in this fixed key/value
/// shape so the reply can be parsed without an extra LM round trip.
pub const CONSENSUS_RESPONSE_FORMAT: &str = "Respond in exactly this form:\n\
SATISFACTION: <1-10>\n\
READY: yes|no\n\
ADDITIONAL_POINTS: yes|no\n\
QUESTIONS: <comma-separated questions for the others, or \"none\">\n\
REASONING: <one sentence>";

/// Parse one agent's consensus-check reply, applying the documented
/// fallback defaults on any field that fails to parse. A reply that
/// declares a *critical* remaining point forces `ready_to_finalize` to
/// `false` regardless of the `READY:` line.
pub fn parse_consensus_indicator(agent_id: &str, content: &str, fallback_satisfaction: f32) -> ConsensusIndicator {
    let mut satisfaction_level = fallback_satisfaction;
    let mut ready_to_finalize = false;
    let mut has_additional_points = false;
    let mut questions_for_others = Vec::new();
    let mut reasoning = "no specific reasoning".to_string();
    let mut declares_critical_point = false;

    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = strip_key(line, "SATISFACTION") {
            if let Ok(parsed) = rest.trim().parse::<f32>() {
                satisfaction_level = parsed.clamp(1.0, 10.0);
            }
        } else if let Some(rest) = strip_key(line, "READY") {
            ready_to_finalize = is_affirmative(rest);
        } else if let Some(rest) = strip_key(line, "ADDITIONAL_POINTS") {
            has_additional_points = is_affirmative(rest);
            if has_additional_points && rest.to_lowercase().contains("critical") {
                declares_critical_point = true;
            }
        } else if let Some(rest) = strip_key(line, "QUESTIONS") {
            let rest = rest.trim();
            if !rest.is_empty() && !rest.eq_ignore_ascii_case("none") {
                questions_for_others = rest.split(',').map(|q| q.trim().to_string()).filter(|q| !q.is_empty()).collect();
            }
        } else if let Some(rest) = strip_key(line, "REASONING") {
            let rest = rest.trim();
            if !rest.is_empty() {
                reasoning = rest.to_string();
                if reasoning.to_lowercase().contains("critical") {
                    declares_critical_point = true;
                }
            }
        }
    }

    if declares_critical_point {
        ready_to_finalize = false;
    }

    ConsensusIndicator {
        agent_id: agent_id.to_string(),
        satisfaction_level,
        has_additional_points,
        questions_for_others,
        ready_to_finalize,
        reasoning,
    }
}

fn strip_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(key).or_else(|| {
        let upper = line.to_uppercase();
        upper.starts_with(key).then(|| &line[key.len()..])
    })?;
    rest.strip_prefix(':')
}

fn is_affirmative(rest: &str) -> bool {
    matches!(rest.trim().to_lowercase().as_str(), "yes" | "y" | "true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_reply() {
        let content = "SATISFACTION: 8\nREADY: yes\nADDITIONAL_POINTS: no\nQUESTIONS: none\nREASONING: content is solid";
        let indicator = parse_consensus_indicator("agent-a", content, 5.0);
        assert_eq!(indicator.satisfaction_level, 8.0);
        assert!(indicator.ready_to_finalize);
        assert!(!indicator.has_additional_points);
        assert!(indicator.questions_for_others.is_empty());
        assert_eq!(indicator.reasoning, "content is solid");
    }

    #[test]
    fn malformed_reply_falls_back_to_defaults() {
        let indicator = parse_consensus_indicator("agent-a", "not the expected format at all", 5.0);
        assert_eq!(indicator.satisfaction_level, 5.0);
        assert!(!indicator.ready_to_finalize);
        assert!(!indicator.has_additional_points);
        assert_eq!(indicator.reasoning, "no specific reasoning");
    }

    #[test]
    fn critical_remaining_point_overrides_ready() {
        let content = "SATISFACTION: 9\nREADY: yes\nADDITIONAL_POINTS: yes critical unresolved risk\nQUESTIONS: none\nREASONING: mostly agreed";
        let indicator = parse_consensus_indicator("agent-a", content, 5.0);
        assert!(!indicator.ready_to_finalize);
    }

    #[test]
    fn parses_comma_separated_questions() {
        let content = "SATISFACTION: 6\nREADY: no\nADDITIONAL_POINTS: yes\nQUESTIONS: what about cost, what about timeline\nREASONING: still exploring";
        let indicator = parse_consensus_indicator("agent-a", content, 5.0);
        assert_eq!(indicator.questions_for_others, vec!["what about cost", "what about timeline"]);
    }
}
