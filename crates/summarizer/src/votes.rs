//! Vote-token parsing for `output-generation` (v1) and finalizer voting
//! (v2).
//!
//! Recognized forms: `Agent Vote: <id>`, `投票: <id|name>`, `Vote: <id>`,
//! plus bolded/backticked id variants. Resolution is case-insensitive on
//! ids and accepts exact names; self-votes are discarded silently.

use dialogue_core::{AgentProfile, VotingBallot};
use regex::Regex;
use std::sync::OnceLock;

static VOTE_LINE: OnceLock<Regex> = OnceLock::new();
static MARKUP: OnceLock<Regex> = OnceLock::new();

fn vote_line() -> &'static Regex {
    VOTE_LINE.get_or_init(|| Regex::new(r"(?i)(?:agent\s+vote|vote|投票)\s*[:：]\s*(.+)$").unwrap())
}

fn markup() -> &'static Regex {
    MARKUP.get_or_init(|| Regex::new(r"[*`_]").unwrap())
}

fn clean_token(raw: &str) -> String {
    markup().replace_all(raw, "").trim().trim_end_matches('.').to_string()
}

/// One responder's vote outcome.
#[derive(Debug, Clone)]
pub struct VoteRecord {
    pub agent_id: String,
    pub voted_agent: Option<String>,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VoteAnalysis {
    pub votes: Vec<VoteRecord>,
    pub content: String,
}

fn resolve_agent<'a>(token: &str, agents: &'a [AgentProfile]) -> Option<&'a AgentProfile> {
    let token_lower = token.to_lowercase();
    agents
        .iter()
        .find(|a| a.id.to_lowercase() == token_lower || a.name.to_lowercase() == token_lower)
}

/// Split a captured vote-line tail into `(target_token, reasoning)`.
fn split_target_and_reasoning(tail: &str) -> (String, Option<String>) {
    let cleaned = clean_token(tail);
    for sep in [" - ", " because ", " — "] {
        if let Some((target, reasoning)) = cleaned.split_once(sep) {
            let reasoning = reasoning.trim();
            return (
                target.trim().to_string(),
                if reasoning.is_empty() { None } else { Some(reasoning.to_string()) },
            );
        }
    }
    (cleaned, None)
}

/// Extract one vote per responder from a batch of `output-generation`
/// responses. `responses` is `(agent_id, content)`.
pub fn analyze_votes(responses: &[(String, String)], agents: &[AgentProfile]) -> VoteAnalysis {
    let mut votes = Vec::new();
    let mut content_lines = Vec::new();

    for (agent_id, text) in responses {
        let mut voted_agent = None;
        let mut reasoning = None;

        for line in text.lines() {
            let Some(caps) = vote_line().captures(line) else { continue };
            let tail = caps.get(1).unwrap().as_str();
            let (token, parsed_reasoning) = split_target_and_reasoning(tail);

            let Some(target) = resolve_agent(&token, agents) else {
                tracing::warn!(agent_id, token = %token, "vote token did not resolve to a registered agent");
                continue;
            };

            if target.id.eq_ignore_ascii_case(agent_id) {
                tracing::debug!(agent_id, "self-vote discarded");
                continue;
            }

            voted_agent = Some(target.id.clone());
            reasoning = parsed_reasoning;
            break;
        }

        if let Some(target) = &voted_agent {
            content_lines.push(format!("{agent_id} -> {target}"));
        }

        votes.push(VoteRecord { agent_id: agent_id.clone(), voted_agent, reasoning });
    }

    VoteAnalysis { votes, content: content_lines.join("\n") }
}

/// Convert resolved votes into ballots for `VotingBallot::tally`.
pub fn ballots(analysis: &VoteAnalysis) -> Vec<VotingBallot> {
    analysis
        .votes
        .iter()
        .filter_map(|v| {
            v.voted_agent.as_ref().map(|target| VotingBallot { voter: v.agent_id.clone(), target: target.clone() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_core::{AgentPriority, AgentStyle};

    fn agents() -> Vec<AgentProfile> {
        vec![
            AgentProfile::new("agent-a", "Alpha", AgentStyle::Logical, AgentPriority::Precision),
            AgentProfile::new("agent-b", "Beta", AgentStyle::Emotive, AgentPriority::Breadth),
        ]
    }

    #[test]
    fn parses_plain_vote_form() {
        let responses = vec![("agent-a".to_string(), "My answer.\nVote: agent-b".to_string())];
        let analysis = analyze_votes(&responses, &agents());
        assert_eq!(analysis.votes[0].voted_agent, Some("agent-b".to_string()));
    }

    #[test]
    fn parses_agent_vote_form_with_reasoning() {
        let responses =
            vec![("agent-a".to_string(), "Agent Vote: Beta - because of broader coverage".to_string())];
        let analysis = analyze_votes(&responses, &agents());
        assert_eq!(analysis.votes[0].voted_agent, Some("agent-b".to_string()));
        assert_eq!(analysis.votes[0].reasoning.as_deref(), Some("because of broader coverage"));
    }

    #[test]
    fn parses_japanese_vote_token() {
        let responses = vec![("agent-a".to_string(), "投票: agent-b".to_string())];
        let analysis = analyze_votes(&responses, &agents());
        assert_eq!(analysis.votes[0].voted_agent, Some("agent-b".to_string()));
    }

    #[test]
    fn parses_bolded_and_backticked_ids() {
        let responses = vec![("agent-a".to_string(), "Vote: **`agent-b`**".to_string())];
        let analysis = analyze_votes(&responses, &agents());
        assert_eq!(analysis.votes[0].voted_agent, Some("agent-b".to_string()));
    }

    #[test]
    fn self_votes_are_discarded_silently() {
        let responses = vec![("agent-a".to_string(), "Vote: agent-a".to_string())];
        let analysis = analyze_votes(&responses, &agents());
        assert_eq!(analysis.votes[0].voted_agent, None);
    }

    #[test]
    fn ballots_exclude_unresolved_and_self_votes() {
        let responses = vec![
            ("agent-a".to_string(), "Vote: agent-b".to_string()),
            ("agent-b".to_string(), "Vote: agent-b".to_string()),
        ];
        let analysis = analyze_votes(&responses, &agents());
        let ballots = ballots(&analysis);
        assert_eq!(ballots.len(), 1);
        assert_eq!(ballots[0].voter, "agent-a");
    }
}
