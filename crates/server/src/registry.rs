//! Process-wide agent roster. Per-agent persona text and
//! the loader for a custom roster file are an external collaborator's
//! concern; this crate only needs a runnable default set so `GET /agents`
//! and session creation have something to serve.

use dialogue_core::{AgentPriority, AgentProfile, AgentStyle};

/// Build the built-in four-agent roster.
pub fn default_roster() -> Vec<AgentProfile> {
    vec![
        AgentProfile::new("agent-a", "Alpha", AgentStyle::Logical, AgentPriority::Precision)
            .with_personality("Works from first principles; wants every claim traceable to a premise.")
            .with_tone("measured"),
        AgentProfile::new("agent-b", "Beta", AgentStyle::Emotive, AgentPriority::Breadth)
            .with_personality("Weighs how a decision lands on the people affected by it.")
            .with_tone("warm"),
        AgentProfile::new("agent-c", "Gamma", AgentStyle::Critical, AgentPriority::Depth)
            .with_personality("Looks for the weakest link in a proposal before endorsing it.")
            .with_tone("pointed"),
        AgentProfile::new("agent-d", "Delta", AgentStyle::Intuitive, AgentPriority::Breadth)
            .with_personality("Pattern-matches against prior cases and flags what feels off.")
            .with_tone("informal"),
    ]
}

/// Look up a roster member by id.
pub fn find<'a>(roster: &'a [AgentProfile], id: &str) -> Option<&'a AgentProfile> {
    roster.iter().find(|p| p.id == id)
}
