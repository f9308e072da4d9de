//! Facilitator decision-weighting configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitatorConfig {
    /// Relative weight per action type, higher wins ties in scoring.
    /// Keys are `FacilitatorActionType::as_str()` values.
    #[serde(default = "default_action_priority")]
    pub action_priority: HashMap<String, u32>,

    /// Minimum rounds between two facilitator interventions targeting the
    /// same action type.
    #[serde(default = "default_intervention_cooldown_rounds")]
    pub intervention_cooldown_rounds: u32,
}

fn default_action_priority() -> HashMap<String, u32> {
    let mut map = HashMap::new();
    map.insert("deep_dive".to_string(), 3);
    map.insert("clarification".to_string(), 2);
    map.insert("perspective_shift".to_string(), 3);
    map.insert("summarize".to_string(), 1);
    map.insert("redirect".to_string(), 2);
    map
}

fn default_intervention_cooldown_rounds() -> u32 {
    3
}

impl Default for FacilitatorConfig {
    fn default() -> Self {
        Self {
            action_priority: default_action_priority(),
            intervention_cooldown_rounds: default_intervention_cooldown_rounds(),
        }
    }
}
