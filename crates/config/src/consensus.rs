//! v2 dynamic-router consensus configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Clamped to `[5, 50]` on load.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Clamped to `[5.0, 10.0]` on load.
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f32,

    #[serde(default = "default_min_satisfaction_level")]
    pub min_satisfaction_level: f32,

    /// Used in place of an unparseable `satisfactionLevel` in a consensus
    /// response.
    #[serde(default = "default_fallback_satisfaction_level")]
    pub fallback_satisfaction_level: f32,
}

fn default_max_rounds() -> u32 {
    15
}
fn default_convergence_threshold() -> f32 {
    8.0
}
fn default_min_satisfaction_level() -> f32 {
    5.0
}
fn default_fallback_satisfaction_level() -> f32 {
    5.0
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            convergence_threshold: default_convergence_threshold(),
            min_satisfaction_level: default_min_satisfaction_level(),
            fallback_satisfaction_level: default_fallback_satisfaction_level(),
        }
    }
}

impl ConsensusConfig {
    /// Enforce the configured bounds, used after deserializing user input
    /// so an out-of-range TOML/env value cannot produce a runaway session.
    pub fn clamp(mut self) -> Self {
        self.max_rounds = self.max_rounds.clamp(5, 50);
        self.convergence_threshold = self.convergence_threshold.clamp(5.0, 10.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_bounds_max_rounds() {
        let cfg = ConsensusConfig { max_rounds: 200, ..ConsensusConfig::default() }.clamp();
        assert_eq!(cfg.max_rounds, 50);
        let cfg = ConsensusConfig { max_rounds: 1, ..ConsensusConfig::default() }.clamp();
        assert_eq!(cfg.max_rounds, 5);
    }

    #[test]
    fn clamp_bounds_convergence_threshold() {
        let cfg = ConsensusConfig { convergence_threshold: 20.0, ..ConsensusConfig::default() }.clamp();
        assert_eq!(cfg.convergence_threshold, 10.0);
    }
}
