//! Global configuration, loaded from `config.toml` in the data directory.

use serde::{Deserialize, Serialize};

/// Platform-wide configuration with sensible defaults for every field,
/// so a missing or partial config file still yields a working setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Step budget for one orchestrator turn (tool calls + final answer).
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Repair-and-retry budget for one generated question.
    #[serde(default = "default_repair_attempts")]
    pub repair_attempts: u32,

    /// Wall-clock bound for ancillary generation calls (plan, per-question).
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// Capacity of the per-session event channel.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Model identifier used for the conversational turn and generation.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Maximum forms a guest identity may own.
    #[serde(default = "default_guest_form_limit")]
    pub guest_form_limit: u32,

    /// Maximum forms a member identity may own.
    #[serde(default = "default_member_form_limit")]
    pub member_form_limit: u32,
}

fn default_max_steps() -> usize {
    5
}

fn default_repair_attempts() -> u32 {
    3
}

fn default_generation_timeout_secs() -> u64 {
    20
}

fn default_event_channel_capacity() -> usize {
    256
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_guest_form_limit() -> u32 {
    3
}

fn default_member_form_limit() -> u32 {
    100
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            repair_attempts: default_repair_attempts(),
            generation_timeout_secs: default_generation_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            default_model: default_model(),
            guest_form_limit: default_guest_form_limit(),
            member_form_limit: default_member_form_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GlobalConfig::default();
        assert_eq!(config.max_steps, 5);
        assert_eq!(config.repair_attempts, 3);
        assert_eq!(config.generation_timeout_secs, 20);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: GlobalConfig = toml::from_str("max_steps = 8").unwrap();
        assert_eq!(config.max_steps, 8);
        assert_eq!(config.repair_attempts, 3);
        assert_eq!(config.default_model, "claude-sonnet-4-20250514");
    }
}
