//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

use crate::config::{Config, SchedulerConfig};
use crate::dispatch::DispatchConfig;

/// Configuration for the distribution orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Pacing, per-call timeout and default recipient address.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Countdown tick interval.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Capacity of the job update broadcast channel.
    #[serde(default = "default_update_capacity")]
    pub update_capacity: usize,
}

fn default_update_capacity() -> usize {
    64
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            scheduler: SchedulerConfig::default(),
            update_capacity: default_update_capacity(),
        }
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            dispatch: config.dispatch.clone(),
            scheduler: config.scheduler.clone(),
            update_capacity: default_update_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal() {
        let config: OrchestratorConfig = toml::from_str("").unwrap();
        assert_eq!(config.dispatch.pacing_delay_ms, 300);
        assert_eq!(config.scheduler.tick_interval_ms, 1000);
        assert_eq!(config.update_capacity, 64);
    }

    #[test]
    fn test_from_root_config() {
        let root = crate::config::load_config_from_str(
            r#"
[services]
base_url = "http://localhost:3600"

[dispatch]
pacing_delay_ms = 0

[scheduler]
tick_interval_ms = 250
"#,
        )
        .unwrap();

        let config = OrchestratorConfig::from(&root);
        assert_eq!(config.dispatch.pacing_delay_ms, 0);
        assert_eq!(config.scheduler.tick_interval_ms, 250);
    }
}
