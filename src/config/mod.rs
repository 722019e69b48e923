//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Status-polling configuration (serializable version)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Delay between status checks (in milliseconds)
    pub interval_ms: u64,
    /// Maximum number of status checks before giving up
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        // The historic defaults: ten checks, one second apart.
        Self {
            interval_ms: 1000,
            max_attempts: 10,
        }
    }
}

impl PollSettings {
    /// Convert to the runtime [`PollConfig`](crate::application::poller::PollConfig)
    pub fn to_poll_config(&self) -> crate::application::poller::PollConfig {
        crate::application::poller::PollConfig {
            interval: Duration::from_millis(self.interval_ms),
            max_attempts: self.max_attempts,
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound on concurrently running engine invocations
    pub max_concurrent_engine_runs: usize,
    /// Target URIs reserved for simulation runs; never picked from a
    /// project whitelist
    pub simulation_targets: Vec<String>,
    /// Status-polling defaults handed to clients
    pub poll: PollSettings,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_engine_runs: 8,
            simulation_targets: Vec::new(),
            poll: PollSettings::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_engine_runs == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_engine_runs must be at least 1".into(),
            ));
        }
        if self.poll.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "poll.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
