//! Bounded-retry status polling.
//!
//! Blocking by design: callers that need a definite yes/no before
//! proceeding (for example before downloading results) poll until the job is
//! terminal or the attempt budget is spent. Terminal detection is an exact
//! match on the state tokens, never a substring check.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::domain::value_objects::JobState;
use crate::infrastructure::job_store::{JobStore, JobStoreError};

/// Polling parameters, explicit so retry behavior is testable.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Delay between status checks.
    pub interval: Duration,
    /// Maximum number of status checks before giving up.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        crate::config::PollSettings::default().to_poll_config()
    }
}

/// Sleep abstraction so tests can poll without real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Default sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Polling errors.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Job did not reach a terminal state after {attempts} attempts, last observed state {last_state}")]
    Timeout { last_state: JobState, attempts: u32 },

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Job store error: {0}")]
    Store(#[from] JobStoreError),
}

/// Blocks until a job reaches a terminal state or the attempt budget runs
/// out.
pub struct StatusPoller {
    store: Arc<dyn JobStore>,
    config: PollConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl StatusPoller {
    pub fn new(store: Arc<dyn JobStore>, config: PollConfig) -> Self {
        Self::with_sleeper(store, config, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        store: Arc<dyn JobStore>,
        config: PollConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            store,
            config,
            sleeper,
        }
    }

    /// Poll until `job_id` is terminal, waiting `interval` between checks.
    ///
    /// Returns the terminal state on success; [`PollError::Timeout`] carries
    /// the last observed non-terminal state and the number of attempts made.
    pub async fn wait_for_terminal(&self, job_id: Uuid) -> Result<JobState, PollError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_state = JobState::Created;

        for attempt in 1..=max_attempts {
            let job = self
                .store
                .get(job_id)
                .await?
                .ok_or(PollError::JobNotFound(job_id))?;

            if job.state.is_terminal() {
                return Ok(job.state);
            }
            last_state = job.state;
            debug!(job_id = %job_id, state = %job.state, attempt, "Job not terminal yet");

            if attempt < max_attempts {
                self.sleeper.sleep(self.config.interval).await;
            }
        }

        Err(PollError::Timeout {
            last_state,
            attempts: max_attempts,
        })
    }
}
