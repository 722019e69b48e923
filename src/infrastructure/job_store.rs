//! Durable job record storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::Job;
use crate::domain::value_objects::JobState;

/// Job persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("Storage backend failed: {0}")]
    Backend(String),
}

/// Job storage interface.
///
/// Implementations must be safe under concurrent reads (status polling) with
/// a single writer per job (the orchestrator driving that job's transitions).
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or replace the record for `job.job_id`.
    async fn save(&self, job: Job) -> Result<(), JobStoreError>;

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, JobStoreError>;

    /// All jobs currently in `state`, ordered by creation time (FIFO).
    async fn list_in_state(&self, state: JobState) -> Result<Vec<Job>, JobStoreError>;
}

/// In-memory job store.
///
/// Suitable for tests and single-process deployments; a durable backend goes
/// behind the same trait.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn save(&self, job: Job) -> Result<(), JobStoreError> {
        self.jobs.write().await.insert(job.job_id, job);
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, JobStoreError> {
        Ok(self.jobs.read().await.get(&job_id).cloned())
    }

    async fn list_in_state(&self, state: JobState) -> Result<Vec<Job>, JobStoreError> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.state == state)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        Ok(jobs)
    }
}
