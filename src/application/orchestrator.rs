//! Job orchestration — the state machine driving scan jobs from creation
//! through termination.
//!
//! Every status transition goes through [`JobOrchestrator`], which validates
//! the transition against the state machine on
//! [`JobState`](crate::domain::value_objects::JobState), persists the job,
//! and records an audit-trail entry.
//!
//! ```text
//! Client            JobOrchestrator        JobStore    Engine task
//!   │                     │                   │             │
//!   ├─ create() ─────────►│── save ──────────►│             │
//!   │◄── Job(CREATED) ────┤                   │             │
//!   ├─ approve() ────────►│── save ──────────►│             │
//!   ├─ start() ──────────►│── save(STARTED) ─►│── spawn ───►│
//!   │◄── Ok ──────────────┤                   │             │
//!   │                     │◄── record result + log ─────────┤
//!   │                     │── save(ENDED) ───►│             │
//! ```
//!
//! Each job's transitions are serialized through a per-job lock; the engine
//! is dispatched at most once per job. Cancellation is cooperative toward
//! the engine but authoritative for the job state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::aggregator::ResultAggregator;
use crate::config::OrchestratorConfig;
use crate::domain::engine::{EngineExecutionError, EngineRequest, ScanEngine};
use crate::domain::entities::{ExecutionLogEntry, Job, Project, ScanResult};
use crate::domain::services::{
    NoTargetAvailableError, ProjectDirectory, ProjectLookupError, ScanTargetResolver,
};
use crate::domain::value_objects::{
    FailureKind, JobState, JobTransitionError, RunOutcome, ScanCapability,
};
use crate::infrastructure::engine_registry::EngineRegistry;
use crate::infrastructure::job_store::{JobStore, JobStoreError};
use crate::infrastructure::scheduler_gate::SchedulerGate;

/// Errors from the orchestration layer.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(#[from] JobTransitionError),

    #[error("Scheduler job processing is paused, retry later")]
    SchedulerPaused,

    #[error(transparent)]
    NoTargetAvailable(#[from] NoTargetAvailableError),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Persistence error: {0}")]
    Store(#[from] JobStoreError),

    #[error("Project lookup failed: {0}")]
    ProjectLookup(#[from] ProjectLookupError),
}

type JobLockMap = Mutex<HashMap<Uuid, Arc<Mutex<()>>>>;
type CancelTokens = std::sync::Mutex<HashMap<Uuid, CancellationToken>>;

/// Central job lifecycle controller.
pub struct JobOrchestrator {
    store: Arc<dyn JobStore>,
    aggregator: Arc<ResultAggregator>,
    registry: Arc<EngineRegistry>,
    projects: Arc<dyn ProjectDirectory>,
    resolver: ScanTargetResolver,
    gate: Arc<SchedulerGate>,
    engine_permits: Arc<Semaphore>,
    job_locks: Arc<JobLockMap>,
    cancel_tokens: Arc<CancelTokens>,
}

impl JobOrchestrator {
    pub fn new(
        config: &OrchestratorConfig,
        store: Arc<dyn JobStore>,
        aggregator: Arc<ResultAggregator>,
        registry: Arc<EngineRegistry>,
        projects: Arc<dyn ProjectDirectory>,
        gate: Arc<SchedulerGate>,
    ) -> Self {
        Self {
            store,
            aggregator,
            registry,
            projects,
            resolver: ScanTargetResolver::new(config.simulation_targets.clone()),
            gate,
            engine_permits: Arc::new(Semaphore::new(config.max_concurrent_engine_runs.max(1))),
            job_locks: Arc::new(Mutex::new(HashMap::new())),
            cancel_tokens: Arc::new(std::sync::Mutex::new(HashMap::new())),
        }
    }

    // ── Lifecycle operations ─────────────────────────────────────────

    /// Create a job in state CREATED.
    ///
    /// Validates that the project exists and that an engine serves the
    /// requested capability.
    pub async fn create(
        &self,
        project_id: &str,
        capability: ScanCapability,
        target_hint: Option<String>,
    ) -> Result<Job, OrchestratorError> {
        let project = self.require_project(project_id).await?;
        if !self.registry.supports(&capability) {
            return Err(OrchestratorError::Validation(format!(
                "No engine registered for capability '{capability}'"
            )));
        }

        let job = Job::new(project.id, capability, target_hint);
        self.store.save(job.clone()).await?;
        info!(job_id = %job.job_id, project_id, capability = %capability, "Scan job created");
        Ok(job)
    }

    /// Approve a job: CREATED → APPROVED.
    ///
    /// Approving an already-APPROVED job is a no-op success, tolerating
    /// duplicate administrative actions.
    pub async fn approve(&self, job_id: Uuid) -> Result<Job, OrchestratorError> {
        let lock = self.job_lock(job_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.approve_locked(job_id).await
        };
        release_job_lock(&self.job_locks, job_id, &lock).await;
        result
    }

    async fn approve_locked(&self, job_id: Uuid) -> Result<Job, OrchestratorError> {
        let mut job = self.load(job_id).await?;
        if job.state == JobState::Approved {
            debug!(job_id = %job_id, "Job already approved, ignoring duplicate approval");
            return Ok(job);
        }

        job.transition(JobState::Approved, Some("Approved by administrator".into()))?;
        self.store.save(job.clone()).await?;
        info!(job_id = %job_id, "Job transitioned to APPROVED");
        Ok(job)
    }

    /// Record that a source upload for a `code` job passed checksum
    /// validation. The upload transport itself lives in an external
    /// collaborator.
    pub async fn record_upload(
        &self,
        job_id: Uuid,
        sha256_checksum: &str,
    ) -> Result<Job, OrchestratorError> {
        if sha256_checksum.len() != 64 || hex::decode(sha256_checksum).is_err() {
            return Err(OrchestratorError::Validation(
                "Upload checksum must be a hex-encoded SHA-256 digest".into(),
            ));
        }

        let lock = self.job_lock(job_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.record_upload_locked(job_id, sha256_checksum).await
        };
        release_job_lock(&self.job_locks, job_id, &lock).await;
        result
    }

    async fn record_upload_locked(
        &self,
        job_id: Uuid,
        sha256_checksum: &str,
    ) -> Result<Job, OrchestratorError> {
        let mut job = self.load(job_id).await?;
        if job.capability != ScanCapability::Code {
            return Err(OrchestratorError::Validation(format!(
                "Source uploads only apply to code jobs, this job is '{}'",
                job.capability
            )));
        }
        if !matches!(job.state, JobState::Created | JobState::Approved) {
            return Err(OrchestratorError::Validation(format!(
                "Source uploads are only accepted before start, job is {}",
                job.state
            )));
        }

        job.upload_checksum = Some(sha256_checksum.to_string());
        self.store.save(job.clone()).await?;
        info!(job_id = %job_id, "Validated source upload recorded");
        Ok(job)
    }

    /// Start a job: APPROVED → STARTED, gate permitting.
    ///
    /// While the scheduler gate is disabled the job stays APPROVED and the
    /// caller gets [`OrchestratorError::SchedulerPaused`] — a transient
    /// condition, not a job failure. On success the target is resolved and
    /// the engine dispatched exactly once on a background task.
    pub async fn start(&self, job_id: Uuid, executed_by: &str) -> Result<Job, OrchestratorError> {
        let lock = self.job_lock(job_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.start_locked(job_id, executed_by, &lock).await
        };
        release_job_lock(&self.job_locks, job_id, &lock).await;
        result
    }

    async fn start_locked(
        &self,
        job_id: Uuid,
        executed_by: &str,
        lock: &Arc<Mutex<()>>,
    ) -> Result<Job, OrchestratorError> {
        let mut job = self.load(job_id).await?;
        if job.state != JobState::Approved {
            return Err(OrchestratorError::InvalidTransition(JobTransitionError {
                from: job.state,
                to: JobState::Started,
            }));
        }
        if !self.gate.is_enabled() {
            debug!(job_id = %job_id, "Scheduler gate disabled, job stays APPROVED");
            return Err(OrchestratorError::SchedulerPaused);
        }

        let project = self.require_project(&job.project_id).await?;
        let target = self.resolver.resolve(&project, job.target_hint.as_deref())?;

        let engine = self.registry.get_engine(&job.capability).ok_or_else(|| {
            OrchestratorError::Validation(format!(
                "No engine registered for capability '{}'",
                job.capability
            ))
        })?;

        job.resolved_target = Some(target.clone());
        job.transition(JobState::Started, Some("Scheduler dispatched job".into()))?;
        self.store.save(job.clone()).await?;
        info!(job_id = %job_id, target = %target, "Job transitioned to STARTED");

        let cancel = CancellationToken::new();
        self.cancel_tokens
            .lock()
            .expect("cancel token registry poisoned")
            .insert(job_id, cancel.clone());

        self.spawn_engine_run(&job, &project, engine, target, executed_by, cancel, lock.clone());
        Ok(job)
    }

    /// Cancel a job from any non-terminal state.
    ///
    /// The job is marked CANCELED immediately; a running engine is signaled
    /// to stop but never awaited. Canceling an already-CANCELED job is a
    /// no-op success.
    pub async fn cancel(&self, job_id: Uuid) -> Result<Job, OrchestratorError> {
        let lock = self.job_lock(job_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.cancel_locked(job_id).await
        };
        release_job_lock(&self.job_locks, job_id, &lock).await;
        result
    }

    async fn cancel_locked(&self, job_id: Uuid) -> Result<Job, OrchestratorError> {
        let mut job = self.load(job_id).await?;
        if job.state == JobState::Canceled {
            debug!(job_id = %job_id, "Job already canceled, ignoring duplicate cancel");
            return Ok(job);
        }
        if job.state.is_terminal() {
            return Err(OrchestratorError::InvalidTransition(JobTransitionError {
                from: job.state,
                to: JobState::Canceled,
            }));
        }

        job.cancel_requested = true;
        if let Some(token) = self
            .cancel_tokens
            .lock()
            .expect("cancel token registry poisoned")
            .remove(&job_id)
        {
            token.cancel();
        }

        job.transition(JobState::Canceled, Some("Canceled by administrator".into()))?;
        self.store.save(job.clone()).await?;
        info!(job_id = %job_id, "Job transitioned to CANCELED");
        Ok(job)
    }

    /// Current state of a job.
    pub async fn status(&self, job_id: Uuid) -> Result<JobState, OrchestratorError> {
        Ok(self.load(job_id).await?.state)
    }

    /// Full job record.
    pub async fn get_job(&self, job_id: Uuid) -> Result<Job, OrchestratorError> {
        self.load(job_id).await
    }

    // ── Scheduler administration ─────────────────────────────────────

    /// Disable the scheduler gate. In-flight jobs are unaffected; approved
    /// jobs accumulate until [`Self::resume_scheduling`].
    pub fn pause_scheduling(&self) {
        self.gate.disable();
    }

    /// Re-enable the gate and drain APPROVED jobs in creation order.
    ///
    /// Returns the ids of jobs that were started. Jobs whose start fails
    /// individually are skipped with a warning; the drain continues.
    pub async fn resume_scheduling(
        &self,
        executed_by: &str,
    ) -> Result<Vec<Uuid>, OrchestratorError> {
        self.gate.enable();

        let approved = self.store.list_in_state(JobState::Approved).await?;
        let mut started = Vec::with_capacity(approved.len());
        for job in approved {
            match self.start(job.job_id, executed_by).await {
                Ok(_) => started.push(job.job_id),
                // Gate was closed again mid-drain; remaining jobs keep waiting.
                Err(OrchestratorError::SchedulerPaused) => break,
                Err(err) => {
                    warn!(job_id = %job.job_id, error = %err, "Skipping job during scheduler drain");
                }
            }
        }
        Ok(started)
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn load(&self, job_id: Uuid) -> Result<Job, OrchestratorError> {
        self.store
            .get(job_id)
            .await?
            .ok_or(OrchestratorError::JobNotFound(job_id))
    }

    async fn require_project(&self, project_id: &str) -> Result<Project, OrchestratorError> {
        self.projects
            .find_project(project_id)
            .await?
            .ok_or_else(|| OrchestratorError::Validation(format!("Unknown project: {project_id}")))
    }

    async fn job_lock(&self, job_id: Uuid) -> Arc<Mutex<()>> {
        self.job_locks
            .lock()
            .await
            .entry(job_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run the engine on a background task and complete the job when it
    /// reports back. The task re-acquires the per-job lock before touching
    /// job state, so a completion racing a cancellation loses cleanly.
    fn spawn_engine_run(
        &self,
        job: &Job,
        project: &Project,
        engine: Arc<dyn ScanEngine>,
        target: String,
        executed_by: &str,
        cancel: CancellationToken,
        job_lock: Arc<Mutex<()>>,
    ) {
        let engine_config = serde_json::json!({
            "capability": job.capability,
            "target": target,
            "upload_checksum": job.upload_checksum,
        });
        let request = EngineRequest {
            job_id: job.job_id,
            project_id: project.id.clone(),
            target,
            config: engine_config.clone(),
        };
        let log_entry = ExecutionLogEntry {
            project_id: project.id.clone(),
            job_id: job.job_id,
            executed_by: executed_by.to_string(),
            engine_config,
            outcome: RunOutcome::Succeeded,
        };

        let job_id = job.job_id;
        let store = self.store.clone();
        let aggregator = self.aggregator.clone();
        let permits = self.engine_permits.clone();
        let cancel_tokens = self.cancel_tokens.clone();
        let locks = self.job_locks.clone();

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(job_id = %job_id, "Engine permit pool closed, dropping dispatch");
                    return;
                }
            };

            let outcome = engine.execute(&request, cancel).await;

            {
                // Serialize completion against cancel/poll-era transitions.
                let _guard = job_lock.lock().await;
                cancel_tokens
                    .lock()
                    .expect("cancel token registry poisoned")
                    .remove(&job_id);
                record_completion(&store, &aggregator, job_id, outcome, log_entry).await;
            }
            release_job_lock(&locks, job_id, &job_lock).await;
        });
    }
}

/// Drop the map's handle for a job lock once no other holder remains.
///
/// Callers release with their own handle after dropping the guard; a lock
/// some other task still holds (map + caller + them) stays in the map and
/// is released by its last holder.
async fn release_job_lock(locks: &JobLockMap, job_id: Uuid, handle: &Arc<Mutex<()>>) {
    let mut locks = locks.lock().await;
    if let Some(entry) = locks.get(&job_id) {
        if Arc::ptr_eq(entry, handle) && Arc::strong_count(entry) <= 2 {
            locks.remove(&job_id);
        }
    }
}

/// Apply an engine outcome to the job record. Caller holds the per-job lock.
async fn record_completion(
    store: &Arc<dyn JobStore>,
    aggregator: &ResultAggregator,
    job_id: Uuid,
    outcome: Result<ScanResult, EngineExecutionError>,
    log_entry: ExecutionLogEntry,
) {
    let mut job = match store.get(job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            warn!(job_id = %job_id, "Job vanished during engine run");
            return;
        }
        Err(err) => {
            warn!(job_id = %job_id, error = %err, "Failed to load job after engine run");
            return;
        }
    };
    if job.state.is_terminal() {
        debug!(job_id = %job_id, state = %job.state, "Late engine completion for terminal job, ignoring");
        return;
    }

    match outcome {
        Ok(result) => {
            let mut persisted = match aggregator.record_result(job_id, result).await {
                Ok(_) => true,
                Err(err) => {
                    warn!(job_id = %job_id, error = %err, "Failed to record scan result");
                    false
                }
            };
            if persisted {
                if let Err(err) = aggregator.record_log(job_id, log_entry).await {
                    warn!(job_id = %job_id, error = %err, "Failed to record execution log");
                    persisted = false;
                }
            }

            if persisted {
                if let Err(err) = job.transition(JobState::Ended, Some("Engine completed".into()))
                {
                    debug!(job_id = %job_id, error = %err, "Completion raced a terminal transition");
                    return;
                }
                if let Err(err) = store.save(job).await {
                    warn!(job_id = %job_id, error = %err, "Failed to persist ENDED state");
                    return;
                }
                info!(job_id = %job_id, "Job transitioned to ENDED");
            } else {
                // The engine succeeded but its output is lost. ENDED
                // guarantees a non-empty bundle, so the job must fail.
                job.failure = Some(FailureKind::Io);
                if let Err(err) = job.transition(
                    JobState::Failed,
                    Some("Scan output could not be persisted".into()),
                ) {
                    debug!(job_id = %job_id, error = %err, "Failure raced a terminal transition");
                    return;
                }
                if let Err(err) = store.save(job).await {
                    warn!(job_id = %job_id, error = %err, "Failed to persist FAILED state");
                    return;
                }
                warn!(job_id = %job_id, "Scan output could not be persisted, job transitioned to FAILED");
            }
        }
        Err(engine_err) => {
            let kind = engine_err.classify();
            let failed_entry = ExecutionLogEntry {
                outcome: RunOutcome::Failed(kind),
                ..log_entry
            };
            if let Err(err) = aggregator.record_log(job_id, failed_entry).await {
                warn!(job_id = %job_id, error = %err, "Failed to record execution log");
            }
            job.failure = Some(kind);
            if let Err(err) = job.transition(
                JobState::Failed,
                Some(format!("Engine execution failed ({kind})")),
            ) {
                debug!(job_id = %job_id, error = %err, "Failure raced a terminal transition");
                return;
            }
            if let Err(err) = store.save(job).await {
                warn!(job_id = %job_id, error = %err, "Failed to persist FAILED state");
                return;
            }
            // Raw engine detail stays in the log stream, never on the job.
            warn!(job_id = %job_id, error = %engine_err, classification = %kind, "Job transitioned to FAILED");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::domain::entities::ScanResult;
    use crate::infrastructure::bundle_store::InMemoryBundleStore;
    use crate::infrastructure::job_store::InMemoryJobStore;
    use crate::infrastructure::project_directory::InMemoryProjectDirectory;

    struct GreenWebEngine;

    #[async_trait]
    impl ScanEngine for GreenWebEngine {
        fn capability(&self) -> ScanCapability {
            ScanCapability::Web
        }

        async fn execute(
            &self,
            _request: &EngineRequest,
            _cancel: CancellationToken,
        ) -> Result<ScanResult, EngineExecutionError> {
            Ok(ScanResult {
                capability: ScanCapability::Web,
                payload: "{}".into(),
                metadata: "{}".into(),
            })
        }
    }

    async fn orchestrator() -> JobOrchestrator {
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let projects = Arc::new(InMemoryProjectDirectory::new());
        projects
            .upsert(Project::new("p1", "lock test project").with_whitelist(["https://a.example"]))
            .await;

        let mut registry = EngineRegistry::new();
        registry.register(Arc::new(GreenWebEngine));

        let aggregator = Arc::new(ResultAggregator::new(
            store.clone(),
            Arc::new(InMemoryBundleStore::new()),
        ));
        JobOrchestrator::new(
            &OrchestratorConfig::default(),
            store,
            aggregator,
            Arc::new(registry),
            projects,
            Arc::new(SchedulerGate::new()),
        )
    }

    #[tokio::test]
    async fn job_lock_is_released_after_cancel() {
        let orchestrator = orchestrator().await;
        let job = orchestrator
            .create("p1", ScanCapability::Web, None)
            .await
            .unwrap();

        orchestrator.approve(job.job_id).await.unwrap();
        orchestrator.cancel(job.job_id).await.unwrap();

        assert!(orchestrator.job_locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn job_lock_is_released_after_engine_completion() {
        let orchestrator = orchestrator().await;
        let job = orchestrator
            .create("p1", ScanCapability::Web, None)
            .await
            .unwrap();
        orchestrator.approve(job.job_id).await.unwrap();
        orchestrator.start(job.job_id, "admin").await.unwrap();

        // The background task drops its lock handle once the job is saved
        // terminal.
        let mut released = false;
        for _ in 0..500 {
            if orchestrator.job_locks.lock().await.is_empty() {
                released = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        assert!(released, "engine task should release its job lock");
        assert_eq!(
            orchestrator.status(job.job_id).await.unwrap(),
            JobState::Ended
        );
    }
}
