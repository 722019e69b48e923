//! Result aggregation — assembles per-engine outputs into one exportable
//! bundle per job.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::entities::{ExecutionLogEntry, FullScanData, ScanResult};
use crate::infrastructure::bundle_store::{BundleStore, BundleStoreError};
use crate::infrastructure::job_store::{JobStore, JobStoreError};

/// Errors from the aggregation layer.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("Job {job_id} has not finished yet (state {state})")]
    JobNotFinished {
        job_id: Uuid,
        state: crate::domain::value_objects::JobState,
    },

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Job store error: {0}")]
    Jobs(#[from] JobStoreError),

    #[error("Bundle store error: {0}")]
    Bundles(#[from] BundleStoreError),
}

/// Collects scan results and execution logs for jobs and freezes them into
/// [`FullScanData`] bundles once the job is terminal.
///
/// Recording against an already-terminal job is a no-op rather than an
/// error: a canceled job's engine may still report back asynchronously, and
/// that late completion must not alter the bundle.
pub struct ResultAggregator {
    jobs: Arc<dyn JobStore>,
    bundles: Arc<dyn BundleStore>,
    // Serializes load-modify-save cycles so duplicate dispatch attempts
    // cannot both insert a result for the same capability.
    write_guard: Mutex<()>,
}

impl ResultAggregator {
    pub fn new(jobs: Arc<dyn JobStore>, bundles: Arc<dyn BundleStore>) -> Self {
        Self {
            jobs,
            bundles,
            write_guard: Mutex::new(()),
        }
    }

    /// Append a scan result to the job's in-progress bundle.
    ///
    /// Returns `Ok(true)` when the result was recorded, `Ok(false)` when it
    /// was dropped (terminal job, or a result for this capability already
    /// exists).
    pub async fn record_result(
        &self,
        job_id: Uuid,
        result: ScanResult,
    ) -> Result<bool, AggregateError> {
        let _guard = self.write_guard.lock().await;

        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or(AggregateError::JobNotFound(job_id))?;
        if job.state.is_terminal() {
            debug!(job_id = %job_id, state = %job.state, "Dropping scan result for terminal job");
            return Ok(false);
        }

        let mut draft = self.bundles.load(job_id).await?.unwrap_or_default();
        if draft.results.contains_key(&result.capability) {
            debug!(
                job_id = %job_id,
                capability = %result.capability,
                "Duplicate scan result for capability, keeping the first"
            );
            return Ok(false);
        }

        info!(job_id = %job_id, capability = %result.capability, "Scan result recorded");
        draft.results.insert(result.capability, result);
        self.bundles.save(job_id, draft).await?;
        Ok(true)
    }

    /// Append an execution log entry to the job's in-progress bundle.
    ///
    /// Returns `Ok(false)` when the job is already terminal.
    pub async fn record_log(
        &self,
        job_id: Uuid,
        entry: ExecutionLogEntry,
    ) -> Result<bool, AggregateError> {
        let _guard = self.write_guard.lock().await;

        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or(AggregateError::JobNotFound(job_id))?;
        if job.state.is_terminal() {
            debug!(job_id = %job_id, state = %job.state, "Dropping execution log for terminal job");
            return Ok(false);
        }

        let mut draft = self.bundles.load(job_id).await?.unwrap_or_default();
        draft.logs.push(entry);
        self.bundles.save(job_id, draft).await?;
        Ok(true)
    }

    /// Freeze and return the exportable bundle for a terminal job.
    ///
    /// Fails with [`AggregateError::JobNotFinished`] while the job is still
    /// in flight. The returned aggregate is deterministically ordered, so
    /// repeated builds serialize to identical bytes.
    pub async fn build_full_scan_data(&self, job_id: Uuid) -> Result<FullScanData, AggregateError> {
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or(AggregateError::JobNotFound(job_id))?;
        if !job.state.is_terminal() {
            return Err(AggregateError::JobNotFinished {
                job_id,
                state: job.state,
            });
        }

        let draft = self.bundles.load(job_id).await?.unwrap_or_default();
        Ok(draft.into_full_scan_data(job_id))
    }
}
