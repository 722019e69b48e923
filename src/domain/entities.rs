//! Domain entities: jobs, projects, scan results, execution logs, bundles.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{
    FailureKind, JobState, JobTransition, JobTransitionError, RunOutcome, ScanCapability,
};

/// A project scans are submitted against.
///
/// Mutated only by the administration collaborator; the core reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub description: String,
    /// Permissible target URIs. A set; ordering is irrelevant to callers, the
    /// BTreeSet keeps target resolution deterministic.
    pub whitelist: BTreeSet<String>,
}

impl Project {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            whitelist: BTreeSet::new(),
        }
    }

    pub fn with_whitelist<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = uris.into_iter().map(Into::into).collect();
        self
    }
}

/// A scan job tracked through its lifecycle.
///
/// Owned exclusively by the orchestrator; frozen once a terminal state is
/// reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub project_id: String,
    pub capability: ScanCapability,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Explicit target requested at creation (simulation/test mode).
    pub target_hint: Option<String>,
    /// Concrete target chosen at start time.
    pub resolved_target: Option<String>,
    pub cancel_requested: bool,
    /// Failure classification; raw engine detail stays in the execution log.
    pub failure: Option<FailureKind>,
    /// Checksum of a validated source upload, for `code` jobs.
    pub upload_checksum: Option<String>,
    /// Ordered history of state transitions (audit trail).
    #[serde(default)]
    pub transitions: Vec<JobTransition>,
}

impl Job {
    pub fn new(project_id: String, capability: ScanCapability, target_hint: Option<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            project_id,
            capability,
            state: JobState::Created,
            created_at: Utc::now(),
            approved_at: None,
            started_at: None,
            ended_at: None,
            target_hint,
            resolved_target: None,
            cancel_requested: false,
            failure: None,
            upload_checksum: None,
            transitions: Vec::new(),
        }
    }

    /// Move the job to `next`, validating against the state machine and
    /// recording an audit-trail entry. Timestamps are stamped as a side
    /// effect: `approved_at` on Approved, `started_at` on Started, `ended_at`
    /// on any terminal state.
    pub fn transition(
        &mut self,
        next: JobState,
        reason: Option<String>,
    ) -> Result<(), JobTransitionError> {
        if !self.state.can_transition_to(&next) {
            return Err(JobTransitionError {
                from: self.state,
                to: next,
            });
        }

        let now = Utc::now();
        self.transitions.push(JobTransition {
            from: self.state,
            to: next,
            timestamp: now,
            reason,
        });

        match next {
            JobState::Approved => self.approved_at = Some(now),
            JobState::Started => self.started_at = Some(now),
            JobState::Ended | JobState::Canceled | JobState::Failed => self.ended_at = Some(now),
            JobState::Created => {}
        }
        self.state = next;
        Ok(())
    }
}

/// Result payload produced by one engine invocation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub capability: ScanCapability,
    /// Opaque result payload as handed back by the engine.
    pub payload: String,
    /// Opaque engine metadata.
    pub metadata: String,
}

/// Append-only record of one engine invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub project_id: String,
    pub job_id: Uuid,
    /// Principal on whose behalf the engine ran.
    pub executed_by: String,
    /// Snapshot of the engine configuration used for the run.
    pub engine_config: serde_json::Value,
    pub outcome: RunOutcome,
}

/// Aggregate of all results and execution logs for a single job.
///
/// Built once the job is terminal; immutable thereafter. `results` is
/// non-empty iff the job ended successfully; a canceled or failed job yields
/// an empty or partial bundle which callers must treat as non-authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullScanData {
    pub job_id: Uuid,
    /// Sorted by capability for replay-stable output.
    pub results: Vec<ScanResult>,
    /// In append order, one entry per engine invocation.
    pub logs: Vec<ExecutionLogEntry>,
}

impl FullScanData {
    /// Serialize the bundle for export. Field and collection order are
    /// stable, so repeated calls for the same job produce identical bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
