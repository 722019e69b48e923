//! Scan engine trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::entities::ScanResult;
use super::value_objects::{FailureKind, ScanCapability};

/// Everything an engine needs for one scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineRequest {
    pub job_id: uuid::Uuid,
    pub project_id: String,
    /// Concrete URI or path to scan.
    pub target: String,
    /// Project-scoped engine configuration.
    pub config: serde_json::Value,
}

/// Executor for one scan capability.
///
/// Engines are opaque to the core: they accept a target description and
/// asynchronously produce a result payload. Long-running engines must watch
/// the cancellation token and stop cooperatively; the orchestrator never
/// waits for engine teardown.
#[async_trait]
pub trait ScanEngine: Send + Sync {
    /// The capability this engine provides.
    fn capability(&self) -> ScanCapability;

    /// Execute one scan against one target.
    async fn execute(
        &self,
        request: &EngineRequest,
        cancel: CancellationToken,
    ) -> Result<ScanResult, EngineExecutionError>;
}

/// Engine execution error.
#[derive(Debug, thiserror::Error)]
pub enum EngineExecutionError {
    #[error("Engine execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineExecutionError {
    /// Classification stored on the job and in the execution log; raw detail
    /// never leaves the orchestration boundary.
    pub fn classify(&self) -> FailureKind {
        match self {
            Self::ExecutionFailed(_) => FailureKind::Engine,
            Self::InvalidConfig(_) => FailureKind::Configuration,
            Self::Io(_) => FailureKind::Io,
        }
    }
}
