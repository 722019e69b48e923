//! Mock scan engines (test doubles).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use scanhub::domain::engine::{EngineExecutionError, EngineRequest, ScanEngine};
use scanhub::domain::entities::ScanResult;
use scanhub::domain::value_objects::ScanCapability;

/// Engine that immediately returns a fixed payload.
pub struct StaticEngine {
    capability: ScanCapability,
    payload: String,
}

impl StaticEngine {
    pub fn new(capability: ScanCapability, payload: impl Into<String>) -> Self {
        Self {
            capability,
            payload: payload.into(),
        }
    }

    pub fn green_web() -> Self {
        Self::new(ScanCapability::Web, r#"{"traffic_light":"GREEN"}"#)
    }
}

#[async_trait]
impl ScanEngine for StaticEngine {
    fn capability(&self) -> ScanCapability {
        self.capability
    }

    async fn execute(
        &self,
        _request: &EngineRequest,
        _cancel: CancellationToken,
    ) -> Result<ScanResult, EngineExecutionError> {
        Ok(ScanResult {
            capability: self.capability,
            payload: self.payload.clone(),
            metadata: "{}".into(),
        })
    }
}

/// Engine that always fails.
pub struct FailingEngine {
    capability: ScanCapability,
}

impl FailingEngine {
    pub fn new(capability: ScanCapability) -> Self {
        Self { capability }
    }
}

#[async_trait]
impl ScanEngine for FailingEngine {
    fn capability(&self) -> ScanCapability {
        self.capability
    }

    async fn execute(
        &self,
        _request: &EngineRequest,
        _cancel: CancellationToken,
    ) -> Result<ScanResult, EngineExecutionError> {
        Err(EngineExecutionError::ExecutionFailed(
            "scanner backend exploded".into(),
        ))
    }
}

/// Engine that blocks until released by the test (or canceled, when
/// `heed_cancel` is set). Lets tests observe jobs parked in STARTED and
/// exercise late completions.
pub struct StallingEngine {
    capability: ScanCapability,
    release: Arc<Notify>,
    heed_cancel: bool,
}

impl StallingEngine {
    pub fn new(capability: ScanCapability, heed_cancel: bool) -> (Arc<Notify>, Self) {
        let release = Arc::new(Notify::new());
        (
            release.clone(),
            Self {
                capability,
                release,
                heed_cancel,
            },
        )
    }
}

#[async_trait]
impl ScanEngine for StallingEngine {
    fn capability(&self) -> ScanCapability {
        self.capability
    }

    async fn execute(
        &self,
        _request: &EngineRequest,
        cancel: CancellationToken,
    ) -> Result<ScanResult, EngineExecutionError> {
        let completed = ScanResult {
            capability: self.capability,
            payload: r#"{"traffic_light":"RED"}"#.into(),
            metadata: "{}".into(),
        };

        if self.heed_cancel {
            tokio::select! {
                _ = cancel.cancelled() => Err(EngineExecutionError::ExecutionFailed(
                    "scan aborted on cancellation signal".into(),
                )),
                _ = self.release.notified() => Ok(completed),
            }
        } else {
            // Deliberately ignores the cancellation signal.
            self.release.notified().await;
            Ok(completed)
        }
    }
}
