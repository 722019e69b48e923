//! Storage for in-progress result bundles.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::{ExecutionLogEntry, FullScanData, ScanResult};
use crate::domain::value_objects::ScanCapability;

/// Mutable accumulation state for one job's bundle.
///
/// Results are keyed by capability, which both enforces the one-result-per-
/// (job, capability) invariant and keeps export ordering stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleDraft {
    pub results: BTreeMap<ScanCapability, ScanResult>,
    pub logs: Vec<ExecutionLogEntry>,
}

impl BundleDraft {
    /// Freeze the draft into the exportable aggregate.
    pub fn into_full_scan_data(self, job_id: Uuid) -> FullScanData {
        FullScanData {
            job_id,
            results: self.results.into_values().collect(),
            logs: self.logs,
        }
    }
}

/// Bundle persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum BundleStoreError {
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("Storage backend failed: {0}")]
    Backend(String),
}

/// Bundle storage interface.
#[async_trait]
pub trait BundleStore: Send + Sync {
    async fn load(&self, job_id: Uuid) -> Result<Option<BundleDraft>, BundleStoreError>;
    async fn save(&self, job_id: Uuid, draft: BundleDraft) -> Result<(), BundleStoreError>;
}

/// In-memory bundle store.
#[derive(Default)]
pub struct InMemoryBundleStore {
    drafts: RwLock<HashMap<Uuid, BundleDraft>>,
}

impl InMemoryBundleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BundleStore for InMemoryBundleStore {
    async fn load(&self, job_id: Uuid) -> Result<Option<BundleDraft>, BundleStoreError> {
        Ok(self.drafts.read().await.get(&job_id).cloned())
    }

    async fn save(&self, job_id: Uuid, draft: BundleDraft) -> Result<(), BundleStoreError> {
        self.drafts.write().await.insert(job_id, draft);
        Ok(())
    }
}
