//! Store doubles for exercising persistence failures.

use async_trait::async_trait;
use uuid::Uuid;

use scanhub::infrastructure::{BundleDraft, BundleStore, BundleStoreError};

/// Bundle store whose writes always fail, simulating a broken backend.
pub struct BrokenBundleStore;

#[async_trait]
impl BundleStore for BrokenBundleStore {
    async fn load(&self, _job_id: Uuid) -> Result<Option<BundleDraft>, BundleStoreError> {
        Ok(None)
    }

    async fn save(&self, _job_id: Uuid, _draft: BundleDraft) -> Result<(), BundleStoreError> {
        Err(BundleStoreError::Backend("disk full".into()))
    }
}
