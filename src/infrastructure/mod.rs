//! Infrastructure: storage, engine registry, scheduler gate.

pub mod bundle_store;
pub mod engine_registry;
pub mod job_store;
pub mod project_directory;
pub mod scheduler_gate;

pub use bundle_store::{BundleDraft, BundleStore, BundleStoreError, InMemoryBundleStore};
pub use engine_registry::EngineRegistry;
pub use job_store::{InMemoryJobStore, JobStore, JobStoreError};
pub use project_directory::InMemoryProjectDirectory;
pub use scheduler_gate::SchedulerGate;
