//! Domain model for scan-job orchestration.

pub mod engine;
pub mod entities;
pub mod services;
pub mod value_objects;

pub use engine::{EngineExecutionError, EngineRequest, ScanEngine};
pub use entities::{ExecutionLogEntry, FullScanData, Job, Project, ScanResult};
pub use services::{
    NoTargetAvailableError, ProjectDirectory, ProjectLookupError, ScanTargetResolver,
    PLACEHOLDER_TARGET,
};
pub use value_objects::{
    FailureKind, JobState, JobTransition, JobTransitionError, RunOutcome, ScanCapability,
    UnknownCapabilityError,
};
