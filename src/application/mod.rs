//! Application layer: orchestration, aggregation, polling.

pub mod aggregator;
pub mod orchestrator;
pub mod poller;

pub use aggregator::{AggregateError, ResultAggregator};
pub use orchestrator::{JobOrchestrator, OrchestratorError};
pub use poller::{PollConfig, PollError, Sleeper, StatusPoller, TokioSleeper};
