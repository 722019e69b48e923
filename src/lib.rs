//! Scanhub - Security-scan job orchestration core
//!
//! This crate coordinates security-scan jobs submitted against a project:
//! it drives each job through its lifecycle, dispatches it to one of several
//! independent scanner engines, and assembles per-job results into a single
//! retrievable artifact.
//!
//! # Features
//!
//! - **Job lifecycle** — CREATED → APPROVED → STARTED → ENDED state machine
//!   with CANCELED/FAILED alternates and an audit trail per transition
//! - **Engine dispatch** — capability-keyed registry (`code`, `web`,
//!   `infra`) with exactly-once dispatch per job and cooperative
//!   cancellation
//! - **Scheduler gate** — administrative pause/resume without losing
//!   in-flight or approved jobs
//! - **Result aggregation** — scan results plus execution logs frozen into a
//!   replay-stable [`FullScanData`](domain::FullScanData) bundle
//! - **Status polling** — bounded-retry wait for a terminal state, with an
//!   injectable clock for tests
//!
//! # Architecture
//!
//! ```text
//! scanhub/
//! ├── domain/           # Job, Project, ScanResult, state machine, engine trait
//! ├── application/      # JobOrchestrator, ResultAggregator, StatusPoller
//! ├── infrastructure/   # Job/bundle stores, engine registry, scheduler gate
//! └── config/           # serde configuration with validation
//! ```
//!
//! Project administration, authentication, upload transport, and the actual
//! vulnerability-detection logic of the engines are external collaborators;
//! the core treats engines as opaque executors behind
//! [`ScanEngine`](domain::ScanEngine).

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
