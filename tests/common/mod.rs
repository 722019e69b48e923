//! Shared test fixtures and mock engines.
#![allow(dead_code)]

pub mod engines;
pub mod stores;

use std::sync::{Arc, Once};
use std::time::Duration;

use scanhub::application::{JobOrchestrator, PollConfig, ResultAggregator, StatusPoller};
use scanhub::config::OrchestratorConfig;
use scanhub::domain::entities::Project;
use scanhub::domain::engine::ScanEngine;
use scanhub::infrastructure::{
    BundleStore, EngineRegistry, InMemoryBundleStore, InMemoryJobStore, InMemoryProjectDirectory,
    SchedulerGate,
};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness. Honors `RUST_LOG`,
/// defaults to `info`. Safe to call from every test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Fully wired orchestration stack on in-memory stores.
pub struct TestContext {
    pub store: Arc<InMemoryJobStore>,
    pub bundles: Arc<dyn BundleStore>,
    pub projects: Arc<InMemoryProjectDirectory>,
    pub gate: Arc<SchedulerGate>,
    pub aggregator: Arc<ResultAggregator>,
    pub orchestrator: JobOrchestrator,
}

impl TestContext {
    pub fn new(engines: Vec<Arc<dyn ScanEngine>>) -> Self {
        Self::with_config(OrchestratorConfig::default(), engines)
    }

    pub fn with_config(config: OrchestratorConfig, engines: Vec<Arc<dyn ScanEngine>>) -> Self {
        Self::with_bundle_store(config, engines, Arc::new(InMemoryBundleStore::new()))
    }

    pub fn with_bundle_store(
        config: OrchestratorConfig,
        engines: Vec<Arc<dyn ScanEngine>>,
        bundles: Arc<dyn BundleStore>,
    ) -> Self {
        init_tracing();

        let store = Arc::new(InMemoryJobStore::new());
        let projects = Arc::new(InMemoryProjectDirectory::new());
        let gate = Arc::new(SchedulerGate::new());

        let mut registry = EngineRegistry::new();
        for engine in engines {
            registry.register(engine);
        }

        let aggregator = Arc::new(ResultAggregator::new(store.clone(), bundles.clone()));
        let orchestrator = JobOrchestrator::new(
            &config,
            store.clone(),
            aggregator.clone(),
            Arc::new(registry),
            projects.clone(),
            gate.clone(),
        );

        Self {
            store,
            bundles,
            projects,
            gate,
            aggregator,
            orchestrator,
        }
    }

    /// Poller with short real delays, for awaiting background engine runs.
    pub fn fast_poller(&self) -> StatusPoller {
        StatusPoller::new(
            self.store.clone(),
            PollConfig {
                interval: Duration::from_millis(10),
                max_attempts: 500,
            },
        )
    }
}

pub fn two_target_project() -> Project {
    Project::new("test-project", "integration test project")
        .with_whitelist(["https://a.example", "https://b.example"])
}

pub async fn seed_project(ctx: &TestContext, project: Project) {
    ctx.projects.upsert(project).await;
}
