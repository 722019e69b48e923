//! Process-wide scheduler admission control.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

/// Admission valve consulted before any job moves from APPROVED to STARTED.
///
/// A plain atomic flag, default enabled, toggled only by an administrative
/// caller. Disabled is a normal, recoverable condition: approved jobs stay in
/// the job store and are drained FIFO once the gate reopens. The gate itself
/// keeps no per-job memory.
#[derive(Debug)]
pub struct SchedulerGate {
    enabled: AtomicBool,
}

impl SchedulerGate {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Stop admitting approved jobs. Callers that disable the gate are
    /// responsible for re-enabling it.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        info!("Scheduler job processing disabled");
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        info!("Scheduler job processing enabled");
    }
}

impl Default for SchedulerGate {
    fn default() -> Self {
        Self::new()
    }
}
