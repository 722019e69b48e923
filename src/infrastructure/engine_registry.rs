//! Registry of scan engines keyed by capability.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::engine::ScanEngine;
use crate::domain::value_objects::ScanCapability;

/// Registry for scan engines.
///
/// One engine per capability; registering a second engine for the same
/// capability replaces the first.
pub struct EngineRegistry {
    engines: HashMap<ScanCapability, Arc<dyn ScanEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            engines: HashMap::new(),
        }
    }

    /// Register an engine under its own capability.
    pub fn register(&mut self, engine: Arc<dyn ScanEngine>) {
        self.engines.insert(engine.capability(), engine);
    }

    /// Get the engine for a capability.
    pub fn get_engine(&self, capability: &ScanCapability) -> Option<Arc<dyn ScanEngine>> {
        self.engines.get(capability).cloned()
    }

    /// Whether any engine serves this capability.
    pub fn supports(&self, capability: &ScanCapability) -> bool {
        self.engines.contains_key(capability)
    }

    /// All registered capabilities.
    pub fn registered_capabilities(&self) -> Vec<ScanCapability> {
        self.engines.keys().copied().collect()
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
