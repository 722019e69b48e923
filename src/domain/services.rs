//! Domain services: project lookup and target resolution.

use async_trait::async_trait;

use super::entities::Project;

/// Fixed sentinel used when a project has no whitelist entries at all.
pub const PLACEHOLDER_TARGET: &str = "https://undefined.com";

/// Read-only view onto project administration.
///
/// Project CRUD lives in an external collaborator; the core only resolves
/// projects by id.
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    async fn find_project(&self, project_id: &str) -> Result<Option<Project>, ProjectLookupError>;
}

/// Project lookup error.
#[derive(Debug, thiserror::Error)]
pub enum ProjectLookupError {
    #[error("Project directory unavailable: {0}")]
    Unavailable(String),
}

/// Picks the concrete target URI for a job.
///
/// Resolution order:
/// 1. an explicit forced target (simulation/test mode) is used verbatim,
/// 2. an empty whitelist falls back to [`PLACEHOLDER_TARGET`],
/// 3. otherwise whitelist entries coinciding with known simulation targets
///    are dropped and the first remaining entry is picked. The whitelist is
///    an ordered set, so resolution is deterministic.
#[derive(Debug, Clone, Default)]
pub struct ScanTargetResolver {
    simulation_targets: Vec<String>,
}

impl ScanTargetResolver {
    pub fn new(simulation_targets: Vec<String>) -> Self {
        Self { simulation_targets }
    }

    pub fn resolve(
        &self,
        project: &Project,
        forced_target: Option<&str>,
    ) -> Result<String, NoTargetAvailableError> {
        if let Some(target) = forced_target {
            return Ok(target.to_string());
        }
        if project.whitelist.is_empty() {
            return Ok(PLACEHOLDER_TARGET.to_string());
        }

        project
            .whitelist
            .iter()
            .find(|uri| !self.simulation_targets.iter().any(|sim| sim == *uri))
            .cloned()
            .ok_or_else(|| NoTargetAvailableError {
                project_id: project.id.clone(),
            })
    }
}

/// Raised when a whitelist holds only reserved simulation targets. This is a
/// configuration problem requiring an administrative fix.
#[derive(Debug, thiserror::Error)]
#[error("No scan target available for project {project_id}: whitelist holds only reserved simulation targets")]
pub struct NoTargetAvailableError {
    pub project_id: String,
}
