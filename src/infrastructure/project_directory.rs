//! In-memory project directory.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::entities::Project;
use crate::domain::services::{ProjectDirectory, ProjectLookupError};

/// In-memory [`ProjectDirectory`].
///
/// Project administration is an external collaborator; this implementation
/// covers tests and single-process deployments where projects are seeded at
/// startup.
#[derive(Default)]
pub struct InMemoryProjectDirectory {
    projects: RwLock<HashMap<String, Project>>,
}

impl InMemoryProjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, project: Project) {
        self.projects
            .write()
            .await
            .insert(project.id.clone(), project);
    }
}

#[async_trait]
impl ProjectDirectory for InMemoryProjectDirectory {
    async fn find_project(&self, project_id: &str) -> Result<Option<Project>, ProjectLookupError> {
        Ok(self.projects.read().await.get(project_id).cloned())
    }
}
