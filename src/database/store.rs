/*!
 * Project persistence contract.
 *
 * The scheduler and the reconciler only see `ProjectStore`; whether the
 * projects live in SQLite or in memory is the host's choice.
 */

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::StoreError;
use crate::project::{sanitize, Project};

/// Row shown in project listings
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    pub last_modified: i64,
    pub translated: usize,
    pub total: usize,
}

impl ProjectSummary {
    pub fn of(project: &Project) -> Self {
        let progress = project.progress();
        Self {
            id: project.id.clone(),
            title: project.metadata.title.clone(),
            last_modified: project.last_modified,
            translated: progress.translated,
            total: progress.total,
        }
    }
}

/// Storage for whole projects
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Insert or replace a project
    async fn save(&self, project: &Project) -> Result<(), StoreError>;

    /// Load and sanitize a project; `None` when it does not exist
    async fn load(&self, project_id: &str) -> Result<Option<Project>, StoreError>;

    /// All projects, most recently modified first
    async fn list(&self) -> Result<Vec<ProjectSummary>, StoreError>;

    /// Delete a project; returns whether it existed
    async fn delete(&self, project_id: &str) -> Result<bool, StoreError>;

    /// Load every project, most recently modified first
    async fn load_all(&self) -> Result<Vec<Project>, StoreError> {
        let mut projects = Vec::new();
        for summary in self.list().await? {
            if let Some(project) = self.load(&summary.id).await? {
                projects.push(project);
            }
        }
        Ok(projects)
    }

    /// Load a project that must exist
    async fn require(&self, project_id: &str) -> Result<Project, StoreError> {
        self.load(project_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(project_id.to_string()))
    }
}

#[async_trait]
impl<T: ProjectStore + ?Sized> ProjectStore for Arc<T> {
    async fn save(&self, project: &Project) -> Result<(), StoreError> {
        (**self).save(project).await
    }

    async fn load(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        (**self).load(project_id).await
    }

    async fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        (**self).list().await
    }

    async fn delete(&self, project_id: &str) -> Result<bool, StoreError> {
        (**self).delete(project_id).await
    }
}

/// In-memory store, for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryProjectStore {
    projects: Arc<RwLock<HashMap<String, Project>>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored projects
    pub fn len(&self) -> usize {
        self.projects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.read().is_empty()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn save(&self, project: &Project) -> Result<(), StoreError> {
        self.projects.write().insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn load(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        let project = self.projects.read().get(project_id).cloned();
        Ok(project.map(sanitize))
    }

    async fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        let mut summaries: Vec<ProjectSummary> =
            self.projects.read().values().map(ProjectSummary::of).collect();
        summaries.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(summaries)
    }

    async fn delete(&self, project_id: &str) -> Result<bool, StoreError> {
        Ok(self.projects.write().remove(project_id).is_some())
    }
}
