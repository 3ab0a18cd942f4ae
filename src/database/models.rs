/*!
 * Database row models.
 */

use crate::database::store::ProjectSummary;
use crate::errors::StoreError;
use crate::project::{from_stored_value, Project};

/// One row of the `projects` table
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub id: String,
    pub title: String,
    /// Serialized project
    pub payload: String,
    /// Layout version of `payload`
    pub record_version: u32,
    /// Milliseconds since the epoch
    pub last_modified: i64,
    pub translated_blocks: i64,
    pub total_blocks: i64,
}

impl ProjectRecord {
    /// Serialize a project into a row
    pub fn from_project(project: &Project) -> Result<Self, StoreError> {
        let progress = project.progress();
        Ok(Self {
            id: project.id.clone(),
            title: project.metadata.title.clone(),
            payload: serde_json::to_string(project)?,
            record_version: project.schema_version,
            last_modified: project.last_modified,
            translated_blocks: progress.translated as i64,
            total_blocks: progress.total as i64,
        })
    }

    /// Decode the payload, migrating older layouts
    pub fn into_project(self) -> Result<Project, StoreError> {
        let value: serde_json::Value = serde_json::from_str(&self.payload)?;
        from_stored_value(value)
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            last_modified: self.last_modified,
            translated: self.translated_blocks.max(0) as usize,
            total: self.total_blocks.max(0) as usize,
        }
    }
}
