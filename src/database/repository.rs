/*!
 * SQLite project repository.
 *
 * Implements `ProjectStore` on top of `DatabaseConnection`. Every call runs
 * on the blocking pool; payloads are decoded and sanitized on load.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use rusqlite::{params, OptionalExtension};

use super::connection::DatabaseConnection;
use super::models::ProjectRecord;
use super::store::{ProjectStore, ProjectSummary};
use crate::errors::StoreError;
use crate::project::Project;

/// Repository for project persistence
#[derive(Clone)]
pub struct ProjectRepository {
    db: DatabaseConnection,
}

impl ProjectRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open the repository at the default database location
    pub fn new_default() -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new_default()?))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new_in_memory()?))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Project Operations
    // =========================================================================

    /// Insert or replace a project row
    pub async fn upsert(&self, record: ProjectRecord) -> Result<(), StoreError> {
        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO projects (
                        id, title, payload, record_version, last_modified,
                        translated_blocks, total_blocks, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now'), datetime('now'))
                    ON CONFLICT(id) DO UPDATE SET
                        title = excluded.title,
                        payload = excluded.payload,
                        record_version = excluded.record_version,
                        last_modified = excluded.last_modified,
                        translated_blocks = excluded.translated_blocks,
                        total_blocks = excluded.total_blocks,
                        updated_at = excluded.updated_at
                    "#,
                    params![
                        record.id,
                        record.title,
                        record.payload,
                        record.record_version,
                        record.last_modified,
                        record.translated_blocks,
                        record.total_blocks,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Fetch a raw project row
    pub async fn get_record(&self, project_id: &str) -> Result<Option<ProjectRecord>, StoreError> {
        let project_id = project_id.to_string();

        self.db
            .execute_async(move |conn| {
                let record = conn
                    .query_row(
                        r#"
                        SELECT id, title, payload, record_version, last_modified,
                               translated_blocks, total_blocks
                        FROM projects WHERE id = ?1
                        "#,
                        [&project_id],
                        |row| {
                            Ok(ProjectRecord {
                                id: row.get(0)?,
                                title: row.get(1)?,
                                payload: row.get(2)?,
                                record_version: row.get(3)?,
                                last_modified: row.get(4)?,
                                translated_blocks: row.get(5)?,
                                total_blocks: row.get(6)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(record)
            })
            .await
    }

    /// Summaries of every project, most recent first
    pub async fn list_summaries(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, title, last_modified, translated_blocks, total_blocks
                    FROM projects ORDER BY last_modified DESC, id
                    "#,
                )?;

                let summaries = stmt
                    .query_map([], |row| {
                        Ok(ProjectSummary {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            last_modified: row.get(2)?,
                            translated: row.get::<_, i64>(3)?.max(0) as usize,
                            total: row.get::<_, i64>(4)?.max(0) as usize,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(summaries)
            })
            .await
    }

    /// Delete a project row; returns whether it existed
    pub async fn delete_project(&self, project_id: &str) -> Result<bool, StoreError> {
        let project_id = project_id.to_string();

        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute("DELETE FROM projects WHERE id = ?1", [&project_id])?;
                Ok(deleted > 0)
            })
            .await
    }

    /// Number of stored projects
    pub async fn count(&self) -> Result<i64, StoreError> {
        self.db
            .execute_async(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?)
            })
            .await
    }
}

#[async_trait]
impl ProjectStore for ProjectRepository {
    async fn save(&self, project: &Project) -> Result<(), StoreError> {
        debug!("Saving project {} ({} blocks)", project.id, project.blocks.len());
        self.upsert(ProjectRecord::from_project(project)?).await
    }

    async fn load(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        match self.get_record(project_id).await? {
            Some(record) => Ok(Some(record.into_project()?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        self.list_summaries().await
    }

    async fn delete(&self, project_id: &str) -> Result<bool, StoreError> {
        self.delete_project(project_id).await
    }
}
