/*!
 * SQLite persistence, load-time migration and backups.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use fictrans::database::{DatabaseConnection, ProjectRepository, ProjectStore, ProjectSummary};
use fictrans::errors::StoreError;
use fictrans::project::{Project, SCHEMA_VERSION};
use fictrans::session::{export_backup, import_backup, AutosaveTask};
use fictrans::translation::{BatchScheduler, RetryPolicy, RunOutcome, SchedulerConfig, StopHandle};

use crate::common;
use crate::common::mock_clients::{bad_request, Scripted, ScriptedClient};

/// Store wrapper recording the progress of every saved snapshot
struct RecordingStore {
    inner: ProjectRepository,
    saves: Mutex<Vec<usize>>,
}

#[async_trait]
impl ProjectStore for RecordingStore {
    async fn save(&self, project: &Project) -> Result<(), StoreError> {
        self.saves.lock().push(project.progress().translated);
        self.inner.save(project).await
    }

    async fn load(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        self.inner.load(project_id).await
    }

    async fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        self.inner.list().await
    }

    async fn delete(&self, project_id: &str) -> Result<bool, StoreError> {
        self.inner.delete(project_id).await
    }
}

fn file_repository(dir: &std::path::Path) -> ProjectRepository {
    ProjectRepository::new(DatabaseConnection::new(dir.join("fictrans.db")).unwrap())
}

#[tokio::test]
async fn test_scheduler_withSqlite_shouldPersistAfterEveryWindow() {
    let dir = common::create_temp_dir().unwrap();
    let store = Arc::new(RecordingStore {
        inner: file_repository(dir.path()),
        saves: Mutex::new(Vec::new()),
    });
    let mut project = common::text_project(7);
    let client = ScriptedClient::with_script(vec![Scripted::Echo, Scripted::Echo, Scripted::Fail(bad_request())]);
    let config = SchedulerConfig::default().with_batch_size(3).with_retry(RetryPolicy::no_retry());

    let outcome = BatchScheduler::new(Arc::new(client), store.clone(), config)
        .run(&mut project, &StopHandle::new(), None)
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Failed { .. }));
    assert_eq!(*store.saves.lock(), vec![3, 6, 6]);

    // A fresh connection sees exactly what was saved
    let reopened = file_repository(dir.path());
    let stored = reopened.require(&project.id).await.unwrap();
    assert_eq!(stored.progress().translated, 6);
    assert!(stored.blocks.iter().all(|b| !b.is_loading));
    assert_eq!(stored.blocks[5].translated, "[fr] b5");
    assert!(stored.blocks[6].translated.is_empty());
}

#[tokio::test]
async fn test_repository_list_shouldReportProgressMostRecentFirst() {
    let repository = ProjectRepository::new_in_memory().unwrap();

    let mut older = common::text_project(2);
    older.last_modified = 1_000;
    let mut newer = common::text_project(4);
    newer.blocks[0].translated = "t".into();
    newer.last_modified = 2_000;
    repository.save(&older).await.unwrap();
    repository.save(&newer).await.unwrap();

    let summaries = repository.list().await.unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].id, newer.id);
    assert_eq!((summaries[0].translated, summaries[0].total), (1, 4));
    assert_eq!(summaries[1].id, older.id);

    assert!(repository.delete(&older.id).await.unwrap());
    assert!(!repository.delete(&older.id).await.unwrap());
    assert_eq!(repository.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_repository_legacyPayload_shouldBeSanitizedOnLoad() {
    let repository = ProjectRepository::new_in_memory().unwrap();
    let payload = serde_json::json!({
        "id": "legacy",
        "metadata": { "title": "Old Work", "tags": "a, b", "url": null },
        "blocks": [
            { "id": "1", "original": "Chapter", "type": "header", "isLoading": true },
            { "id": "1", "original": "Text", "translated": null },
            { "id": "3", "original": "***", "type": "separator" }
        ]
    })
    .to_string();

    repository
        .connection()
        .execute(move |conn| {
            conn.execute(
                "INSERT INTO projects (id, title, payload, record_version, last_modified, translated_blocks, total_blocks, created_at, updated_at)
                 VALUES ('legacy', 'Old Work', ?1, 0, 5, 0, 3, datetime('now'), datetime('now'))",
                [&payload],
            )?;
            Ok(())
        })
        .unwrap();

    let project = repository.require("legacy").await.unwrap();
    assert_eq!(project.schema_version, SCHEMA_VERSION);
    assert_eq!(project.metadata.tags, vec!["a", "b"]);
    assert!(!project.blocks[0].is_loading);
    assert_ne!(project.blocks[0].id, project.blocks[1].id);
    assert_eq!(project.blocks[2].translated, "---");
}

#[tokio::test]
async fn test_backup_exportImport_betweenRepositories_shouldSkipExisting() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("backup.json");

    let source = ProjectRepository::new_in_memory().unwrap();
    let shared = common::text_project(2);
    source.save(&shared).await.unwrap();
    source.save(&common::text_project(3)).await.unwrap();
    assert_eq!(export_backup(&source, &path).await.unwrap(), 2);

    let target = ProjectRepository::new_in_memory().unwrap();
    target.save(&shared).await.unwrap();
    let report = import_backup(&target, &path).await.unwrap();

    assert_eq!((report.imported, report.skipped), (1, 1));
    assert_eq!(target.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_autosave_backupOnce_shouldWriteDatedFile() {
    let dir = common::create_temp_dir().unwrap();
    let repository = ProjectRepository::new_in_memory().unwrap();
    repository.save(&common::text_project(1)).await.unwrap();

    let path = AutosaveTask::backup_once(&repository, dir.path()).await.unwrap().unwrap();
    let json = std::fs::read_to_string(&path).unwrap();
    assert!(json.contains("fictrans-backup"));
    assert_eq!(fictrans::session::parse_backup(&json).unwrap().len(), 1);
}
