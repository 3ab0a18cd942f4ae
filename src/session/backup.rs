/*!
 * Backup export and import.
 *
 * A backup is a single JSON document holding every project. Import also
 * accepts a bare array of projects, skips ids that already exist and runs
 * every imported record through the same normalization as a load.
 */

use chrono::{NaiveDate, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

use crate::database::ProjectStore;
use crate::errors::StoreError;
use crate::project::{from_stored_value, Project};

/// Value of the `type` field of a backup document
pub const BACKUP_TYPE: &str = "fictrans-backup";

/// Current backup document version
pub const BACKUP_VERSION: u32 = 1;

/// Serialized backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: u32,
    /// Creation time (RFC 3339)
    pub date: String,
    pub history: Vec<Project>,
}

impl BackupDocument {
    pub fn new(history: Vec<Project>) -> Self {
        Self {
            kind: BACKUP_TYPE.to_string(),
            version: BACKUP_VERSION,
            date: Utc::now().to_rfc3339(),
            history,
        }
    }
}

/// Outcome of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    /// Projects whose id already existed
    pub skipped: usize,
}

/// File name used by the periodic backup for a given day
pub fn auto_backup_file_name(date: NaiveDate) -> String {
    format!("fictrans_auto_backup_{}.json", date.format("%Y-%m-%d"))
}

/// File name suggested for a manual backup on a given day
pub fn manual_backup_file_name(date: NaiveDate) -> String {
    format!("fictrans_backup_{}.json", date.format("%Y-%m-%d"))
}

/// Decode a backup document or a bare project array
pub fn parse_backup(json: &str) -> Result<Vec<Project>, StoreError> {
    let value: Value = serde_json::from_str(json)?;

    let records = match value {
        Value::Array(records) => records,
        Value::Object(mut object) => match object.remove("history") {
            Some(Value::Array(records)) => records,
            _ => {
                return Err(StoreError::Serialization(
                    "backup document has no project history".into(),
                ));
            }
        },
        _ => return Err(StoreError::Serialization("unrecognized backup format".into())),
    };

    records.into_iter().map(from_stored_value).collect()
}

/// Write every stored project to `path`; returns the number exported
pub async fn export_backup(store: &dyn ProjectStore, path: &Path) -> Result<usize, StoreError> {
    let projects = store.load_all().await?;
    let count = projects.len();
    write_backup(path, BackupDocument::new(projects)).await?;
    info!("Exported {} projects to {:?}", count, path);
    Ok(count)
}

/// Serialize a backup document to `path`
pub async fn write_backup(path: &Path, document: BackupDocument) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string(&document)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Add the projects in the backup at `path` that are not stored yet
pub async fn import_backup(store: &dyn ProjectStore, path: &Path) -> Result<ImportReport, StoreError> {
    let json = tokio::fs::read_to_string(path).await?;
    let projects = parse_backup(&json)?;

    let mut existing: HashSet<String> = store.list().await?.into_iter().map(|s| s.id).collect();
    let mut report = ImportReport::default();

    for project in projects {
        if !existing.insert(project.id.clone()) {
            warn!("Skipping project {} from backup: id already exists", project.id);
            report.skipped += 1;
            continue;
        }
        store.save(&project).await?;
        report.imported += 1;
    }

    info!(
        "Imported {} projects from {:?} ({} skipped)",
        report.imported, path, report.skipped
    );
    Ok(report)
}
