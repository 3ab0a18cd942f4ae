/*!
 * Periodic backup task.
 *
 * `AutosaveTask::start` spawns a tokio task that writes a dated backup of
 * the whole store once per interval. The task owns its timer and is shut
 * down through its handle; it never touches a running translation.
 */

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::backup::{auto_backup_file_name, write_backup, BackupDocument};
use crate::database::ProjectStore;
use crate::errors::StoreError;

/// What the task has done so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutosaveStatus {
    pub last_backup: Option<DateTime<Utc>>,
    pub last_path: Option<PathBuf>,
    pub backups_written: usize,
    pub last_error: Option<String>,
}

/// Handle to a running autosave task
#[derive(Debug)]
pub struct AutosaveHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
    status: Arc<Mutex<AutosaveStatus>>,
}

impl AutosaveHandle {
    pub fn status(&self) -> AutosaveStatus {
        self.status.lock().clone()
    }

    /// Stop the task and wait for it to exit
    pub async fn stop(mut self) -> AutosaveStatus {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.join).await {
            error!("Autosave task ended abnormally: {}", e);
        }
        self.status.lock().clone()
    }
}

/// Periodic backup of a project store
pub struct AutosaveTask;

impl AutosaveTask {
    /// Spawn the task; the first backup happens one `interval` after start
    pub fn start(store: Arc<dyn ProjectStore>, backup_dir: PathBuf, interval: Duration) -> AutosaveHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let status = Arc::new(Mutex::new(AutosaveStatus::default()));
        let task_status = Arc::clone(&status);
        let period = interval.max(Duration::from_millis(1));

        info!("Autosave every {:?} into {:?}", period, backup_dir);

        let join = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!("Autosave task stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        match Self::backup_once(store.as_ref(), &backup_dir).await {
                            Ok(Some(path)) => {
                                let mut status = task_status.lock();
                                status.last_backup = Some(Utc::now());
                                status.last_path = Some(path);
                                status.backups_written += 1;
                                status.last_error = None;
                            }
                            Ok(None) => debug!("Autosave skipped: no projects"),
                            Err(e) => {
                                error!("Autosave failed: {}", e);
                                task_status.lock().last_error = Some(e.to_string());
                            }
                        }
                    }
                }
            }
        });

        AutosaveHandle {
            shutdown: Some(shutdown_tx),
            join,
            status,
        }
    }

    /// Write one dated backup; `None` when the store is empty
    pub async fn backup_once(store: &dyn ProjectStore, backup_dir: &Path) -> Result<Option<PathBuf>, StoreError> {
        let projects = store.load_all().await?;
        if projects.is_empty() {
            return Ok(None);
        }

        let path = backup_dir.join(auto_backup_file_name(Utc::now().date_naive()));
        write_backup(&path, BackupDocument::new(projects)).await?;
        info!("Auto-backup saved to {:?}", path);
        Ok(Some(path))
    }
}
