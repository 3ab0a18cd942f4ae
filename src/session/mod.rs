/*!
 * Host-side session services.
 *
 * This module provides:
 * - Per-project run locks
 * - Manual backup export and import
 * - The periodic autosave task
 */

pub mod autosave;
pub mod backup;
pub mod locks;

// Re-export main types
pub use autosave::{AutosaveHandle, AutosaveStatus, AutosaveTask};
pub use backup::{export_backup, import_backup, parse_backup, BackupDocument, ImportReport};
pub use locks::{ProjectGuard, ProjectLocks};
