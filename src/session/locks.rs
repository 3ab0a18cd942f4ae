/*!
 * Per-project run locks.
 *
 * At most one translation run may hold a project at a time. Acquisition
 * never waits: a second run against a busy project fails immediately so
 * the caller can tell the reader instead of queueing work silently.
 *
 * The registry only holds ids that are currently locked; a guard removes
 * its id when dropped.
 */

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::TranslationError;

/// Registry of projects with a run in progress
#[derive(Debug, Clone, Default)]
pub struct ProjectLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

/// Proof that the holder owns a project until dropped
#[derive(Debug)]
pub struct ProjectGuard {
    project_id: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl ProjectGuard {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

impl Drop for ProjectGuard {
    fn drop(&mut self) {
        self.held.lock().remove(&self.project_id);
    }
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `project_id`, failing with `ProjectBusy` if held
    pub fn try_acquire(&self, project_id: &str) -> Result<ProjectGuard, TranslationError> {
        if !self.held.lock().insert(project_id.to_string()) {
            return Err(TranslationError::ProjectBusy(project_id.to_string()));
        }

        Ok(ProjectGuard {
            project_id: project_id.to_string(),
            held: Arc::clone(&self.held),
        })
    }

    /// Whether a run currently holds `project_id`
    pub fn is_locked(&self, project_id: &str) -> bool {
        self.held.lock().contains(project_id)
    }

    /// Number of projects currently locked
    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }
}
