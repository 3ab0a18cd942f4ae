/*!
 * Source reconciliation.
 *
 * Refreshing a project from an updated source document re-parses it,
 * merges the fresh blocks against the persisted ones and re-runs the
 * chapter indexer. A low similarity score never blocks the merge; it is
 * reported so the host can ask the reader for confirmation first.
 */

pub mod merge;

pub use merge::{fingerprint, follow_block, merge, merge_tracked, similarity, MergedBlock};

use log::{debug, info};

use crate::project::{chapters, Block, Project};
use crate::source::{ParsedSource, UNKNOWN};

/// Default similarity below which a refresh should be confirmed
pub const DEFAULT_SIMILARITY_THRESHOLD: u8 = 20;

/// Fandom placeholders that never overwrite a known fandom
const PLACEHOLDER_FANDOMS: [&str; 2] = [UNKNOWN, "Unknown Fandom"];

/// What a refresh would do
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshPlan {
    /// The document is byte-identical to the one the project came from
    Unchanged,
    /// The document changed; applying replaces the blocks with `merged`
    Merge(MergePlan),
}

/// Merge result waiting to be applied
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    /// Percentage of old text blocks found in the new document
    pub similarity: u8,
    /// `similarity` is below the configured threshold
    pub needs_confirmation: bool,
    /// New blocks with carried-over state, chapter indexed
    pub merged: Vec<Block>,
    /// Number of merged blocks that received prior state
    pub preserved: usize,
    /// Number of blocks in the previous version
    pub previous_len: usize,
    /// Bookmark moved onto its merged block; `None` when it no longer resolves
    pub bookmark: Option<String>,
}

/// Plans and applies source refreshes
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    threshold: u8,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl Reconciler {
    /// Create a reconciler warning below `threshold` percent similarity
    pub fn new(threshold: u8) -> Self {
        Self { threshold: threshold.min(100) }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Compare a project with a freshly parsed version of its source
    pub fn plan(&self, project: &Project, parsed: &ParsedSource) -> RefreshPlan {
        let known_hash = &project.metadata.source_hash;
        if !known_hash.is_empty() && *known_hash == parsed.source_hash {
            debug!("Source of '{}' is unchanged", project.metadata.title);
            return RefreshPlan::Unchanged;
        }

        let similarity = similarity(&project.blocks, &parsed.blocks);
        let tracked = merge_tracked(&project.blocks, &parsed.blocks);
        let bookmark = project
            .bookmark_block_id
            .as_deref()
            .and_then(|id| follow_block(&project.blocks, &tracked, id));
        let merged = chapters::reindex(tracked.into_iter().map(|m| m.block).collect());
        let preserved = merged.iter().filter(|b| b.has_user_state()).count();

        RefreshPlan::Merge(MergePlan {
            similarity,
            needs_confirmation: similarity < self.threshold,
            merged,
            preserved,
            previous_len: project.blocks.len(),
            bookmark,
        })
    }

    /// Replace the project's blocks and refresh its metadata
    pub fn apply(&self, project: &mut Project, parsed: &ParsedSource, plan: MergePlan) {
        info!(
            "Refreshing '{}': {} -> {} blocks, {}% similar, {} with prior state",
            project.metadata.title,
            plan.previous_len,
            plan.merged.len(),
            plan.similarity,
            plan.preserved
        );

        if project.bookmark_block_id.is_some() && plan.bookmark.is_none() {
            debug!("Dropping bookmark whose block is gone from the new source");
        }
        project.blocks = chapters::reindex(plan.merged);
        project.bookmark_block_id = plan.bookmark;
        update_metadata(project, parsed);

        project.touch();
    }
}

fn update_metadata(project: &mut Project, parsed: &ParsedSource) {
    let metadata = &mut project.metadata;

    if !parsed.title.trim().is_empty() {
        metadata.title = parsed.title.clone();
    }
    if !parsed.author.trim().is_empty() && parsed.author != UNKNOWN {
        metadata.author = parsed.author.clone();
    }
    if !parsed.fandom.trim().is_empty() && !PLACEHOLDER_FANDOMS.contains(&parsed.fandom.as_str()) {
        metadata.fandom = parsed.fandom.clone();
    }
    if !parsed.tags.is_empty() {
        metadata.tags = parsed.tags.clone();
    }
    if let Some(url) = parsed.url.as_ref().filter(|u| !u.trim().is_empty()) {
        metadata.url = url.clone();
    }
    metadata.source_hash = parsed.source_hash.clone();
}
