/*!
 * Block and project data model.
 *
 * Field names serialize in camelCase so persisted projects and backups
 * keep the same shape as the JSON documents the reader exchanges.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use super::chapters;
use super::sanitize::SCHEMA_VERSION;
use crate::source::ParsedSource;

/// Fixed text stored as the translation of every separator block
pub const SEPARATOR_MARKER: &str = "---";

/// Structural role of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    /// Ordinary prose paragraph
    #[default]
    Text,
    /// Chapter boundary
    Header,
    /// Scene break or other non-text marker; never translated
    Separator,
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Text => write!(f, "text"),
            BlockType::Header => write!(f, "header"),
            BlockType::Separator => write!(f, "separator"),
        }
    }
}

/// Translation status derived from a block's fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    Empty,
    Loading,
    Translated,
}

/// The atomic translation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Opaque unique identifier
    pub id: String,

    /// Source text
    #[serde(default)]
    pub original: String,

    /// Target text; empty means not yet translated
    #[serde(default)]
    pub translated: String,

    /// Structural role
    #[serde(rename = "type", default)]
    pub block_type: BlockType,

    /// A human overwrote `translated` outside the pipeline
    #[serde(default)]
    pub is_edited: bool,

    /// A translation or refinement request is in flight
    #[serde(default)]
    pub is_loading: bool,

    /// User annotation
    #[serde(default)]
    pub is_favorite: bool,

    /// User annotation
    #[serde(default)]
    pub note: String,

    /// Chapter number assigned by the chapter indexer
    #[serde(default)]
    pub chapter_index: usize,
}

impl Block {
    /// Create an untranslated block with a fresh id
    pub fn new(original: impl Into<String>, block_type: BlockType) -> Self {
        let translated = match block_type {
            BlockType::Separator => SEPARATOR_MARKER.to_string(),
            _ => String::new(),
        };

        Self {
            id: generate_id(),
            original: original.into(),
            translated,
            block_type,
            is_edited: false,
            is_loading: false,
            is_favorite: false,
            note: String::new(),
            chapter_index: 0,
        }
    }

    /// Create a text block
    pub fn text(original: impl Into<String>) -> Self {
        Self::new(original, BlockType::Text)
    }

    /// Create a header block
    pub fn header(original: impl Into<String>) -> Self {
        Self::new(original, BlockType::Header)
    }

    /// Create a separator block
    pub fn separator() -> Self {
        Self::new(SEPARATOR_MARKER, BlockType::Separator)
    }

    /// Set the translation (builder style, mostly for fixtures)
    pub fn with_translation(mut self, translated: impl Into<String>) -> Self {
        self.translated = translated.into();
        self
    }

    /// Whether the block has a non-empty translation
    pub fn is_translated(&self) -> bool {
        !self.translated.is_empty()
    }

    /// Whether the scheduler should send this block for translation
    pub fn needs_translation(&self) -> bool {
        self.block_type != BlockType::Separator && self.translated.is_empty()
    }

    /// Whether the block carries state worth keeping across a source refresh
    pub fn has_user_state(&self) -> bool {
        self.is_translated()
            || self.is_favorite
            || !self.note.is_empty()
            || self.block_type == BlockType::Header
    }

    pub fn status(&self) -> BlockStatus {
        if self.is_loading {
            BlockStatus::Loading
        } else if self.is_translated() {
            BlockStatus::Translated
        } else {
            BlockStatus::Empty
        }
    }
}

/// Generate an identifier that is never reused
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time as milliseconds since the epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Per-project translation settings and source metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub fandom: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_original_language")]
    pub original_language: String,
    #[serde(default)]
    pub target_language: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub custom_prompt: String,
    #[serde(default)]
    pub refine_prompt_template: String,
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_true")]
    pub include_tags: bool,
    #[serde(default)]
    pub tag_instruction: String,
    #[serde(default)]
    pub glossary: String,
    #[serde(default)]
    pub url: String,
    /// Creation date (RFC 3339)
    #[serde(default)]
    pub date: String,
    /// SHA-256 of the source document the blocks were last parsed from
    #[serde(default)]
    pub source_hash: String,
}

fn default_original_language() -> String {
    "auto".to_string()
}

fn default_context_window() -> usize {
    2
}

fn default_batch_size() -> usize {
    5
}

fn default_true() -> bool {
    true
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            fandom: String::new(),
            tags: Vec::new(),
            original_language: default_original_language(),
            target_language: String::new(),
            model: String::new(),
            custom_prompt: String::new(),
            refine_prompt_template: String::new(),
            context_window: default_context_window(),
            batch_size: default_batch_size(),
            include_tags: true,
            tag_instruction: String::new(),
            glossary: String::new(),
            url: String::new(),
            date: String::new(),
            source_hash: String::new(),
        }
    }
}

/// Progress numbers, always recomputed from the block list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub translated: usize,
    pub total: usize,
    pub percent: u8,
}

impl Progress {
    /// Count translated blocks in a block list
    pub fn of(blocks: &[Block]) -> Self {
        let total = blocks.len();
        let translated = blocks.iter().filter(|b| b.is_translated()).count();
        let percent = if total == 0 {
            0
        } else {
            ((100.0 * translated as f64) / total as f64).round() as u8
        };

        Self { translated, total, percent }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.translated == self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}%)", self.translated, self.total, self.percent)
    }
}

/// A translation project: metadata plus the ordered block list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub metadata: ProjectMetadata,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub last_modified: i64,
    /// Weak reference into `blocks`; lookup only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark_block_id: Option<String>,
    /// Layout version of the stored record
    #[serde(default)]
    pub schema_version: u32,
}

impl Project {
    /// Create a project from a freshly parsed source document
    pub fn from_source(parsed: ParsedSource, defaults: ProjectMetadata) -> Self {
        let metadata = ProjectMetadata {
            title: parsed.title,
            author: parsed.author,
            fandom: parsed.fandom,
            tags: parsed.tags,
            url: parsed.url.unwrap_or_default(),
            source_hash: parsed.source_hash,
            date: chrono::Utc::now().to_rfc3339(),
            ..defaults
        };

        Self {
            id: generate_id(),
            metadata,
            blocks: chapters::reindex(parsed.blocks),
            last_modified: now_millis(),
            bookmark_block_id: None,
            schema_version: SCHEMA_VERSION,
        }
    }

    /// Record a modification
    pub fn touch(&mut self) {
        self.last_modified = now_millis();
    }

    pub fn progress(&self) -> Progress {
        Progress::of(&self.blocks)
    }

    pub fn block(&self, block_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == block_id)
    }

    pub fn block_mut(&mut self, block_id: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == block_id)
    }

    /// Overwrite a translation by hand
    pub fn update_translation(&mut self, block_id: &str, text: &str) -> bool {
        let Some(block) = self.block_mut(block_id) else {
            return false;
        };
        block.translated = text.to_string();
        block.is_edited = true;
        block.is_loading = false;
        self.touch();
        true
    }

    pub fn toggle_favorite(&mut self, block_id: &str) -> bool {
        let Some(block) = self.block_mut(block_id) else {
            return false;
        };
        block.is_favorite = !block.is_favorite;
        self.touch();
        true
    }

    pub fn set_note(&mut self, block_id: &str, note: &str) -> bool {
        let Some(block) = self.block_mut(block_id) else {
            return false;
        };
        block.note = note.to_string();
        self.touch();
        true
    }

    /// Swap a block between header and text, then renumber chapters
    pub fn toggle_block_type(&mut self, block_id: &str) -> bool {
        let Some(block) = self.block_mut(block_id) else {
            return false;
        };
        block.block_type = match block.block_type {
            BlockType::Header => BlockType::Text,
            BlockType::Text => BlockType::Header,
            BlockType::Separator => return false,
        };
        chapters::reindex_in_place(&mut self.blocks);
        self.touch();
        true
    }

    /// Point the bookmark at an existing block
    pub fn set_bookmark(&mut self, block_id: &str) -> bool {
        if self.block(block_id).is_none() {
            return false;
        }
        self.bookmark_block_id = Some(block_id.to_string());
        self.touch();
        true
    }

    /// Resolve the bookmark; a dangling id resolves to nothing
    pub fn bookmarked_block(&self) -> Option<&Block> {
        self.bookmark_block_id.as_deref().and_then(|id| self.block(id))
    }

    /// Keep-original mode: every block's translation is its source text
    pub fn fill_with_original(&mut self) {
        for block in &mut self.blocks {
            if block.block_type != BlockType::Separator {
                block.translated = block.original.clone();
            }
            block.is_loading = false;
        }
        self.touch();
    }

    /// Number of chapters (0 for an empty project)
    pub fn chapter_count(&self) -> usize {
        self.blocks.last().map(|b| b.chapter_index + 1).unwrap_or(0)
    }
}
