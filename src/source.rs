/*!
 * Source documents.
 *
 * A `SourceProvider` turns a document into pre-classified blocks plus work
 * metadata. The plain text provider handles text and Markdown exports:
 * blank lines separate paragraphs, `#` lines are chapter headers and
 * scene-break lines such as `***` become separators.
 */

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::project::{reindex, Block};

/// Author and fandom reported when the document does not name them
pub const UNKNOWN: &str = "Unknown";

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

static MARKDOWN_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#+\s").unwrap());

static SCENE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(?:\*\s*){3,}|(?:-\s*){3,}|(?:_\s*){3,}|(?:~\s*){3,})$").unwrap());

/// A parsed source document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSource {
    pub title: String,
    pub author: String,
    pub fandom: String,
    pub tags: Vec<String>,
    pub url: Option<String>,
    /// SHA-256 of the raw document, hex encoded
    pub source_hash: String,
    /// Blocks in document order, already chapter indexed
    pub blocks: Vec<Block>,
}

/// Turns a raw document into blocks
pub trait SourceProvider: Send + Sync {
    /// Parse `document`; `name_hint` is typically the file stem
    fn parse(&self, document: &str, name_hint: Option<&str>) -> Result<ParsedSource>;

    /// Read and parse a file
    fn parse_file(&self, path: &Path) -> Result<ParsedSource> {
        let document = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read source document: {:?}", path))?;
        let stem = path.file_stem().and_then(|s| s.to_str());
        self.parse(&document, stem)
    }
}

/// Hex encoded SHA-256 of a document
pub fn document_hash(document: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Plain text and Markdown provider
#[derive(Debug, Clone, Default)]
pub struct PlainTextSource;

impl PlainTextSource {
    pub fn new() -> Self {
        Self
    }

    /// Split a document into classified blocks
    pub fn split_blocks(document: &str) -> Vec<Block> {
        let normalized = document.replace("\r\n", "\n");
        let blocks = PARAGRAPH_BREAK
            .split(&normalized)
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| {
                if SCENE_BREAK.is_match(chunk) {
                    let mut block = Block::separator();
                    block.original = chunk.to_string();
                    block
                } else if MARKDOWN_HEADER.is_match(chunk) {
                    Block::header(chunk)
                } else {
                    Block::text(chunk)
                }
            })
            .collect();
        reindex(blocks)
    }
}

impl SourceProvider for PlainTextSource {
    fn parse(&self, document: &str, name_hint: Option<&str>) -> Result<ParsedSource> {
        let blocks = Self::split_blocks(document);
        if blocks.is_empty() {
            anyhow::bail!("Source document contains no text");
        }

        let title = match name_hint.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => name.to_string(),
            None => first_line_title(&blocks[0].original),
        };

        Ok(ParsedSource {
            title,
            author: UNKNOWN.to_string(),
            fandom: UNKNOWN.to_string(),
            tags: Vec::new(),
            url: None,
            source_hash: document_hash(document),
            blocks,
        })
    }
}

fn first_line_title(text: &str) -> String {
    text.lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches('#')
        .trim()
        .to_string()
}
