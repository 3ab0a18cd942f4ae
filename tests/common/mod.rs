/*!
 * Common test utilities for the fictrans test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use fictrans::project::{Block, Project, ProjectMetadata};
use fictrans::source::ParsedSource;

// Scripted translation clients
pub mod mock_clients;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A short Markdown work with two chapters and a scene break
pub fn sample_document() -> &'static str {
    "# Chapter One\n\n\
     The rain had not stopped for three days.\n\n\
     Mira counted the drops on the window.\n\n\
     * * *\n\n\
     By morning the river had reached the door.\n\n\
     # Chapter Two\n\n\
     Nobody in the village remembered a flood like it.\n\n\
     Mira packed the letters first."
}

/// Project settings used across the suite
pub fn test_metadata() -> ProjectMetadata {
    ProjectMetadata {
        target_language: "fr".to_string(),
        model: "test-model".to_string(),
        ..ProjectMetadata::default()
    }
}

/// A project of `count` text blocks named `b0`, `b1`, ...
pub fn text_project(count: usize) -> Project {
    let blocks = (0..count).map(|i| Block::text(format!("b{}", i))).collect();
    project_from_blocks(blocks)
}

pub fn project_from_blocks(blocks: Vec<Block>) -> Project {
    let parsed = ParsedSource {
        title: "Test Work".to_string(),
        author: "Tester".to_string(),
        fandom: "Test Fandom".to_string(),
        blocks,
        ..ParsedSource::default()
    };
    Project::from_source(parsed, test_metadata())
}
