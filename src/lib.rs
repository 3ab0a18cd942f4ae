/*!
 * # fictrans
 *
 * Batch translation of long-form fiction with AI backends.
 *
 * ## Features
 *
 * - Import plain text and Markdown works as block-structured projects
 * - Translate projects window by window with a rolling source context
 * - Retry transient backend failures with exponential backoff
 * - Refine single blocks with free-form instructions
 * - Draft fandom glossaries and export finished works as Markdown, HTML
 *   or plain text
 * - Refresh a project from a new version of its source without losing
 *   translations, notes or favorites
 * - Versioned SQLite persistence, backups and periodic autosave
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `project`: Blocks, projects, chapter indexing, load-time sanitizing and export
 * - `source`: Source document parsing
 * - `translation`: The batch scheduler and its collaborators:
 *   - `translation::client`: The backend contract
 *   - `translation::scheduler`: Window planning, events and persistence
 *   - `translation::retry`: Retry policy
 *   - `translation::context_buffer`: Rolling context
 *   - `translation::refine`: Block refinement, fandom identification and glossaries
 *   - `translation::prompts`: Prompt builders shared by every backend
 * - `reconcile`: Source refresh (similarity and merge)
 * - `database`: Project stores (in-memory and SQLite)
 * - `session`: Run locks, backups and autosave
 * - `providers`: Backends shipped with the binary
 * - `app_controller`: Main application controller
 * - `language_utils`: Language tag utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod project;
pub mod providers;
pub mod reconcile;
pub mod session;
pub mod source;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use database::{MemoryProjectStore, ProjectRepository, ProjectStore};
pub use errors::{AppError, ProviderError, StoreError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use project::{Block, BlockType, Project, ProjectMetadata};
pub use reconcile::Reconciler;
pub use source::{ParsedSource, PlainTextSource, SourceProvider};
pub use translation::{BatchScheduler, RunOutcome, SchedulerEvent, StopHandle, TranslationClient};
