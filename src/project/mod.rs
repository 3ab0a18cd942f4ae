/*!
 * Project and block store.
 *
 * A project is created once from a parsed source document and then
 * mutated in place: by the batch scheduler (translation fields), by the
 * reconciler (whole-record replace on refresh) and by the reader (edits,
 * favorites, notes, bookmarks, header toggles). `export` renders it as a
 * reader-facing document.
 */

pub mod chapters;
pub mod export;
pub mod model;
pub mod sanitize;

pub use chapters::reindex;
pub use export::ExportFormat;
pub use model::{
    Block, BlockStatus, BlockType, Progress, Project, ProjectMetadata, SEPARATOR_MARKER,
};
pub use sanitize::{from_stored_value, sanitize, SCHEMA_VERSION};
