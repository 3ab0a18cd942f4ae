/*!
 * Normalization of stored projects.
 *
 * Stored records may come from older layouts, hand-edited backups or
 * other tools. Loading always goes through `from_stored_value` (loose JSON
 * to typed project) and then `sanitize` (typed project to a project that
 * satisfies every block invariant). Both are run once on load.
 */

use log::debug;
use serde_json::{Map, Value};

use super::chapters;
use super::model::{generate_id, BlockType, Project, SEPARATOR_MARKER};
use crate::errors::StoreError;

/// Current layout version of a stored project
pub const SCHEMA_VERSION: u32 = 1;

/// Block fields that must be strings when present
const STRING_FIELDS: [&str; 4] = ["original", "translated", "note", "type"];

/// Block fields that must be booleans when present
const BOOL_FIELDS: [&str; 3] = ["isEdited", "isLoading", "isFavorite"];

/// Bring a typed project up to the current layout
pub fn sanitize(mut project: Project) -> Project {
    let mut seen = std::collections::HashSet::new();

    for block in &mut project.blocks {
        if block.id.is_empty() || !seen.insert(block.id.clone()) {
            block.id = generate_id();
            seen.insert(block.id.clone());
        }
        if block.block_type == BlockType::Separator {
            block.translated = SEPARATOR_MARKER.to_string();
        }
        // A stored record can never have a request in flight
        block.is_loading = false;
    }

    chapters::reindex_in_place(&mut project.blocks);

    let metadata = &mut project.metadata;
    metadata.tags.retain(|tag| !tag.trim().is_empty());
    metadata.url = metadata.url.trim().to_string();
    if metadata.batch_size == 0 {
        metadata.batch_size = 1;
    }
    metadata.context_window = metadata.context_window.min(10);

    if project.id.is_empty() {
        project.id = generate_id();
    }
    if project.schema_version != SCHEMA_VERSION {
        debug!(
            "Migrating project {} from layout v{} to v{}",
            project.id, project.schema_version, SCHEMA_VERSION
        );
        project.schema_version = SCHEMA_VERSION;
    }

    project
}

/// Decode a stored JSON value that may use an older or looser layout
pub fn from_stored_value(mut value: Value) -> Result<Project, StoreError> {
    let object = value
        .as_object_mut()
        .ok_or_else(|| StoreError::Serialization("project record is not an object".into()))?;

    if let Some(Value::Array(blocks)) = object.get_mut("blocks") {
        for block in blocks.iter_mut() {
            if let Some(fields) = block.as_object_mut() {
                normalize_block_fields(fields);
            }
        }
    } else {
        object.insert("blocks".into(), Value::Array(Vec::new()));
    }

    if let Some(Value::Object(metadata)) = object.get_mut("metadata") {
        normalize_metadata_fields(metadata);
    } else {
        object.insert("metadata".into(), Value::Object(Map::new()));
    }

    let id = match object.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    object.insert("id".into(), Value::String(id));

    if matches!(object.get("lastModified"), Some(Value::Null)) {
        object.remove("lastModified");
    }
    if matches!(object.get("bookmarkBlockId"), Some(Value::Null)) {
        object.remove("bookmarkBlockId");
    }

    let project: Project = serde_json::from_value(value)?;
    Ok(sanitize(project))
}

fn normalize_block_fields(fields: &mut Map<String, Value>) {
    fields.retain(|_, v| !v.is_null());

    for key in STRING_FIELDS {
        if let Some(v) = fields.get(key) {
            if !v.is_string() {
                fields.remove(key);
            }
        }
    }
    for key in BOOL_FIELDS {
        if let Some(v) = fields.get(key) {
            if !v.is_boolean() {
                fields.remove(key);
            }
        }
    }

    let known_type = fields
        .get("type")
        .and_then(Value::as_str)
        .map(|t| matches!(t, "text" | "header" | "separator"))
        .unwrap_or(false);
    if !known_type {
        fields.insert("type".into(), Value::String(BlockType::Text.to_string()));
    }

    if !fields.get("chapterIndex").map(Value::is_u64).unwrap_or(false) {
        fields.insert("chapterIndex".into(), Value::from(0u64));
    }

    let id = match fields.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    fields.insert("id".into(), Value::String(id));
}

fn normalize_metadata_fields(metadata: &mut Map<String, Value>) {
    metadata.retain(|_, v| !v.is_null());

    // Tags were once stored as a single comma separated string
    if let Some(Value::String(joined)) = metadata.get("tags") {
        let tags: Vec<Value> = joined
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| Value::String(t.to_string()))
            .collect();
        metadata.insert("tags".into(), Value::Array(tags));
    }
    if let Some(Value::Array(tags)) = metadata.get_mut("tags") {
        tags.retain(Value::is_string);
    }
}
