/*!
 * Table layout and migrations.
 *
 * One row per project: the JSON payload is the source of truth and carries
 * its own layout version. The other columns are derived from it and only
 * serve listings. Each migration step upgrades exactly one version.
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension};

/// Current database layout version
pub const SCHEMA_VERSION: i32 = 2;

type Migration = fn(&Connection) -> Result<()>;

/// `(from_version, step)` in upgrade order
const MIGRATIONS: &[(i32, Migration)] = &[(1, add_summary_columns)];

const VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

const PROJECTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '',
    payload TEXT NOT NULL,
    record_version INTEGER NOT NULL DEFAULT 0,
    last_modified INTEGER NOT NULL DEFAULT 0,
    translated_blocks INTEGER NOT NULL DEFAULT 0,
    total_blocks INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_projects_last_modified ON projects(last_modified);
"#;

/// Create a fresh database or bring an older one up to `SCHEMA_VERSION`
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    let found = get_schema_version(conn)?;
    match found {
        0 => {
            info!("Creating project tables (v{})", SCHEMA_VERSION);
            conn.execute_batch(VERSION_TABLE)?;
            conn.execute_batch(PROJECTS_TABLE)?;
            set_schema_version(conn, SCHEMA_VERSION)
        }
        v if v < SCHEMA_VERSION => upgrade(conn, v),
        v if v > SCHEMA_VERSION => Err(anyhow!(
            "Database was written by a newer release (v{}, this build knows v{})",
            v,
            SCHEMA_VERSION
        )),
        v => {
            debug!("Project tables at v{}", v);
            Ok(())
        }
    }
}

/// Stored layout version; 0 for an empty database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let has_table = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |_| Ok(()),
        )
        .optional()
        .context("Cannot inspect sqlite_master")?
        .is_some();
    if !has_table {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| row.get(0))
        .optional()
        .context("Cannot read schema version")?;
    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

fn upgrade(conn: &Connection, from: i32) -> Result<()> {
    info!("Upgrading project tables v{} -> v{}", from, SCHEMA_VERSION);

    let mut version = from;
    while version < SCHEMA_VERSION {
        let (_, step) = MIGRATIONS
            .iter()
            .find(|(start, _)| *start == version)
            .ok_or_else(|| anyhow!("No migration from schema v{}", version))?;
        step(conn).with_context(|| format!("Migration from v{} failed", version))?;
        version += 1;
        set_schema_version(conn, version)?;
    }
    Ok(())
}

/// v1 kept only the payload; v2 adds the listing columns and backfills them
fn add_summary_columns(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        ALTER TABLE projects ADD COLUMN title TEXT NOT NULL DEFAULT '';
        ALTER TABLE projects ADD COLUMN record_version INTEGER NOT NULL DEFAULT 0;
        ALTER TABLE projects ADD COLUMN last_modified INTEGER NOT NULL DEFAULT 0;
        ALTER TABLE projects ADD COLUMN translated_blocks INTEGER NOT NULL DEFAULT 0;
        ALTER TABLE projects ADD COLUMN total_blocks INTEGER NOT NULL DEFAULT 0;

        UPDATE projects SET
            title = COALESCE(json_extract(payload, '$.metadata.title'), ''),
            last_modified = COALESCE(json_extract(payload, '$.lastModified'), 0),
            total_blocks = COALESCE(json_array_length(payload, '$.blocks'), 0),
            translated_blocks = (
                SELECT COUNT(*) FROM json_each(projects.payload, '$.blocks')
                WHERE COALESCE(json_extract(value, '$.translated'), '') != ''
            );

        CREATE INDEX IF NOT EXISTS idx_projects_last_modified ON projects(last_modified);
        "#,
    )?;
    Ok(())
}
