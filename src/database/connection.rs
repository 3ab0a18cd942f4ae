/*!
 * SQLite handle shared by the project repository.
 *
 * rusqlite is synchronous. The handle is a single connection behind a
 * mutex; async code reaches it through `execute_async`, which hops onto
 * tokio's blocking pool so a slow write never stalls a translation run.
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::schema;
use crate::errors::StoreError;

const APP_DIR: &str = "fictrans";
const DB_FILE: &str = "fictrans.db";
const IN_MEMORY: &str = ":memory:";

/// Cloneable handle to one migrated SQLite database
#[derive(Clone)]
pub struct DatabaseConnection {
    location: PathBuf,
    inner: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConnection").field("location", &self.location).finish()
    }
}

impl DatabaseConnection {
    /// Open the database file at `db_path`, creating parent directories
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let location = db_path.as_ref().to_path_buf();
        if let Some(dir) = location.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_context(|| format!("Cannot create database directory {:?}", dir))?;
        }

        info!("Using project database {:?}", location);
        let conn = Connection::open(&location).with_context(|| format!("Cannot open database {:?}", location))?;
        Self::prepare(conn, location)
    }

    /// Open the database in the user's data directory
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Throwaway database, used by tests and dry runs
    pub fn new_in_memory() -> Result<Self> {
        debug!("Opening in-memory project database");
        let conn = Connection::open_in_memory().context("Cannot open in-memory database")?;
        Self::prepare(conn, PathBuf::from(IN_MEMORY))
    }

    fn prepare(conn: Connection, location: PathBuf) -> Result<Self> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            location,
            inner: Arc::new(Mutex::new(conn)),
        })
    }

    /// `<data dir>/fictrans/fictrans.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .ok_or_else(|| anyhow!("No data directory available for the project database"))?;
        Ok(data_dir.join(APP_DIR).join(DB_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.location
    }

    pub fn is_in_memory(&self) -> bool {
        self.location.as_os_str() == IN_MEMORY
    }

    /// Run `f` against the connection on the calling thread
    pub fn execute<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self.inner.lock();
        f(&conn)
    }

    /// Run `f` against the connection on the blocking pool
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let conn = inner.lock();
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Database(format!("database worker stopped: {}", e)))?
    }
}
