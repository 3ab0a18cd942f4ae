/*!
 * Project persistence.
 *
 * - `store`: the `ProjectStore` contract and an in-memory implementation
 * - `connection`/`schema`: SQLite connection handling and migrations
 * - `repository`: the SQLite-backed `ProjectStore`
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;
pub mod store;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::ProjectRecord;
pub use repository::ProjectRepository;
pub use store::{MemoryProjectStore, ProjectStore, ProjectSummary};
