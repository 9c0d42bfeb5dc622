//! Local redb database.
//!
//! One database file backs both durable pieces of coordinator state: the
//! sequence counter and the offline submission queue. Each component
//! defines its own tables against the shared handle.
//!
//! Survives process death; this is terminal-local state, not the order
//! store, which lives behind [`crate::store::PosStore`].

use std::path::Path;
use std::sync::Arc;

use redb::backends::InMemoryBackend;
use redb::Database;

/// Open (or create) the database file under `data_dir`.
pub fn open(data_dir: &Path) -> Result<Arc<Database>, redb::DatabaseError> {
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| redb::DatabaseError::from(redb::StorageError::from(e)))?;
    }
    let db = Database::create(data_dir.join("pos_local.redb"))?;
    Ok(Arc::new(db))
}

/// In-memory database for tests and ephemeral terminals.
pub fn open_in_memory() -> Result<Arc<Database>, redb::DatabaseError> {
    let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
    Ok(Arc::new(db))
}
