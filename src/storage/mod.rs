// Persisted key-value storage
// Narrow get/set/remove seam standing in for the page's session storage

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StorageError;

/// Page-persisted key-value slot
///
/// Only [`crate::auth::TokenStore`] talks to this; nothing else in the crate
/// reads persisted storage directly.
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`; absent keys are not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
