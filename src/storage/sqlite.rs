// SQLite-backed storage
// Lets the headless client keep its session slot between runs

use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use super::KeyValueStore;
use crate::error::StorageError;

const SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS session_kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)";

/// Key-value store persisted in the `session_kv` table
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Backend(format!(
                    "Failed to create session directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        tracing::debug!("Opening session store: {}", path.display());
        Self::init(Connection::open(path)?)
    }

    /// Store that lives only as long as the value
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StorageError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StorageError::Backend("session store lock poisoned".to_string()))?;
        Ok(f(&conn)?)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM session_kv WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO session_kv (key, value) VALUES (?1, ?2) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                [key, value],
            )
            .map(|_| ())
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM session_kv WHERE key = ?", [key])
                .map(|_| ())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_overwrite() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get("access_token").unwrap(), None);

        store.set("access_token", "tok1").unwrap();
        store.set("access_token", "tok2").unwrap();
        assert_eq!(store.get("access_token").unwrap().as_deref(), Some("tok2"));

        store.remove("access_token").unwrap();
        assert_eq!(store.get("access_token").unwrap(), None);
    }

    #[test]
    fn test_remove_missing_key() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.remove("nothing").is_ok());
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = std::env::temp_dir().join(format!("udo-session-test-{}", std::process::id()));
        let path = dir.join("nested").join("session.sqlite3");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("access_token", "persisted").unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("access_token").unwrap().as_deref(),
            Some("persisted")
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
