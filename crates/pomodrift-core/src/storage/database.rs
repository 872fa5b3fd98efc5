//! SQLite-backed key-value storage.
//!
//! Holds the persisted timer snapshot and the task list as JSON values in a
//! single `kv` table.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::data_dir;
use super::timer_store::TimerStorage;
use crate::error::{DatabaseError, Result};
use crate::timer::{PartialTimerState, TimerState};

/// Key under which the timer snapshot is stored.
pub const TIMER_KEY: &str = "timer_state";

/// Key under which the task list is stored.
pub const TASKS_KEY: &str = "tasks";

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/pomodrift.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(data_dir()?.join("pomodrift.db"))
    }

    /// Open (or create) a database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read and deserialize a JSON value.
    pub fn kv_get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.kv_get(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store a JSON value.
    pub fn kv_set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.kv_set(key, &json)
    }
}

/// [`TimerStorage`] over the database's kv table.
pub struct DatabaseStorage {
    db: Mutex<Database>,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Give the database back, e.g. to store other keys after the timer is done.
    pub fn into_inner(self) -> Database {
        self.db.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TimerStorage for DatabaseStorage {
    fn load(&self) -> Option<PartialTimerState> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        match db.kv_get_json::<PartialTimerState>(TIMER_KEY) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "discarding unreadable timer snapshot");
                None
            }
        }
    }

    fn save(&self, state: &TimerState) -> Result<()> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        db.kv_set_json(TIMER_KEY, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerMode;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_set("test", "again").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "again");
    }

    #[test]
    fn storage_round_trips_snapshot() {
        let storage = DatabaseStorage::new(Database::open_memory().unwrap());
        assert!(storage.load().is_none());

        let state = TimerState::default().set_mode(TimerMode::Break, 120);
        storage.save(&state).unwrap();
        assert_eq!(storage.load(), Some(PartialTimerState::from(state)));
    }

    #[test]
    fn storage_treats_garbage_as_absent() {
        let db = Database::open_memory().unwrap();
        db.kv_set(TIMER_KEY, "not json at all").unwrap();
        let storage = DatabaseStorage::new(db);
        assert!(storage.load().is_none());
    }

    #[test]
    fn storage_keeps_valid_fields_of_partial_record() {
        let db = Database::open_memory().unwrap();
        db.kv_set(TIMER_KEY, r#"{"mode":"break","remaining":"soon"}"#)
            .unwrap();
        let snapshot = DatabaseStorage::new(db).load().unwrap();
        assert_eq!(snapshot.mode, Some(TimerMode::Break));
        assert_eq!(snapshot.remaining, None);
    }

    #[test]
    fn file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pomodrift.db");
        {
            let storage = DatabaseStorage::new(Database::open_at(&path).unwrap());
            storage.save(&TimerState::default()).unwrap();
        }
        let storage = DatabaseStorage::new(Database::open_at(&path).unwrap());
        assert_eq!(
            storage.load(),
            Some(PartialTimerState::from(TimerState::default()))
        );
    }
}
