//! SQLite-backed slot store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{RegistryError, SlotStore};

/// SQLite-backed slot store.
pub struct SqliteSlotStore {
    conn: Mutex<Connection>,
}

impl SqliteSlotStore {
    /// Create a new SQLite slot store, creating the database file and table if needed.
    pub fn new(path: &Path) -> Result<Self, RegistryError> {
        let conn = Connection::open(path).map_err(|e| RegistryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite slot store (useful for testing).
    pub fn in_memory() -> Result<Self, RegistryError> {
        let conn =
            Connection::open_in_memory().map_err(|e| RegistryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), RegistryError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS slots (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| RegistryError::Database(e.to_string()))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, RegistryError> {
        self.conn
            .lock()
            .map_err(|e| RegistryError::Database(format!("connection lock poisoned: {}", e)))
    }
}

impl SlotStore for SqliteSlotStore {
    fn load(&self, slot: &str) -> Result<Option<String>, RegistryError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM slots WHERE name = ?1",
            params![slot],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| RegistryError::Database(e.to_string()))
    }

    fn save(&self, slot: &str, value: &str) -> Result<(), RegistryError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO slots (name, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![slot, value, Utc::now().to_rfc3339()],
        )
        .map_err(|e| RegistryError::Database(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), RegistryError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM slots WHERE name = ?1", params![slot])
            .map_err(|e| RegistryError::Database(e.to_string()))?;
        Ok(())
    }
}
