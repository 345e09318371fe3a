use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

/// The opaque key-value collaborator everything durable sits on.
///
/// Implementations must be `Send + Sync`; callers hold them behind an `Arc`.
/// Values are raw bytes — the layers above store self-describing JSON.
pub trait KeyValStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;
    fn has_key(&self, key: &str) -> Result<bool>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Initialise the kv table.
///
/// Safe to call on every startup — uses `IF NOT EXISTS`.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value BLOB NOT NULL
        );",
    )?;
    Ok(())
}

/// SQLite-backed [`KeyValStore`].
///
/// Wraps a single connection in a `Mutex`, same as the other single-node
/// subsystems. Writes are upserts; removing a missing key is a no-op.
pub struct SqliteKeyValStore {
    db: Mutex<Connection>,
}

impl SqliteKeyValStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }
}

impl KeyValStore for SqliteKeyValStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let db = self.db.lock().unwrap();
        let value = db
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn has_key(&self, key: &str) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM kv WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute("DELETE FROM kv WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn memory_store() -> SqliteKeyValStore {
    let conn = Connection::open_in_memory().expect("in-memory sqlite");
    init_db(&conn).expect("init kv table");
    SqliteKeyValStore::new(conn)
}
