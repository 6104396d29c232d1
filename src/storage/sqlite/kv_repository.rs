use rusqlite::OptionalExtension;

use crate::errors::ClubFeedResult;
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::KeyValueStore;

#[derive(Clone)]
pub struct SqliteKeyValueStore {
    storage: SqliteStorage,
}

impl SqliteKeyValueStore {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> ClubFeedResult<Option<String>> {
        let conn = self.storage.connection()?;
        let value = conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> ClubFeedResult<()> {
        let conn = self.storage.connection()?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (key, value),
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> ClubFeedResult<()> {
        let conn = self.storage.connection()?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(())
    }

    fn keys(&self) -> ClubFeedResult<Vec<String>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}
