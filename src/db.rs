use crate::models::LatLon;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("path serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Blob storage for the travel path. `save` always receives the full path.
pub trait PathStore {
    fn load(&self) -> Result<Vec<LatLon>, StorageError>;
    fn save(&mut self, points: &[LatLon]) -> Result<(), StorageError>;
}

impl<S: PathStore + ?Sized> PathStore for Box<S> {
    fn load(&self) -> Result<Vec<LatLon>, StorageError> {
        (**self).load()
    }

    fn save(&mut self, points: &[LatLon]) -> Result<(), StorageError> {
        (**self).save(points)
    }
}

/// Key/value table in a local SQLite file; the path is one JSON value.
pub struct SqlitePathStore {
    conn: Connection,
    key: String,
}

impl SqlitePathStore {
    pub fn open<P: AsRef<Path>>(db_path: P, key: &str) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open(db_path)?, key)
    }

    pub fn with_connection(conn: Connection, key: &str) -> Result<Self, StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn,
            key: key.to_string(),
        })
    }

    /// Serialized value as stored, if any.
    pub fn raw(&self) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [&self.key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }
}

impl PathStore for SqlitePathStore {
    fn load(&self) -> Result<Vec<LatLon>, StorageError> {
        match self.raw()? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&mut self, points: &[LatLon]) -> Result<(), StorageError> {
        let json = serde_json::to_string(points)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)",
            params![self.key, json],
        )?;
        Ok(())
    }
}

/// In-process store, used when persistence is disabled and in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryPathStore {
    blob: Option<String>,
    pub saves: usize,
}

impl MemoryPathStore {
    pub fn with_points(points: &[LatLon]) -> Result<Self, StorageError> {
        Ok(Self {
            blob: Some(serde_json::to_string(points)?),
            saves: 0,
        })
    }

    pub fn raw(&self) -> Option<&str> {
        self.blob.as_deref()
    }
}

impl PathStore for MemoryPathStore {
    fn load(&self) -> Result<Vec<LatLon>, StorageError> {
        match &self.blob {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&mut self, points: &[LatLon]) -> Result<(), StorageError> {
        self.blob = Some(serde_json::to_string(points)?);
        self.saves += 1;
        Ok(())
    }
}
