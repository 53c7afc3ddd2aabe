// Storage schema and database management

use rusqlite::{Connection, Result as SqliteResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Whether to enable WAL mode
    pub wal_enabled: bool,

    /// Cache size in pages
    pub cache_size_pages: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            wal_enabled: true,
            cache_size_pages: Some(2000),
        }
    }
}

/// Main storage interface
pub struct Storage {
    conn: Connection,
    config: StorageConfig,
}

impl Storage {
    /// Open storage with default config
    pub fn open<P: AsRef<Path>>(path: P) -> SqliteResult<Self> {
        Self::open_with_config(path, StorageConfig::default())
    }

    /// Open storage with custom config
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StorageConfig) -> SqliteResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn, config)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> SqliteResult<Self> {
        let config = StorageConfig {
            wal_enabled: false,
            ..StorageConfig::default()
        };
        Self::init(Connection::open_in_memory()?, config)
    }

    fn init(conn: Connection, config: StorageConfig) -> SqliteResult<Self> {
        // WAL lets history reads run next to prediction writes
        if config.wal_enabled {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }

        if let Some(cache_size) = config.cache_size_pages {
            conn.pragma_update(None, "cache_size", cache_size)?;
        }

        let mut storage = Self { conn, config };
        storage.initialize_schema()?;
        Ok(storage)
    }

    /// Initialize database schema
    fn initialize_schema(&mut self) -> SqliteResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                input_data TEXT NOT NULL,
                prediction TEXT NOT NULL,
                confidence REAL NOT NULL,
                probabilities TEXT NOT NULL,
                bmi REAL NOT NULL,
                bmi_category TEXT NOT NULL,
                risk_level TEXT NOT NULL,
                recommendations TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Migration: databases created before the BMI cross-check was stored
        let columns: Vec<String> = self
            .conn
            .prepare("PRAGMA table_info(predictions)")?
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<SqliteResult<Vec<_>>>()?;

        if !columns.iter().any(|c| c == "bmi_category") {
            self.conn.execute(
                "ALTER TABLE predictions ADD COLUMN bmi_category TEXT NOT NULL DEFAULT ''",
                [],
            )?;
        }

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_predictions_user_created ON predictions(user_id, created_at)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_predictions_created ON predictions(created_at)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_predictions_label ON predictions(prediction)",
            [],
        )?;

        Ok(())
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL into the main database file
    pub fn close(&mut self) -> SqliteResult<()> {
        if self.config.wal_enabled {
            self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_storage_creation() {
        let temp_file = NamedTempFile::new().unwrap();
        let storage = Storage::open(temp_file.path());
        assert!(storage.is_ok());
    }

    #[test]
    fn test_schema_initialization() {
        let storage = Storage::open_in_memory().unwrap();

        let table_count: i64 = storage
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = 'predictions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_count, 1);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut first = Storage::open(temp_file.path()).unwrap();
        first.close().unwrap();
        drop(first);

        assert!(Storage::open(temp_file.path()).is_ok());
    }

    #[test]
    fn test_legacy_table_gets_bmi_category_column() {
        let temp_file = NamedTempFile::new().unwrap();
        {
            let conn = Connection::open(temp_file.path()).unwrap();
            conn.execute(
                "CREATE TABLE predictions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL,
                    input_data TEXT NOT NULL,
                    prediction TEXT NOT NULL,
                    confidence REAL NOT NULL,
                    probabilities TEXT NOT NULL,
                    bmi REAL NOT NULL,
                    risk_level TEXT NOT NULL,
                    recommendations TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                )",
                [],
            )
            .unwrap();
        }

        let storage = Storage::open(temp_file.path()).unwrap();
        let has_column: bool = storage
            .conn()
            .prepare("PRAGMA table_info(predictions)")
            .unwrap()
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .any(|c| c.unwrap() == "bmi_category");
        assert!(has_column);
    }
}
