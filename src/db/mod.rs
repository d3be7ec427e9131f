use rusqlite::Connection;
use std::path::Path;
use tokio::task;

use crate::error::{ContentGraphError, Result};

pub mod migrate;

/// Database connection wrapper.
///
/// Holds only the database path; every call opens a fresh connection on a
/// blocking task, so the wrapper is cheap to clone into each store.
#[derive(Debug, Clone)]
pub struct Db {
    path: std::path::PathBuf,
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Execute a closure with a database connection in a blocking task
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path).map_err(ContentGraphError::Database)?;

            // WAL for concurrent readers, foreign keys for integrity
            conn.execute_batch(
                "PRAGMA journal_mode = WAL; \
                 PRAGMA synchronous = NORMAL; \
                 PRAGMA foreign_keys = ON; \
                 PRAGMA temp_store = MEMORY;",
            )?;

            f(&mut conn)
        })
        .await
        .map_err(|e| {
            ContentGraphError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("database task failed: {}", e),
            ))
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_db_connection() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Db::new(&db_path);

        let result = db
            .with_connection(|conn| {
                conn.execute("CREATE TABLE test (id INTEGER PRIMARY KEY)", [])
                    .map_err(ContentGraphError::Database)?;
                Ok(())
            })
            .await;

        assert!(result.is_ok());
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_pragmas_set() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Db::new(&db_path);

        db.with_connection(|conn| {
            let journal_mode: String =
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
            assert_eq!(journal_mode.to_uppercase(), "WAL");

            let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
            assert_eq!(foreign_keys, 1);

            Ok::<(), ContentGraphError>(())
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_db_clone_shares_path() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Db::new(&db_path);
        let db2 = db.clone();

        db.with_connection(|conn| {
            conn.execute("CREATE TABLE shared (id INTEGER PRIMARY KEY)", [])?;
            conn.execute("INSERT INTO shared (id) VALUES (1)", [])?;
            Ok::<(), ContentGraphError>(())
        })
        .await
        .unwrap();

        let count = db2
            .with_connection(|conn| {
                let n: i64 = conn.query_row("SELECT COUNT(*) FROM shared", [], |row| row.get(0))?;
                Ok::<i64, ContentGraphError>(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
