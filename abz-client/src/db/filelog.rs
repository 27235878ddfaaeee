//! Processed-file log
//!
//! Durable record of which files have been handled. Any row for a path,
//! success or failure, means the file is not processed again; retrying a
//! failed file requires deleting its rows by hand.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::path::Path;

/// Reason recorded when the extractor exits unsuccessfully
pub const REASON_EXTRACTOR: &str = "extractor";
/// Reason recorded when the extractor output cannot be read
pub const REASON_JSON: &str = "json";

/// One row of the processed-file log
#[derive(Debug, Clone, PartialEq)]
pub struct FileLogEntry {
    pub filename: String,
    /// `None` for success
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Processed-file log backed by SQLite
#[derive(Debug, Clone)]
pub struct FileLog {
    db: SqlitePool,
}

impl FileLog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Open the log stored at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self, sqlx::Error> {
        Ok(Self::new(super::init_database_pool(db_path).await?))
    }

    /// Open a throwaway in-memory log
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        Ok(Self::new(super::init_memory_pool().await?))
    }

    /// True if the path has at least one recorded outcome
    pub async fn is_processed(&self, path: &Path) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM filelog WHERE filename = ? LIMIT 1")
            .bind(key(path))
            .fetch_optional(&self.db)
            .await?;

        Ok(row.is_some())
    }

    /// Append an outcome for `path` (`None` reason = success)
    pub async fn record(&self, path: &Path, reason: Option<&str>) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO filelog (filename, reason, created_at) VALUES (?, ?, ?)")
            .bind(key(path))
            .bind(reason)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// All rows recorded for `path`, oldest first
    pub async fn entries(&self, path: &Path) -> Result<Vec<FileLogEntry>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT filename, reason, created_at FROM filelog WHERE filename = ? ORDER BY id",
        )
        .bind(key(path))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                let created_at: String = row.get("created_at");
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
                    .with_timezone(&Utc);

                Ok(FileLogEntry {
                    filename: row.get("filename"),
                    reason: row.get("reason"),
                    created_at,
                })
            })
            .collect()
    }

    /// Total number of rows
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM filelog")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}

fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_unrecorded_path_not_processed() {
        let log = FileLog::in_memory().await.unwrap();
        assert!(!log.is_processed(Path::new("/music/a.flac")).await.unwrap());
    }

    #[tokio::test]
    async fn test_success_and_failure_both_count_as_processed() {
        let log = FileLog::in_memory().await.unwrap();
        log.record(Path::new("/music/a.flac"), None).await.unwrap();
        log.record(Path::new("/music/b.mp3"), Some(REASON_EXTRACTOR))
            .await
            .unwrap();

        assert!(log.is_processed(Path::new("/music/a.flac")).await.unwrap());
        assert!(log.is_processed(Path::new("/music/b.mp3")).await.unwrap());
        assert!(!log.is_processed(Path::new("/music/c.ogg")).await.unwrap());

        let entries = log.entries(Path::new("/music/b.mp3")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reason.as_deref(), Some("extractor"));
    }

    #[tokio::test]
    async fn test_duplicate_records_persist() {
        let log = FileLog::in_memory().await.unwrap();
        let path = Path::new("/music/a.flac");
        log.record(path, Some(REASON_JSON)).await.unwrap();
        log.record(path, None).await.unwrap();

        let entries = log.entries(path).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].reason.as_deref(), Some("json"));
        assert_eq!(entries[1].reason, None);
        assert_eq!(log.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_log_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("filelog.db");

        {
            let log = FileLog::open(&db_path).await.unwrap();
            log.record(Path::new("/music/a.flac"), None).await.unwrap();
        }

        let log = FileLog::open(&db_path).await.unwrap();
        assert!(log.is_processed(Path::new("/music/a.flac")).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let dir = TempDir::new().unwrap();
        let log = FileLog::open(&dir.path().join("filelog.db")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                let path = format!("/music/{}.flac", i);
                log.record(Path::new(&path), None).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(log.count().await.unwrap(), 16);
    }
}
