//! Database access for abz-client
//!
//! A single SQLite file holds the processed-file log.

pub mod filelog;

pub use filelog::{FileLog, FileLogEntry};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

/// Open (creating if needed) the database at `db_path`
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tracing::debug!("Connecting to database: {}", db_path.display());

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    init_tables(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory database
///
/// An in-memory SQLite database lives per connection, so the pool is
/// limited to one.
pub async fn init_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    init_tables(&pool).await?;
    Ok(pool)
}

/// Create the `filelog` table if it does not exist
///
/// `filename` is deliberately not unique; repeated records for a path are
/// kept.
async fn init_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS filelog (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            filename TEXT NOT NULL,
            reason TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_filelog_filename ON filelog(filename)")
        .execute(pool)
        .await?;

    tracing::debug!("Database tables initialized (filelog)");

    Ok(())
}
