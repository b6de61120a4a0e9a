use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::error::AppError;

/// Spool path that selects an in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Create a SQLite connection pool for the spool at `path`.
///
/// The file and its parent directories are created when missing. An
/// in-memory database lives in a single connection that is never recycled,
/// so `max_connections` is ignored for it.
pub async fn create_pool(path: &str, max_connections: u32) -> Result<SqlitePool, AppError> {
    let pool = if path == IN_MEMORY {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(AppError::StoreInit)?;

        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(AppError::StoreInit)?
    } else {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::StoreInit(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(AppError::StoreInit)?
    };

    tracing::info!(path, "Opened spool database");
    Ok(pool)
}
