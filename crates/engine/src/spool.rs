//! Durable record of announced videos ("spool").
//!
//! A row `(channel_key, video_id)` means the video will never be announced
//! again for that channel configuration. The unique index makes the insert
//! the commit point: racing inserts of the same pair collapse into one row
//! and the loser is treated as success.
//!
//! The spool is a plain SQLite database so it can be inspected or edited with
//! any SQLite client. `:memory:` selects an in-memory spool for tests.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use videodog_common::db;
use videodog_common::error::AppError;
use videodog_common::types::NotificationRecord;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS announcements (
        id INTEGER PRIMARY KEY,
        channel_key VARCHAR(64) NOT NULL,
        video_id VARCHAR(64) NOT NULL,
        announced_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
"#;

const CREATE_INDEX: &str = r#"
    CREATE UNIQUE INDEX IF NOT EXISTS announcements_videos
    ON announcements (channel_key, video_id)
"#;

/// Membership and idempotent insertion of `(channel_key, video_id)` pairs.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Whether `video_id` has already been handled for `channel_key`.
    async fn is_announced(&self, channel_key: &str, video_id: &str) -> Result<bool, AppError>;

    /// Record `video_id` as handled for `channel_key`. Recording a pair that
    /// already exists succeeds without changing anything.
    async fn mark_announced(&self, channel_key: &str, video_id: &str) -> Result<(), AppError>;
}

/// SQLite-backed spool.
pub struct Spool {
    pool: SqlitePool,
}

impl Spool {
    /// Open (creating if needed) the spool at `path`.
    pub async fn open(path: &str, max_connections: u32) -> Result<Self, AppError> {
        tracing::info!(path, "Opening spool");
        let pool = db::create_pool(path, max_connections).await?;
        Self::from_pool(pool).await
    }

    /// Open an in-memory spool.
    pub async fn in_memory() -> Result<Self, AppError> {
        Self::open(db::IN_MEMORY, 1).await
    }

    /// Wrap an existing pool, making sure the schema exists.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, AppError> {
        Self::init_schema(&pool)
            .await
            .map_err(AppError::StoreInit)?;
        Ok(Self { pool })
    }

    /// Create the table and index in one transaction, so a crash never
    /// leaves a table without its uniqueness guarantee.
    async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        tracing::debug!("Initializing spool schema");

        let mut tx = pool.begin().await?;
        sqlx::query(CREATE_TABLE).execute(&mut *tx).await?;
        sqlx::query(CREATE_INDEX).execute(&mut *tx).await?;
        tx.commit().await
    }

    /// Look up the stored record for a pair.
    pub async fn record(
        &self,
        channel_key: &str,
        video_id: &str,
    ) -> Result<Option<NotificationRecord>, AppError> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            "SELECT channel_key, video_id, announced_at FROM announcements WHERE channel_key = ? AND video_id = ?",
        )
        .bind(channel_key)
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Number of videos recorded for `channel_key`.
    pub async fn count(&self, channel_key: &str) -> Result<u64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM announcements WHERE channel_key = ?")
                .bind(channel_key)
                .fetch_one(&self.pool)
                .await?;

        Ok(count as u64)
    }

    /// Close the underlying pool, waiting for in-flight queries.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl DedupStore for Spool {
    async fn is_announced(&self, channel_key: &str, video_id: &str) -> Result<bool, AppError> {
        let (exists,): (i64,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM announcements WHERE channel_key = ? AND video_id = ?)",
        )
        .bind(channel_key)
        .bind(video_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists != 0)
    }

    async fn mark_announced(&self, channel_key: &str, video_id: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO announcements (channel_key, video_id, announced_at)
            VALUES (?, ?, ?)
            ON CONFLICT (channel_key, video_id) DO NOTHING
            "#,
        )
        .bind(channel_key)
        .bind(video_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(channel = channel_key, video_id, "Video already in spool");
        } else {
            tracing::debug!(channel = channel_key, video_id, "Marked video as announced");
        }
        Ok(())
    }
}
