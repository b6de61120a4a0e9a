use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where announcements for a monitored channel are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Discord webhook endpoint.
    pub webhook_url: String,
    /// Role to mention in the message. No mention is added when absent.
    pub role_id: Option<String>,
}

/// A single video as read from a channel feed.
///
/// Only `video_id` matters to deduplication; the rest is display metadata
/// passed through to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub video_id: String,
    pub channel_name: String,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
}

/// A row of the spool: proof that `video_id` was handled for `channel_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationRecord {
    pub channel_key: String,
    pub video_id: String,
    pub announced_at: DateTime<Utc>,
}
