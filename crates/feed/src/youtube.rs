//! YouTube channel feed reader.
//!
//! Every channel publishes its most recent uploads as an Atom document. The
//! reader downloads it, parses it with `feed-rs` and demangles the entries
//! into [`FeedItem`]s.

use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::Feed;
use reqwest::Client;
use videodog_common::types::FeedItem;

use crate::{FeedError, FeedSource};

/// Public endpoint serving channel feeds.
pub const DEFAULT_FEED_BASE_URL: &str = "https://www.youtube.com/feeds/videos.xml";

/// Upper bound on a feed document. YouTube serves the 15 latest uploads.
pub const MAX_FEED_SIZE: u64 = 5 * 1024 * 1024;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TOTAL_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("videodog/", env!("CARGO_PKG_VERSION"));

/// Prefix of Atom entry ids carrying a video id.
const VIDEO_ID_PREFIX: &str = "yt:video:";

/// Reads channel feeds from YouTube.
pub struct YouTubeFeed {
    client: Client,
    base_url: String,
}

impl YouTubeFeed {
    pub fn new() -> Result<Self, FeedError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_FEED_BASE_URL.to_string(),
        })
    }

    /// Point the reader at a different feed endpoint (mirrors, local fixtures).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Feed URL for `channel_id`.
    pub fn feed_url(&self, channel_id: &str) -> String {
        format!("{}?channel_id={}", self.base_url, channel_id)
    }

    async fn download(&self, channel_id: &str) -> Result<Vec<u8>, FeedError> {
        let url = self.feed_url(channel_id);
        tracing::debug!(url = %url, "Downloading feed");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), "Feed response received");

        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        if let Some(length) = response.content_length()
            && length > MAX_FEED_SIZE
        {
            return Err(FeedError::TooLarge {
                limit: MAX_FEED_SIZE,
                actual: length,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.len() as u64 > MAX_FEED_SIZE {
            return Err(FeedError::TooLarge {
                limit: MAX_FEED_SIZE,
                actual: bytes.len() as u64,
            });
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FeedSource for YouTubeFeed {
    async fn fetch(&self, source_id: &str) -> Result<Vec<FeedItem>, FeedError> {
        let bytes = self.download(source_id).await?;
        let items = parse_feed(&bytes)?;
        tracing::debug!(channel_id = source_id, entries = items.len(), "Parsed feed");
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "YouTube"
    }
}

/// Parse a channel Atom document into items, preserving document order.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedItem>, FeedError> {
    let feed = feed_rs::parser::parse(bytes)?;
    Ok(demangle_feed(feed))
}

fn demangle_feed(feed: Feed) -> Vec<FeedItem> {
    let feed_title = feed.title.map(|t| t.content);

    feed.entries
        .into_iter()
        .filter_map(|entry| {
            let Some(video_id) = video_id(&entry.id) else {
                tracing::debug!(entry_id = %entry.id, "Skipping entry without a video id");
                return None;
            };

            let channel_name = feed_title
                .clone()
                .or_else(|| entry.authors.first().map(|a| a.name.clone()))
                .unwrap_or_default();
            let description = entry
                .media
                .iter()
                .find_map(|m| m.description.as_ref())
                .map(|d| d.content.clone())
                .unwrap_or_default();
            let video_url = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={video_id}"));

            Some(FeedItem {
                channel_name,
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                description,
                video_url,
                // The feed carries a low resolution thumbnail; the maxres rendition
                // is always available under a predictable URL.
                thumbnail_url: format!("https://i1.ytimg.com/vi/{video_id}/maxresdefault.jpg"),
                video_id,
            })
        })
        .collect()
}

/// Extract the video id from an Atom entry id (`yt:video:<id>`).
pub fn video_id(entry_id: &str) -> Option<String> {
    let id = entry_id.strip_prefix(VIDEO_ID_PREFIX)?.trim();
    (!id.is_empty()).then(|| id.to_string())
}
