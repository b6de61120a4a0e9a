//! Poll-and-announce procedure.
//!
//! For one source:
//! 1. Ask the staleness gate whether the source is due (no I/O otherwise)
//! 2. Fetch the feed
//! 3. Walk the items in feed order and stop at the first one not in the spool
//! 4. Announce it (unless running dry) and only then record it in the spool
//!
//! At most one video is announced per source per check. A backlog of new
//! uploads drains one video per poll interval instead of pinging everyone at
//! once.
//!
//! Fetch and announce failures are returned as outcomes and retried on the
//! next due check. Spool failures are returned as errors: without the spool
//! the daemon cannot tell what it already announced.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use videodog_common::error::AppError;
use videodog_common::types::FeedItem;
use videodog_feed::FeedSource;
use videodog_notifier::Notifier;

use crate::source::MonitoredSource;
use crate::spool::DedupStore;

/// What happened to a source during one check.
#[derive(Debug)]
pub enum CheckOutcome {
    /// The source was checked less than one poll interval ago.
    NotDue,
    /// Every item in the feed is already in the spool.
    NoNewItems,
    /// A video was announced and recorded.
    Announced { video_id: String },
    /// Dry run: a video was recorded without announcing it.
    Recorded { video_id: String },
    /// The startup baseline was taken late; every listed video was recorded.
    Baselined { marked: usize },
    /// The feed could not be read.
    FetchFailed(AppError),
    /// The announcement failed; the video stays out of the spool.
    AnnounceFailed { video_id: String, error: AppError },
}

/// Central processor wiring the feed, the notifier and the spool together.
pub struct FeedProcessor {
    feed: Arc<dyn FeedSource>,
    notifier: Arc<dyn Notifier>,
    spool: Arc<dyn DedupStore>,
    announce: bool,
}

impl FeedProcessor {
    /// `announce = false` is dry-run mode: state advances, nothing is sent.
    pub fn new(
        feed: Arc<dyn FeedSource>,
        notifier: Arc<dyn Notifier>,
        spool: Arc<dyn DedupStore>,
        announce: bool,
    ) -> Self {
        Self {
            feed,
            notifier,
            spool,
            announce,
        }
    }

    pub fn announces(&self) -> bool {
        self.announce
    }

    /// Run one check of `source` at `now`.
    pub async fn check_source(
        &self,
        source: &MonitoredSource,
        now: DateTime<Utc>,
    ) -> Result<CheckOutcome, AppError> {
        let _guard = source.lock().await;

        if !source.try_acquire_check(source.poll_interval(), now) {
            return Ok(CheckOutcome::NotDue);
        }

        let items = match self.fetch(source).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(source = source.key(), error = %e, "Feed fetch failed");
                return Ok(CheckOutcome::FetchFailed(e));
            }
        };

        if source.baseline_pending() {
            let marked = self.mark_all(source.key(), &items).await?;
            source.set_baseline_pending(false);
            tracing::info!(source = source.key(), marked, "Baseline taken");
            return Ok(CheckOutcome::Baselined { marked });
        }

        self.announce_first_new(source, &items).await
    }

    /// Fetch the current items of `source`, bypassing the staleness gate.
    pub(crate) async fn fetch(&self, source: &MonitoredSource) -> Result<Vec<FeedItem>, AppError> {
        tracing::debug!(
            source = source.key(),
            channel_id = source.channel_id(),
            feed = self.feed.name(),
            "Fetching feed"
        );
        self.feed
            .fetch(source.channel_id())
            .await
            .map_err(|e| AppError::Fetch(e.to_string()))
    }

    /// Record every item not yet in the spool, without announcing.
    pub(crate) async fn mark_all(
        &self,
        channel_key: &str,
        items: &[FeedItem],
    ) -> Result<usize, AppError> {
        let mut marked = 0;
        for item in items {
            if !self.spool.is_announced(channel_key, &item.video_id).await? {
                self.spool
                    .mark_announced(channel_key, &item.video_id)
                    .await?;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn announce_first_new(
        &self,
        source: &MonitoredSource,
        items: &[FeedItem],
    ) -> Result<CheckOutcome, AppError> {
        let key = source.key();

        // Only the first new item is handled; the rest wait for later checks.
        let mut first_new = None;
        for item in items {
            if !self.spool.is_announced(key, &item.video_id).await? {
                first_new = Some(item);
                break;
            }
        }
        let Some(item) = first_new else {
            tracing::debug!(source = key, "No new videos");
            return Ok(CheckOutcome::NoNewItems);
        };
        let video_id = item.video_id.clone();

        if self.announce {
            if let Err(e) = self.notifier.send(item, source.destination()).await {
                tracing::error!(
                    source = key,
                    video_id = %video_id,
                    error = %e,
                    "Announce failed, video will be retried"
                );
                return Ok(CheckOutcome::AnnounceFailed {
                    video_id,
                    error: AppError::Notify(e.to_string()),
                });
            }
        } else {
            tracing::info!(source = key, video_id = %video_id, "Skipping announce, running in dry-run mode");
        }

        self.spool.mark_announced(key, &video_id).await?;

        tracing::info!(source = key, video_id = %video_id, "New video handled");
        if self.announce {
            Ok(CheckOutcome::Announced { video_id })
        } else {
            Ok(CheckOutcome::Recorded { video_id })
        }
    }
}
