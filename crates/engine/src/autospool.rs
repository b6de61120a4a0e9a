//! Startup baseline ("autospool").
//!
//! Fetches every feed once and records all listed videos without announcing
//! any of them, so only uploads published after startup are announced. This
//! keeps a newly configured channel from flooding its webhook with its
//! whole back catalogue.
//!
//! A source whose feed cannot be read here is flagged; its first successful
//! scheduled check takes the baseline instead of announcing.

use chrono::{DateTime, Utc};

use videodog_common::error::AppError;

use crate::processor::FeedProcessor;
use crate::source::SourceSet;

/// Result of a baseline pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AutospoolSummary {
    /// Sources whose feed was read.
    pub sources: usize,
    /// Videos newly recorded in the spool.
    pub marked: usize,
    /// Keys of sources whose feed could not be read.
    pub deferred: Vec<String>,
}

/// Record everything currently listed in every feed as already announced.
///
/// Must complete before the scheduler starts. Only spool errors are
/// returned; a failed fetch defers the baseline of that source.
pub async fn autospool(
    processor: &FeedProcessor,
    sources: &SourceSet,
    now: DateTime<Utc>,
) -> Result<AutospoolSummary, AppError> {
    let mut summary = AutospoolSummary::default();

    for source in sources.iter() {
        let _guard = source.lock().await;

        let items = match processor.fetch(source).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    source = source.key(),
                    error = %e,
                    "Autospool fetch failed, baseline deferred to first successful check"
                );
                source.set_baseline_pending(true);
                summary.deferred.push(source.key().to_string());
                continue;
            }
        };

        // The feed was just read; the next scheduled check waits a full interval.
        source.record_check(now);

        let marked = processor.mark_all(source.key(), &items).await?;
        tracing::info!(
            source = source.key(),
            listed = items.len(),
            marked,
            "Autospooled feed"
        );

        summary.sources += 1;
        summary.marked += marked;
    }

    Ok(summary)
}
