//! Process-wide context built once at startup.

use std::sync::Arc;

use chrono::Utc;

use videodog_common::config::AppConfig;
use videodog_common::error::AppError;
use videodog_feed::FeedSource;
use videodog_notifier::Notifier;

use crate::autospool::{AutospoolSummary, autospool};
use crate::processor::FeedProcessor;
use crate::source::SourceSet;
use crate::spool::DedupStore;

/// Configuration snapshot, monitored sources and the processor, shared by
/// the startup baseline and the scheduler.
pub struct AppContext {
    pub config: AppConfig,
    pub sources: SourceSet,
    pub processor: FeedProcessor,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        feed: Arc<dyn FeedSource>,
        notifier: Arc<dyn Notifier>,
        spool: Arc<dyn DedupStore>,
        announce: bool,
    ) -> Self {
        let sources = SourceSet::from_config(&config);
        let processor = FeedProcessor::new(feed, notifier, spool, announce);

        tracing::info!(
            sources = sources.len(),
            announce,
            "Application context ready"
        );
        Self {
            config,
            sources,
            processor,
        }
    }

    /// Take the startup baseline if the configuration asks for it.
    pub async fn bootstrap(&self) -> Result<Option<AutospoolSummary>, AppError> {
        if !self.config.autospool {
            tracing::info!("Autospool disabled, every unseen video is eligible");
            return Ok(None);
        }

        let summary = autospool(&self.processor, &self.sources, Utc::now()).await?;
        tracing::info!(
            sources = summary.sources,
            marked = summary.marked,
            deferred = summary.deferred.len(),
            "Autospool finished"
        );
        Ok(Some(summary))
    }
}
