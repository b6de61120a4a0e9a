pub mod error;
pub mod youtube;

#[cfg(test)]
mod feed_tests;

use async_trait::async_trait;
use videodog_common::types::FeedItem;

pub use error::FeedError;
pub use youtube::YouTubeFeed;

/// Trait that every content source must implement.
///
/// The daemon only needs the current page of items for a source id, in the
/// order the source publishes them. Transport and parsing stay behind this
/// seam so tests and alternate platforms can substitute their own.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the items currently listed for `source_id`.
    async fn fetch(&self, source_id: &str) -> Result<Vec<FeedItem>, FeedError>;

    /// Human-readable name for this source (e.g., "YouTube").
    fn name(&self) -> &'static str;
}
