//! Announcement delivery.
//!
//! New videos are announced through a [`Notifier`]. The shipped
//! implementation posts to Discord webhooks: a short content line that can
//! mention a role, plus one embed with the video details.

pub mod discord;
pub mod error;
pub mod message;

use async_trait::async_trait;
use videodog_common::types::{Destination, FeedItem};

pub use discord::{DiscordClientConfig, DiscordWebhookNotifier};
pub use error::NotifyError;
pub use message::WebhookMessage;

/// Sends a human-facing announcement for a single item.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, item: &FeedItem, destination: &Destination) -> Result<(), NotifyError>;
}
