//! Discord webhook HTTP client with retry and rate limit handling

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use videodog_common::types::{Destination, FeedItem};

use crate::message::{RateLimitResponse, WebhookMessage};
use crate::{Notifier, NotifyError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_RATE_LIMIT_WAIT_MS: u64 = 5000;

/// Configuration for the Discord webhook client
#[derive(Debug, Clone)]
pub struct DiscordClientConfig {
    /// Total attempts per announcement, including the first one
    pub max_attempts: u32,

    /// Base delay between retries in milliseconds, doubled per attempt
    pub retry_delay_ms: u64,

    /// HTTP request timeout
    pub timeout: Duration,
}

impl Default for DiscordClientConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Posts announcements to whichever webhook the destination names.
pub struct DiscordWebhookNotifier {
    client: Client,
    config: DiscordClientConfig,
}

impl DiscordWebhookNotifier {
    pub fn new() -> Result<Self, NotifyError> {
        Self::with_config(DiscordClientConfig::default())
    }

    pub fn with_config(config: DiscordClientConfig) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Send `message` to `webhook_url`, retrying transient failures.
    pub async fn send_message(
        &self,
        webhook_url: &str,
        message: &WebhookMessage,
    ) -> Result<(), NotifyError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;

            let err = match self.send_once(webhook_url, message).await {
                Ok(()) => {
                    if attempts > 1 {
                        info!(attempts, "Webhook message sent after retries");
                    }
                    return Ok(());
                }
                Err(e) => e,
            };

            if !err.is_retryable() {
                return Err(err);
            }
            if attempts >= max_attempts {
                return Err(NotifyError::RetryExhausted {
                    attempts,
                    message: err.to_string(),
                });
            }

            let delay_ms = match &err {
                NotifyError::RateLimited { retry_after_ms } => *retry_after_ms,
                _ => self.config.retry_delay_ms * 2u64.pow(attempts - 1),
            };
            warn!(attempt = attempts, delay_ms, error = %err, "Webhook send failed, retrying");
            sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    async fn send_once(
        &self,
        webhook_url: &str,
        message: &WebhookMessage,
    ) -> Result<(), NotifyError> {
        let response = self.client.post(webhook_url).json(message).send().await?;
        let status = response.status();

        if status.as_u16() == 429 {
            let body: Option<RateLimitResponse> = response.json().await.ok();
            let retry_after_ms = body
                .and_then(|b| b.retry_after)
                .map(|secs| (secs * 1000.0) as u64)
                .unwrap_or(DEFAULT_RATE_LIMIT_WAIT_MS);
            return Err(NotifyError::RateLimited { retry_after_ms });
        }

        // 204 No Content is the normal response
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Webhook {
            status: status.as_u16(),
            message: body,
        })
    }
}

#[async_trait]
impl Notifier for DiscordWebhookNotifier {
    async fn send(&self, item: &FeedItem, destination: &Destination) -> Result<(), NotifyError> {
        debug!(video_id = %item.video_id, "Announcing video over Discord");
        let message = WebhookMessage::announcement(item, destination);
        self.send_message(&destination.webhook_url, &message).await?;
        info!(video_id = %item.video_id, "Announced video");
        Ok(())
    }
}
