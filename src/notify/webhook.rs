//! Webhook delivery for notifications

use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tracing::warn;

use crate::notify::NotifyError;
use crate::notify::composer::Message;

/// Trait for delivering composed messages
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one message; failures are not retried by callers
    async fn send(&self, message: &Message) -> Result<(), NotifyError>;
}

/// Notifier that POSTs messages as JSON to a webhook URL
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Creates a notifier whose deliveries give up after `timeout`
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .user_agent("chart-version-monitor")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &Message) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(message).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Webhook returned status {}: {}", status, self.url);
            return Err(NotifyError::Status(status.as_u16()));
        }

        Ok(())
    }
}
