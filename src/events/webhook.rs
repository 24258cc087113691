use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{EventChannel, ScoreNotification};

/// Publishes score notifications as JSON `POST`s to a fixed URL.
///
/// The underlying `reqwest` client pools connections; each publish is still
/// an independent request with its own timeout.
#[derive(Clone)]
pub struct WebhookChannel {
    http: Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(WebhookChannel {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl EventChannel for WebhookChannel {
    async fn publish(&self, event: &ScoreNotification) -> Result<()> {
        debug!("Publishing score event for {} to {}", event.id, self.url);
        let resp = self
            .http
            .post(&self.url)
            .json(event)
            .send()
            .await
            .context("Event webhook request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Event webhook returned {}", resp.status());
        }
        Ok(())
    }
}
