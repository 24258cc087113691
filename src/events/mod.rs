pub mod queue;
pub mod webhook;

pub use queue::{start_event_consumer, QueueChannel, LAST_EVENT_KEY};
pub use webhook::WebhookChannel;

use anyhow::Result;
use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scores::{Points, Side};

/// Notification emitted after a durable score change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreNotification {
    pub id: String,
    pub side: Side,
    pub home_points: u64,
    pub away_points: u64,
}

impl ScoreNotification {
    pub fn new(id: &str, side: Side, points: Points) -> Self {
        ScoreNotification {
            id: id.to_string(),
            side,
            home_points: points.home,
            away_points: points.away,
        }
    }
}

/// Fire-and-forget, at-most-once event publication.
#[async_trait]
pub trait EventChannel: Send + Sync {
    async fn publish(&self, event: &ScoreNotification) -> Result<()>;
}

/// Where score notifications go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EventSink {
    Queue,
    Webhook,
    None,
}

/// Discards every notification.
#[derive(Debug, Clone, Default)]
pub struct NoopChannel;

#[async_trait]
impl EventChannel for NoopChannel {
    async fn publish(&self, event: &ScoreNotification) -> Result<()> {
        debug!("Event sink disabled, dropping event for {}", event.id);
        Ok(())
    }
}
