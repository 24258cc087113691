//! In-process event queue.
//!
//! `QueueChannel::publish` never waits: a full or closed queue is reported as
//! a publish failure and the event is dropped. The consumer task drains the
//! queue and keeps the most recent event in the cache under
//! [`LAST_EVENT_KEY`].

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{EventChannel, ScoreNotification};
use crate::cache::ScoreCache;
use crate::scores::best_effort;

/// Cache key holding the most recently consumed score event.
pub const LAST_EVENT_KEY: &str = "score_events:last";

#[derive(Clone)]
pub struct QueueChannel {
    tx: mpsc::Sender<ScoreNotification>,
}

impl QueueChannel {
    /// Build a bounded queue and hand back its receiving end.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ScoreNotification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (QueueChannel { tx }, rx)
    }
}

#[async_trait]
impl EventChannel for QueueChannel {
    async fn publish(&self, event: &ScoreNotification) -> Result<()> {
        self.tx
            .try_send(event.clone())
            .map_err(|e| anyhow!("event queue rejected event for {}: {}", event.id, e))
    }
}

/// Spawn the consumer loop. It ends when every sender has been dropped.
pub fn start_event_consumer(
    mut rx: mpsc::Receiver<ScoreNotification>,
    cache: Arc<dyn ScoreCache>,
    cache_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Score event consumer started");
        while let Some(event) = rx.recv().await {
            info!(
                "Score event: {} {} scored ({}-{})",
                event.id, event.side, event.home_points, event.away_points
            );
            let bytes = match serde_json::to_vec(&event) {
                Ok(b) => b,
                Err(e) => {
                    warn!("Failed to serialize score event {}: {}", event.id, e);
                    continue;
                }
            };
            best_effort(
                "cache.set(last event)",
                cache_timeout,
                cache.set(LAST_EVENT_KEY, bytes),
            )
            .await;
        }
        info!("Score event consumer stopped");
    })
}
