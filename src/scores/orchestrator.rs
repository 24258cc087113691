//! Score orchestration: cache-aside reads, durable writes, best-effort
//! notification and cache refresh.
//!
//! The durable store is the only source of truth. The cache may be empty,
//! stale or unreachable and the event channel may drop everything; neither
//! changes what a caller gets back, only how fast.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::effort::{best_effort, best_effort_value, durable, EffortOutcome};
use super::side::{cache_key, is_closed, validate_start_payload, Points, Side};
use super::store::ScoreStore;
use crate::cache::ScoreCache;
use crate::error::{ScoreError, ScoreResult};
use crate::events::{EventChannel, ScoreNotification, LAST_EVENT_KEY};

/// Upper bounds for each collaborator call.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorTimeouts {
    pub store: Duration,
    pub cache: Duration,
    pub events: Duration,
}

impl Default for OrchestratorTimeouts {
    fn default() -> Self {
        OrchestratorTimeouts {
            store: Duration::from_secs(5),
            cache: Duration::from_secs(2),
            events: Duration::from_secs(1),
        }
    }
}

/// Result of a successful `score` call.
#[derive(Debug, Clone)]
pub struct ScoreUpdate {
    /// Authoritative document returned by the durable patch
    pub record: Value,
    pub published: EffortOutcome,
    pub cached: EffortOutcome,
}

/// Stateless coordinator over the store, the cache and the event channel.
#[derive(Clone)]
pub struct ScoreOrchestrator {
    store: Arc<dyn ScoreStore>,
    cache: Arc<dyn ScoreCache>,
    events: Arc<dyn EventChannel>,
    timeouts: OrchestratorTimeouts,
}

impl ScoreOrchestrator {
    pub fn new(
        store: Arc<dyn ScoreStore>,
        cache: Arc<dyn ScoreCache>,
        events: Arc<dyn EventChannel>,
        timeouts: OrchestratorTimeouts,
    ) -> Self {
        ScoreOrchestrator {
            store,
            cache,
            events,
            timeouts,
        }
    }

    /// Create a score and seed the cache with the caller's payload.
    ///
    /// Returns the store's document unmodified. There is no idempotency key:
    /// a durable failure may or may not have created the record.
    pub async fn start(&self, payload: &Value) -> ScoreResult<Value> {
        validate_start_payload(payload)?;

        let created = durable("store.start", self.timeouts.store, self.store.start(payload)).await?;

        match document_id(&created) {
            Some(id) => {
                info!("Score started: {}", id);
                self.cache_put(&id, payload).await;
            }
            None => warn!("Store returned no id for new score, cache not seeded"),
        }
        Ok(created)
    }

    /// Add one point to `side` of score `id`.
    ///
    /// The new totals are computed from whatever base was read and sent to the
    /// store as absolute values. Concurrent calls for the same id can
    /// therefore overwrite each other.
    pub async fn score(&self, id: &str, side: &str) -> ScoreResult<ScoreUpdate> {
        let side: Side = side.parse()?;

        let current = self
            .load(id)
            .await?
            .ok_or_else(|| ScoreError::NotFound(id.to_string()))?;
        if is_closed(&current) {
            warn!("Scoring closed match {}", id);
        }

        let points = Points::from_document(&current).increment(side);
        let record = durable(
            "store.patch",
            self.timeouts.store,
            self.store.patch(id, &points.to_patch()),
        )
        .await?
        .ok_or_else(|| ScoreError::NotFound(id.to_string()))?;
        info!("Score {}: {} {}-{}", id, side, points.home, points.away);

        let event = ScoreNotification::new(id, side, points);
        let published = best_effort(
            "events.publish",
            self.timeouts.events,
            self.events.publish(&event),
        )
        .await;
        let cached = self.cache_put(id, &record).await;
        if cached != EffortOutcome::Applied {
            // A stale entry would become the base of the next score.
            best_effort(
                "cache.delete(stale)",
                self.timeouts.cache,
                self.cache.delete(&cache_key(id)),
            )
            .await;
        }

        Ok(ScoreUpdate {
            record,
            published,
            cached,
        })
    }

    /// Cache first, then the store. `Ok(None)` means neither knows the id.
    pub async fn read(&self, id: &str) -> ScoreResult<Option<Value>> {
        self.load(id).await
    }

    /// Close the score durably, then evict it from the cache.
    ///
    /// If the durable close fails or the id is unknown the cache is left
    /// alone.
    pub async fn close(&self, id: &str) -> ScoreResult<()> {
        let found = durable("store.close", self.timeouts.store, self.store.close(id)).await?;
        if !found {
            return Err(ScoreError::NotFound(id.to_string()));
        }
        info!("Score closed: {}", id);

        best_effort(
            "cache.delete",
            self.timeouts.cache,
            self.cache.delete(&cache_key(id)),
        )
        .await;
        Ok(())
    }

    /// Most recent notification recorded by the event consumer, if any.
    pub async fn last_event(&self) -> Option<ScoreNotification> {
        let raw = best_effort_value(
            "cache.get(last event)",
            self.timeouts.cache,
            self.cache.get(LAST_EVENT_KEY),
        )
        .await?;
        match serde_json::from_slice(&raw) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("Discarding unreadable last event: {}", e);
                None
            }
        }
    }

    async fn load(&self, id: &str) -> ScoreResult<Option<Value>> {
        let key = cache_key(id);
        let cached = best_effort_value("cache.get", self.timeouts.cache, self.cache.get(&key)).await;
        if let Some(raw) = cached {
            match serde_json::from_slice::<Value>(&raw) {
                Ok(doc) => {
                    debug!("Cache hit for {}", key);
                    return Ok(Some(doc));
                }
                Err(e) => warn!("Ignoring unreadable cache entry {}: {}", key, e),
            }
        }
        durable("store.read", self.timeouts.store, self.store.read(id)).await
    }

    async fn cache_put(&self, id: &str, doc: &Value) -> EffortOutcome {
        let bytes = match serde_json::to_vec(doc) {
            Ok(b) => b,
            Err(e) => {
                warn!("Could not serialize score {} for cache: {}", id, e);
                return EffortOutcome::Failed(e.to_string());
            }
        };
        best_effort("cache.set", self.timeouts.cache, self.cache.set(&cache_key(id), bytes)).await
    }
}

/// The id a store handed back, whether it came as a string or a number.
fn document_id(doc: &Value) -> Option<String> {
    match doc.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
