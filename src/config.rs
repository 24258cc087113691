use clap::Parser;
use std::time::Duration;

use crate::cache::CacheBackend;
use crate::events::EventSink;
use crate::scores::OrchestratorTimeouts;

/// Live match score service
#[derive(Parser, Debug, Clone)]
#[command(name = "scoreboard", version, about)]
pub struct Config {
    /// HTTP listen address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8080")]
    pub api_addr: String,

    /// SQLite database path (":memory:" for a throwaway database)
    #[arg(long, env = "DATABASE_PATH", default_value = "scoreboard.db")]
    pub database_path: String,

    /// Score cache backend
    #[arg(long, env = "CACHE_BACKEND", value_enum, default_value = "memory")]
    pub cache_backend: CacheBackend,

    /// Cache entry time-to-live in seconds (0 = keep until evicted)
    #[arg(long, env = "CACHE_TTL_SECS", default_value = "3600")]
    pub cache_ttl_secs: u64,

    /// Upper bound for any single cache call, in milliseconds
    #[arg(long, env = "CACHE_TIMEOUT_MS", default_value = "2000")]
    pub cache_timeout_ms: u64,

    /// Upper bound for any single durable store call, in milliseconds
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value = "5000")]
    pub store_timeout_ms: u64,

    /// Where score events are published
    #[arg(long, env = "EVENT_SINK", value_enum, default_value = "queue")]
    pub event_sink: EventSink,

    /// Target URL for the webhook event sink
    #[arg(long, env = "EVENT_WEBHOOK_URL")]
    pub event_webhook_url: Option<String>,

    /// Upper bound for a single event publish, in milliseconds
    #[arg(long, env = "EVENT_TIMEOUT_MS", default_value = "1000")]
    pub event_timeout_ms: u64,

    /// Capacity of the in-process event queue
    #[arg(long, env = "EVENT_QUEUE_CAPACITY", default_value = "1024")]
    pub event_queue_capacity: usize,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cache_timeout_ms == 0 {
            anyhow::bail!("cache_timeout_ms must be positive");
        }
        if self.store_timeout_ms == 0 {
            anyhow::bail!("store_timeout_ms must be positive");
        }
        if self.event_timeout_ms == 0 {
            anyhow::bail!("event_timeout_ms must be positive");
        }
        if self.event_queue_capacity == 0 {
            anyhow::bail!("event_queue_capacity must be positive");
        }
        if self.event_sink == EventSink::Webhook {
            let Some(raw) = self.event_webhook_url.as_deref() else {
                anyhow::bail!("EVENT_WEBHOOK_URL is required when EVENT_SINK=webhook");
            };
            let url = url::Url::parse(raw)
                .map_err(|e| anyhow::anyhow!("invalid EVENT_WEBHOOK_URL '{}': {}", raw, e))?;
            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!("EVENT_WEBHOOK_URL must be http or https");
            }
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    pub fn timeouts(&self) -> OrchestratorTimeouts {
        OrchestratorTimeouts {
            store: Duration::from_millis(self.store_timeout_ms),
            cache: Duration::from_millis(self.cache_timeout_ms),
            events: Duration::from_millis(self.event_timeout_ms),
        }
    }
}
