use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod api;
mod cache;
mod config;
mod db;
mod error;
mod events;
mod scores;

use api::AppState;
use cache::{CacheBackend, MemoryCache, NoopCache, ScoreCache};
use config::Config;
use db::Database;
use events::{start_event_consumer, EventChannel, EventSink, NoopChannel, QueueChannel, WebhookChannel};
use scores::ScoreOrchestrator;

/// How often the in-memory cache drops expired entries.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.log_json);
    config.validate()?;

    // Open database
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    let timeouts = config.timeouts();

    let cache: Arc<dyn ScoreCache> = match config.cache_backend {
        CacheBackend::Memory => {
            let cache = MemoryCache::new(config.cache_ttl());
            if config.cache_ttl().is_some() {
                cache.spawn_sweeper(CACHE_SWEEP_INTERVAL);
            }
            info!("Score cache: in-memory (ttl={:?})", config.cache_ttl());
            Arc::new(cache)
        }
        CacheBackend::None => {
            info!("Score cache disabled, every read goes to the database");
            Arc::new(NoopCache)
        }
    };

    let events: Arc<dyn EventChannel> = match config.event_sink {
        EventSink::Queue => {
            let (channel, rx) = QueueChannel::new(config.event_queue_capacity);
            start_event_consumer(rx, cache.clone(), timeouts.cache);
            info!("Score events: in-process queue (capacity {})", config.event_queue_capacity);
            Arc::new(channel)
        }
        EventSink::Webhook => {
            let url = config.event_webhook_url.as_deref().unwrap_or_default();
            info!("Score events: webhook {}", url);
            Arc::new(WebhookChannel::new(url, timeouts.events)?)
        }
        EventSink::None => {
            info!("Score events disabled");
            Arc::new(NoopChannel)
        }
    };

    let scores = ScoreOrchestrator::new(Arc::new(db.clone()), cache, events, timeouts);

    let app = api::router(AppState { scores, db });
    let addr: SocketAddr = config.api_addr.parse()?;
    info!("Score API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Score API stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
