pub mod memory;

pub use memory::MemoryCache;

use anyhow::Result;
use async_trait::async_trait;
use clap::ValueEnum;
use tracing::debug;

/// Derivative key→bytes store in front of the durable score store.
///
/// Any call may fail or hang; callers treat every failure as a miss or a
/// skipped write.
#[async_trait]
pub trait ScoreCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Which cache backend the service runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackend {
    Memory,
    None,
}

/// Cache that never holds anything. Every read misses.
#[derive(Debug, Clone, Default)]
pub struct NoopCache;

#[async_trait]
impl ScoreCache for NoopCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        debug!("NoopCache: miss for {}", key);
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}
