use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// The durable system of record for scores.
///
/// Every call is one transaction on the implementation side. Any error is
/// treated as fatal by the caller.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Persist a new score and return a document holding its assigned `id`.
    async fn start(&self, payload: &Value) -> Result<Value>;

    /// Current document for `id`, or `None` if the id was never started.
    async fn read(&self, id: &str) -> Result<Option<Value>>;

    /// Merge `delta` into the stored document and return the result, or
    /// `None` if the id does not exist.
    async fn patch(&self, id: &str, delta: &Value) -> Result<Option<Value>>;

    /// Mark the score closed. Returns `false` if the id does not exist.
    async fn close(&self, id: &str) -> Result<bool>;
}
