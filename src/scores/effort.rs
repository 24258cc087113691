//! Two kinds of collaborator calls.
//!
//! A *durable* call establishes authoritative state: an error or a timeout
//! fails the whole operation. A *best-effort* call (cache, event channel) is
//! bounded by the same kind of timeout but its failure is logged and
//! reported as an [`EffortOutcome`], never propagated.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::ScoreError;

/// What happened to a best-effort side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffortOutcome {
    Applied,
    Failed(String),
    TimedOut,
}

/// Run a call against the durable store. Errors and timeouts both become
/// [`ScoreError::Durable`].
pub async fn durable<T, E, F>(
    operation: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, ScoreError>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ScoreError::durable(operation, e)),
        Err(_) => Err(ScoreError::durable(
            operation,
            format!("timed out after {:?}", timeout),
        )),
    }
}

/// Run a side effect whose failure must not reach the caller.
pub async fn best_effort<E, F>(operation: &str, timeout: Duration, fut: F) -> EffortOutcome
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(())) => EffortOutcome::Applied,
        Ok(Err(e)) => {
            warn!("{} failed (ignored): {}", operation, e);
            EffortOutcome::Failed(e.to_string())
        }
        Err(_) => {
            warn!("{} timed out after {:?} (ignored)", operation, timeout);
            EffortOutcome::TimedOut
        }
    }
}

/// Best-effort read: any failure collapses into `None`, same as a miss.
pub async fn best_effort_value<T, E, F>(operation: &str, timeout: Duration, fut: F) -> Option<T>
where
    F: Future<Output = Result<Option<T>, E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            warn!("{} failed, falling back: {}", operation, e);
            None
        }
        Err(_) => {
            warn!("{} timed out after {:?}, falling back", operation, timeout);
            None
        }
    }
}
