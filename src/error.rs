use thiserror::Error;

/// Errors that cross the orchestrator boundary.
///
/// Cache and event-channel failures never show up here; they are contained
/// and reported through [`crate::scores::effort::EffortOutcome`] instead.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// Bad or missing input, rejected before any I/O.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The id is unknown to both the cache and the durable store.
    #[error("score not found: {0}")]
    NotFound(String),

    /// The durable store was unreachable, timed out, or rejected the call.
    #[error("{operation} failed: {message}")]
    Durable { operation: &'static str, message: String },
}

impl ScoreError {
    pub fn durable(operation: &'static str, err: impl std::fmt::Display) -> Self {
        ScoreError::Durable {
            operation,
            message: err.to_string(),
        }
    }
}

pub type ScoreResult<T> = Result<T, ScoreError>;
