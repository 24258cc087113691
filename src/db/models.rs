use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a score. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreStatus {
    Open,
    Closed,
}

impl ScoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreStatus::Open => "open",
            ScoreStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for ScoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ScoreStatus::Open),
            "closed" => Ok(ScoreStatus::Closed),
            other => anyhow::bail!("unknown score status '{}'", other),
        }
    }
}

/// A row of the `scores` table.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreRecord {
    /// Opaque token handed out by `start`
    pub id: String,
    /// Caller-supplied document, merged on every patch
    pub data: Value,
    pub status: ScoreStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl ScoreRecord {
    /// The document callers see: stored data with `id` and `status` on top.
    pub fn to_document(&self) -> Value {
        let mut doc = self.data.clone();
        if let Value::Object(map) = &mut doc {
            map.insert("id".into(), Value::String(self.id.clone()));
            map.insert("status".into(), Value::String(self.status.to_string()));
        }
        doc
    }
}
