use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::ScoreError;

const HOME_KEY: &str = "home";
const AWAY_KEY: &str = "away";
const POINTS_KEY: &str = "points";

/// Which team scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Home => HOME_KEY,
            Side::Away => AWAY_KEY,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(HOME_KEY) {
            Ok(Side::Home)
        } else if trimmed.eq_ignore_ascii_case(AWAY_KEY) {
            Ok(Side::Away)
        } else {
            Err(ScoreError::Validation(format!(
                "invalid side '{}', expected 'home' or 'away'",
                trimmed
            )))
        }
    }
}

/// The two point counters the orchestrator understands inside an otherwise
/// opaque score document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Points {
    pub home: u64,
    pub away: u64,
}

impl Points {
    /// Read `home.points` / `away.points`. Missing, negative or non-numeric
    /// values read as 0.
    pub fn from_document(doc: &Value) -> Self {
        Points {
            home: read_points(doc, HOME_KEY),
            away: read_points(doc, AWAY_KEY),
        }
    }

    /// Add exactly one point to `side`, leaving the other untouched.
    pub fn increment(self, side: Side) -> Self {
        match side {
            Side::Home => Points {
                home: self.home.saturating_add(1),
                ..self
            },
            Side::Away => Points {
                away: self.away.saturating_add(1),
                ..self
            },
        }
    }

    /// Absolute totals in document shape, ready to be merged by the store.
    pub fn to_patch(self) -> Value {
        json!({
            HOME_KEY: { POINTS_KEY: self.home },
            AWAY_KEY: { POINTS_KEY: self.away },
        })
    }
}

fn read_points(doc: &Value, team: &str) -> u64 {
    doc.get(team)
        .and_then(|t| t.get(POINTS_KEY))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// A start payload is opaque, but it has to be a non-empty JSON object so
/// later patches have something to merge into.
pub fn validate_start_payload(payload: &Value) -> Result<(), ScoreError> {
    match payload {
        Value::Object(map) if !map.is_empty() => Ok(()),
        Value::Object(_) => Err(ScoreError::Validation(
            "start payload must not be empty".into(),
        )),
        _ => Err(ScoreError::Validation(
            "start payload must be a JSON object".into(),
        )),
    }
}

/// Cache key for a score document.
pub fn cache_key(id: &str) -> String {
    format!("score:{}", id)
}

/// True when a document carries the durable `closed` marker.
pub fn is_closed(doc: &Value) -> bool {
    doc.get("status").and_then(Value::as_str) == Some("closed")
}
