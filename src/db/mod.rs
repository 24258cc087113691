use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, types::Type, Connection, OptionalExtension};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::*;

use crate::scores::ScoreStore;

/// Thread-safe SQLite handle (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path.
    /// `":memory:"` gives a private in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    // ── Scores ────────────────────────────────────────────────────────────────

    /// Insert a new open score and return `{"id": ...}`.
    pub fn start_score(&self, payload: &Value) -> Result<Value> {
        let id = new_score_id();
        let now = Utc::now();
        let data = serde_json::to_string(payload)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO scores (id, data, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, data, ScoreStatus::Open.as_str(), now],
        )?;
        tx.commit()?;
        Ok(json!({ "id": id }))
    }

    /// Fetch one score row.
    pub fn get_score(&self, id: &str) -> Result<Option<ScoreRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT id, data, status, created_at, updated_at, closed_at
                 FROM scores WHERE id = ?1",
                params![id],
                map_score,
            )
            .optional()?;
        Ok(record)
    }

    /// Deep-merge `delta` into the stored document.
    ///
    /// The new totals are whatever the caller sends; two writers that read the
    /// same base will overwrite each other rather than add up.
    pub fn patch_score(&self, id: &str, delta: &Value) -> Result<Option<ScoreRecord>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let current = tx
            .query_row(
                "SELECT id, data, status, created_at, updated_at, closed_at
                 FROM scores WHERE id = ?1",
                params![id],
                map_score,
            )
            .optional()?;
        let Some(mut record) = current else {
            return Ok(None);
        };

        merge_json(&mut record.data, delta);
        record.updated_at = Utc::now();
        tx.execute(
            "UPDATE scores SET data = ?1, updated_at = ?2 WHERE id = ?3",
            params![serde_json::to_string(&record.data)?, record.updated_at, id],
        )?;
        tx.commit()?;
        Ok(Some(record))
    }

    /// Mark a score closed. Closing twice keeps the first `closed_at`.
    pub fn close_score(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let exists: bool = tx
            .query_row("SELECT 1 FROM scores WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?
            .is_some();
        if exists {
            tx.execute(
                "UPDATE scores SET status = ?1, closed_at = COALESCE(closed_at, ?2), updated_at = ?2
                 WHERE id = ?3",
                params![ScoreStatus::Closed.as_str(), Utc::now(), id],
            )?;
        }
        tx.commit()?;
        Ok(exists)
    }

    /// List scores, newest first, optionally filtered by status.
    pub fn list_scores(&self, status: Option<ScoreStatus>, limit: i64) -> Result<Vec<ScoreRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, data, status, created_at, updated_at, closed_at
             FROM scores
             WHERE ?1 IS NULL OR status = ?1
             ORDER BY created_at DESC LIMIT ?2",
        )?;
        let scores = stmt
            .query_map(params![status.map(|s| s.as_str()), limit], map_score)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(scores)
    }
}

#[async_trait]
impl ScoreStore for Database {
    async fn start(&self, payload: &Value) -> Result<Value> {
        let db = self.clone();
        let payload = payload.clone();
        tokio::task::spawn_blocking(move || db.start_score(&payload))
            .await
            .context("store task failed")?
    }

    async fn read(&self, id: &str) -> Result<Option<Value>> {
        let db = self.clone();
        let id = id.to_string();
        let record = tokio::task::spawn_blocking(move || db.get_score(&id))
            .await
            .context("store task failed")??;
        Ok(record.map(|r| r.to_document()))
    }

    async fn patch(&self, id: &str, delta: &Value) -> Result<Option<Value>> {
        let db = self.clone();
        let id = id.to_string();
        let delta = delta.clone();
        let record = tokio::task::spawn_blocking(move || db.patch_score(&id, &delta))
            .await
            .context("store task failed")??;
        Ok(record.map(|r| r.to_document()))
    }

    async fn close(&self, id: &str) -> Result<bool> {
        let db = self.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || db.close_score(&id))
            .await
            .context("store task failed")?
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_score(row: &rusqlite::Row) -> rusqlite::Result<ScoreRecord> {
    let data: String = row.get(1)?;
    let status: String = row.get(2)?;
    Ok(ScoreRecord {
        id: row.get(0)?,
        data: serde_json::from_str(&data)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?,
        status: status
            .parse()
            .map_err(|e: anyhow::Error| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        closed_at: row.get(5)?,
    })
}

/// 128 random bits, hex encoded.
fn new_score_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Recursive merge: objects merge key by key, anything else replaces.
fn merge_json(target: &mut Value, delta: &Value) {
    match (target, delta) {
        (Value::Object(target), Value::Object(delta)) => {
            for (key, value) in delta {
                match target.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, delta) => *target = delta.clone(),
    }
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS scores (
    id          TEXT    PRIMARY KEY,
    data        TEXT    NOT NULL,
    status      TEXT    NOT NULL DEFAULT 'open',
    created_at  TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL,
    closed_at   TEXT
);

CREATE INDEX IF NOT EXISTS idx_scores_status ON scores(status);
"#;
