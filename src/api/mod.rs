use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error};

use crate::db::models::ScoreStatus;
use crate::db::Database;
use crate::error::ScoreError;
use crate::scores::ScoreOrchestrator;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 500;

#[derive(Clone)]
pub struct AppState {
    pub scores: ScoreOrchestrator,
    pub db: Database,
}

/// Build the Axum router for the score API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/scores", post(start_handler).get(list_handler))
        .route(
            "/scores/:id",
            post(score_handler).get(read_handler).delete(close_handler),
        )
        .route("/events/last", get(last_event_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// JSON error body plus status code.
pub struct ApiError(StatusCode, String);

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError(StatusCode::BAD_REQUEST, message.into())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<ScoreError> for ApiError {
    fn from(err: ScoreError) -> Self {
        let status = match &err {
            ScoreError::Validation(_) => StatusCode::BAD_REQUEST,
            ScoreError::NotFound(_) => StatusCode::NOT_FOUND,
            ScoreError::Durable { .. } => {
                error!("Durable store failure: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

/// GET /health
async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// POST /scores
async fn start_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload = parse_body(&body)?.ok_or_else(|| ApiError::bad_request("request body is required"))?;
    let created = state.scores.start(&payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
struct SideQuery {
    side: Option<String>,
}

/// POST /scores/:id?side=home|away, or with body `{"side": "..."}`
async fn score_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<SideQuery>, QueryRejection>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let side = match query.side.filter(|s| !s.trim().is_empty()) {
        Some(side) => side,
        None => parse_body(&body)?
            .as_ref()
            .and_then(|b| b.get("side"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("'side' is required (home or away)"))?,
    };
    let update = state.scores.score(&id, &side).await?;
    debug!(
        "Score {} side effects: publish={:?} cache={:?}",
        id, update.published, update.cached
    );
    Ok(Json(update.record))
}

/// GET /scores/:id
async fn read_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .scores
        .read(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::from(ScoreError::NotFound(id)))
}

/// DELETE /scores/:id
async fn close_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.scores.close(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<ScoreStatus>,
    limit: Option<i64>,
}

/// GET /scores?status=open|closed&limit=50
async fn list_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    let db = state.db.clone();
    let records = tokio::task::spawn_blocking(move || db.list_scores(query.status, limit))
        .await
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(records))
}

/// GET /events/last
async fn last_event_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .scores
        .last_event()
        .await
        .map(Json)
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, "no score events yet".into()))
}

/// Empty (or whitespace-only) bodies are `None`; anything else must be JSON.
fn parse_body(body: &Bytes) -> Result<Option<Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ApiError::bad_request(format!("invalid JSON body: {}", e)))
}
