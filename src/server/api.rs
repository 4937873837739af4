//! Request handlers. Each returns JSON; failures use the `{"status": "error", "message": ...}` body.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::batch::{BatchReport, OutputError, OutputWriter};
use crate::data::LoadReport;
use crate::engine::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchState {
    pub status: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<BatchReport>,
}

impl Default for BatchState {
    fn default() -> Self {
        BatchState {
            status: BatchStatus::Idle,
            started_at: None,
            finished_at: None,
            message: None,
            report: None,
        }
    }
}

/// Shared handler state. Output reads go through their own writer handle so they never wait on
/// the engine lock held by a running batch.
#[derive(Debug, Clone)]
pub struct AppState {
    engine: Arc<Mutex<Engine>>,
    output: OutputWriter,
    batch: Arc<Mutex<BatchState>>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        let output = engine.output().clone();
        AppState {
            engine: Arc::new(Mutex::new(engine)),
            output,
            batch: Arc::new(Mutex::new(BatchState::default())),
        }
    }

    pub fn batch_state(&self) -> BatchState {
        lock(&self.batch).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "status": "error",
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

impl From<OutputError> for ApiError {
    fn from(err: OutputError) -> Self {
        let status = match err {
            OutputError::InvalidName(_) => StatusCode::BAD_REQUEST,
            OutputError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.to_string())
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "pdq-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn reload(State(state): State<AppState>) -> Result<Json<LoadReport>, ApiError> {
    let engine = Arc::clone(&state.engine);
    let result = tokio::task::spawn_blocking(move || lock(&engine).reload())
        .await
        .map_err(|err| ApiError::internal(format!("reload task failed: {err}")))?;

    match result {
        Ok(report) => Ok(Json(report)),
        Err(err) => {
            tracing::error!(error = %err, "reload failed; keeping previous dataset");
            Err(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()))
        }
    }
}

pub async fn start_batch(State(state): State<AppState>) -> Result<(StatusCode, Json<BatchState>), ApiError> {
    let snapshot = {
        let mut batch = lock(&state.batch);
        if batch.status == BatchStatus::Running {
            return Err(ApiError::new(
                StatusCode::CONFLICT,
                "a batch calculation is already running",
            ));
        }
        *batch = BatchState {
            status: BatchStatus::Running,
            started_at: Some(chrono::Utc::now().to_rfc3339()),
            ..BatchState::default()
        };
        batch.clone()
    };

    let engine = Arc::clone(&state.engine);
    let batch = Arc::clone(&state.batch);
    tokio::spawn(async move {
        let outcome = tokio::task::spawn_blocking(move || lock(&engine).run_batch()).await;
        let mut state = lock(&batch);
        state.finished_at = Some(chrono::Utc::now().to_rfc3339());
        match outcome {
            Ok(report) => {
                state.status = BatchStatus::Completed;
                state.report = Some(report);
            }
            Err(err) => {
                tracing::error!(error = %err, "batch task failed");
                state.status = BatchStatus::Failed;
                state.message = Some(err.to_string());
            }
        }
    });

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

pub async fn batch_status(State(state): State<AppState>) -> Json<BatchState> {
    Json(state.batch_state())
}

pub async fn output_files(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let files = state.output.list()?;
    Ok(Json(json!({ "files": files })))
}

pub async fn output_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let data = state.output.read(&filename)?;
    Ok(Json(json!({ "filename": filename, "data": data })))
}
