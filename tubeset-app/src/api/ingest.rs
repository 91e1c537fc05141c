//! Ingestion API handlers
//!
//! POST /api/validate-url, POST /api/ingest, GET /api/ingest/status

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::pipeline::{IngestProgress, IngestReport};
use crate::services::PlaylistUrl;
use crate::AppState;

/// Lifecycle of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Completed,
    Failed,
}

/// Bookkeeping for the current or most recent run
#[derive(Debug, Clone, Serialize)]
pub struct IngestRun {
    pub run_id: Uuid,
    pub url: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub report: Option<IngestReport>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateUrlResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartIngestResponse {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
}

/// GET /api/ingest/status response
#[derive(Debug, Serialize)]
pub struct IngestStatusResponse {
    /// "idle" until the first run starts
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<IngestRun>,
    pub progress: IngestProgress,
}

/// POST /api/validate-url
pub async fn validate_url(Json(request): Json<UrlRequest>) -> Json<ValidateUrlResponse> {
    let response = match PlaylistUrl::parse(request.url.trim()) {
        Ok(url) => ValidateUrlResponse {
            valid: true,
            list_id: Some(url.list_id().to_string()),
            message: None,
        },
        Err(e) => ValidateUrlResponse {
            valid: false,
            list_id: None,
            message: Some(e.to_string()),
        },
    };
    Json(response)
}

/// POST /api/ingest
///
/// Starts a background run and returns 202. Refused with 409 while any
/// store operation (including another run) holds the store lock.
pub async fn start_ingest(
    State(state): State<AppState>,
    Json(request): Json<UrlRequest>,
) -> ApiResult<(StatusCode, Json<StartIngestResponse>)> {
    let url = PlaylistUrl::parse(request.url.trim())?;

    let guard = state
        .store_lock
        .clone()
        .try_lock_owned()
        .map_err(|_| ApiError::Conflict("An ingestion or other store operation is already running".to_string()))?;

    let run = IngestRun {
        run_id: Uuid::new_v4(),
        url: url.to_string(),
        state: RunState::Running,
        started_at: Utc::now(),
        finished_at: None,
        report: None,
        error: None,
    };
    let response = StartIngestResponse {
        run_id: run.run_id,
        started_at: run.started_at,
    };
    *state.ingest_run.write().await = Some(run);
    state.ingest_progress.send_replace(IngestProgress::default());

    tracing::info!(run_id = %response.run_id, list_id = url.list_id(), "Ingestion started");

    let task_state = state.clone();
    let run_id = response.run_id;
    tokio::spawn(async move {
        let result = task_state
            .pipeline
            .run(&url, &task_state.archive, &task_state.ingest_progress)
            .await;
        drop(guard);

        let mut current = task_state.ingest_run.write().await;
        let Some(run) = current.as_mut().filter(|run| run.run_id == run_id) else {
            return;
        };
        run.finished_at = Some(Utc::now());

        match result {
            Ok(report) => {
                tracing::info!(run_id = %run_id, records = report.records_written, "Ingestion finished");
                run.state = RunState::Completed;
                run.report = Some(report);
            }
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "Ingestion failed");
                run.state = RunState::Failed;
                run.error = Some(e.to_string());
                drop(current);
                task_state.record_error(format!("Ingestion failed: {}", e)).await;
            }
        }
    });

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /api/ingest/status
pub async fn ingest_status(State(state): State<AppState>) -> Json<IngestStatusResponse> {
    let run = state.ingest_run.read().await.clone();
    let progress = state.ingest_progress.borrow().clone();

    let label = match run.as_ref().map(|r| r.state) {
        None => "idle",
        Some(RunState::Running) => "running",
        Some(RunState::Completed) => "completed",
        Some(RunState::Failed) => "failed",
    };

    Json(IngestStatusResponse {
        state: label.to_string(),
        run,
        progress,
    })
}

pub fn ingest_routes() -> Router<AppState> {
    Router::new()
        .route("/api/validate-url", post(validate_url))
        .route("/api/ingest", post(start_ingest))
        .route("/api/ingest/status", get(ingest_status))
}
