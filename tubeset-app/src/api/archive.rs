//! Download, delete and restore handlers
//!
//! GET /api/download, POST /api/delete, POST /api/restore, GET /api/archive/status

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tubeset_common::ArchiveStatus;

use crate::error::{ApiError, ApiResult};
use crate::{bytes_to_mb, AppState};

/// File name offered for store downloads
pub const DOWNLOAD_FILE_NAME: &str = "database_backup.zip";

#[derive(Debug, Serialize)]
pub struct ArchiveStatusResponse {
    #[serde(flatten)]
    pub status: ArchiveStatus,
    pub size_mb: f64,
    pub download_limit_mb: u64,
}

async fn current_status(state: &AppState) -> ApiResult<ArchiveStatusResponse> {
    let archive = state.archive.clone();
    let (status, bytes) = tokio::task::spawn_blocking(move || {
        (archive.status(), archive.store().disk_usage_bytes())
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(ArchiveStatusResponse {
        status,
        size_mb: bytes_to_mb(bytes),
        download_limit_mb: state.settings.max_download_mb,
    })
}

/// GET /api/archive/status
pub async fn archive_status(State(state): State<AppState>) -> ApiResult<Json<ArchiveStatusResponse>> {
    Ok(Json(current_status(&state).await?))
}

/// GET /api/download
///
/// Zip snapshot of the active store; 413 when it exceeds the download limit.
pub async fn download_store(State(state): State<AppState>) -> ApiResult<Response> {
    let _guard = state.store_lock.try_lock().map_err(|_| ApiError::busy())?;

    let archive = state.archive.clone();
    let limit = state.max_download_bytes();

    let bytes = tokio::task::spawn_blocking(move || {
        let size = archive.store().disk_usage_bytes();
        if archive.status().active && size > limit {
            return Err(ApiError::PayloadTooLarge(format!(
                "Store is {:.2} MB, download limit is {:.2} MB",
                bytes_to_mb(size),
                bytes_to_mb(limit)
            )));
        }
        archive.snapshot().map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    tracing::info!(bytes = bytes.len(), "Store snapshot downloaded");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// POST /api/delete
///
/// Moves the active store to the holding area.
pub async fn delete_store(State(state): State<AppState>) -> ApiResult<Json<ArchiveStatusResponse>> {
    let guard = state.store_lock.try_lock().map_err(|_| ApiError::busy())?;

    let archive = state.archive.clone();
    tokio::task::spawn_blocking(move || archive.archive())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    drop(guard);

    Ok(Json(current_status(&state).await?))
}

/// POST /api/restore
///
/// Moves the archived store back; 404 if none, 409 if a store is active.
pub async fn restore_store(State(state): State<AppState>) -> ApiResult<Json<ArchiveStatusResponse>> {
    let guard = state.store_lock.try_lock().map_err(|_| ApiError::busy())?;

    let archive = state.archive.clone();
    tokio::task::spawn_blocking(move || archive.restore())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    drop(guard);

    Ok(Json(current_status(&state).await?))
}

pub fn archive_routes() -> Router<AppState> {
    Router::new()
        .route("/api/download", get(download_store))
        .route("/api/delete", post(delete_store))
        .route("/api/restore", post(restore_store))
        .route("/api/archive/status", get(archive_status))
}
