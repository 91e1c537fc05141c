//! Merge API handler
//!
//! POST /api/merge takes a zip package as the raw request body.

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use std::io::Write;
use tubeset_common::merge::{merge_package, MergeReport};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/merge
///
/// The upload is staged under `uploads/`, extracted there (up to
/// `max_unpacked_mb`) and merged into the active store. Staged files are
/// removed whatever the outcome.
pub async fn merge_upload(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<MergeReport>> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Empty upload".to_string()));
    }

    let _guard = state.store_lock.try_lock().map_err(|_| ApiError::busy())?;

    let uploads = state.layout.uploads_path();
    let store = state.store();
    let size = body.len();
    let unpack_limit = state.max_unpacked_bytes();

    let result = tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&uploads)?;
        let mut staged = tempfile::Builder::new()
            .prefix("upload_")
            .suffix(".zip")
            .tempfile_in(&uploads)?;
        staged.write_all(&body)?;
        staged.flush()?;

        merge_package(staged.path(), &store, &uploads, unpack_limit)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    match result {
        Ok(report) => {
            tracing::info!(
                bytes = size,
                added = report.added,
                skipped = report.skipped_duplicates,
                images = report.images_copied,
                "Merged uploaded package"
            );
            Ok(Json(report))
        }
        Err(e) => {
            tracing::warn!(bytes = size, error = %e, "Merge rejected");
            state.record_error(format!("Merge failed: {}", e)).await;
            Err(e.into())
        }
    }
}

pub fn merge_routes() -> Router<AppState> {
    Router::new().route("/api/merge", post(merge_upload))
}
