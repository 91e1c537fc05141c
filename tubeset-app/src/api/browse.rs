//! Browse API handlers
//!
//! GET /api/records, GET /api/stats, GET /images/:file
//!
//! Reads do not take the store lock; a read racing a save may see the
//! previous collection or fail as malformed and can simply be retried.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tubeset_common::stats::{self, DatasetStats};
use tubeset_common::Record;

use crate::error::{ApiError, ApiResult};
use crate::{bytes_to_mb, AppState};

const DEFAULT_SAMPLE: usize = 12;

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    pub sample: Option<usize>,
}

/// A record plus the URL its thumbnail is served from
#[derive(Debug, Serialize)]
pub struct RecordView {
    #[serde(flatten)]
    pub record: Record,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub total: usize,
    pub records: Vec<RecordView>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: DatasetStats,
    pub size_mb: f64,
}

/// GET /api/records?sample=N
///
/// A random sample of the active collection; empty when there is no store.
pub async fn sample_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> ApiResult<Json<RecordsResponse>> {
    let n = query.sample.unwrap_or(DEFAULT_SAMPLE);
    let store = state.store();

    let (total, picked) = tokio::task::spawn_blocking(move || {
        let collection = store.load_or_empty()?;
        Ok::<_, tubeset_common::Error>((collection.len(), stats::sample(&collection, n)))
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    let records = picked
        .into_iter()
        .map(|record| RecordView {
            image_url: record
                .thumbnail_details
                .file_name()
                .map(|name| format!("/images/{}", name)),
            record,
        })
        .collect();

    Ok(Json(RecordsResponse { total, records }))
}

/// GET /api/stats
pub async fn dataset_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let store = state.store();

    let response = tokio::task::spawn_blocking(move || {
        let collection = store.load_or_empty()?;
        Ok::<_, tubeset_common::Error>(StatsResponse {
            stats: DatasetStats::compute(&collection),
            size_mb: bytes_to_mb(store.disk_usage_bytes()),
        })
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(response))
}

/// GET /images/:file
///
/// Serves a thumbnail by bare file name only.
pub async fn serve_image(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> ApiResult<Response> {
    if !is_plain_file_name(&file) {
        return Err(ApiError::BadRequest(format!("Invalid image name: {}", file)));
    }

    let path = state.store().image_path(&file);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound(format!("Image {}", file)));
        }
        Err(e) => return Err(ApiError::Io(e)),
    };

    let content_type = match image::guess_format(&bytes) {
        Ok(image::ImageFormat::Png) => "image/png",
        _ => "image/jpeg",
    };

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// A single path component with no separators or dot segments
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
        && !name.contains(':')
}

pub fn browse_routes() -> Router<AppState> {
    Router::new()
        .route("/api/records", get(sample_records))
        .route("/api/stats", get(dataset_stats))
        .route("/images/:file", get(serve_image))
}
