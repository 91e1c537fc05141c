//! tubeset library interface
//!
//! Exposes the router and state for the binary and for integration tests.

pub mod api;
pub mod error;
pub mod pipeline;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tower_http::trace::TraceLayer;
use tubeset_common::archive::ArchiveManager;
use tubeset_common::config::{RootFolderInitializer, Settings};
use tubeset_common::store::Store;

use crate::api::ingest::IngestRun;
use crate::pipeline::{IngestPipeline, IngestProgress};
use crate::services::{
    CategoryClient, ClientError, FormatValidator, PlatformHttp, PlaylistClient, ThumbnailClient,
    TitleAnalyzer,
};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub layout: RootFolderInitializer,
    pub archive: ArchiveManager,
    /// Held for the whole of every store mutation (ingest, merge, delete, restore)
    pub store_lock: Arc<Mutex<()>>,
    pub pipeline: Arc<IngestPipeline>,
    /// Current or most recent ingestion run
    pub ingest_run: Arc<RwLock<Option<IngestRun>>>,
    pub ingest_progress: Arc<watch::Sender<IngestProgress>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(settings: Settings, pipeline: IngestPipeline) -> Self {
        let layout = RootFolderInitializer::new(&settings.root_folder);
        let archive = ArchiveManager::new(layout.store_path(), layout.holding_path());
        let (progress, _) = watch::channel(IngestProgress::default());

        Self {
            settings: Arc::new(settings),
            layout,
            archive,
            store_lock: Arc::new(Mutex::new(())),
            pipeline: Arc::new(pipeline),
            ingest_run: Arc::new(RwLock::new(None)),
            ingest_progress: Arc::new(progress),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn store(&self) -> Store {
        self.archive.store()
    }

    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.settings.max_upload_mb.saturating_mul(BYTES_PER_MB)).unwrap_or(usize::MAX)
    }

    pub fn max_unpacked_bytes(&self) -> u64 {
        self.settings.max_unpacked_mb.saturating_mul(BYTES_PER_MB)
    }

    pub fn max_download_bytes(&self) -> u64 {
        self.settings.max_download_mb.saturating_mul(BYTES_PER_MB)
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Megabytes, rounded to two decimals
pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB as f64 * 100.0).round() / 100.0
}

/// Live collaborators talking to the video platform
pub fn build_pipeline(settings: &Settings) -> Result<IngestPipeline, ClientError> {
    let http = PlatformHttp::new(settings.http_timeout_secs, settings.request_interval_ms)?;
    let analyzer = TitleAnalyzer::from_paths(
        settings.bert_tokenizer.as_deref(),
        settings.gpt_tokenizer.as_deref(),
    );

    Ok(IngestPipeline::new(
        Arc::new(PlaylistClient::new(http.clone(), settings.max_playlist_pages)),
        Arc::new(ThumbnailClient::new(http.clone())),
        Arc::new(FormatValidator::new()),
        Arc::new(CategoryClient::new(http)),
        Arc::new(analyzer),
    ))
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes();

    Router::new()
        .merge(api::ui_routes())
        .merge(api::ingest_routes())
        .merge(api::browse_routes())
        .merge(api::merge_routes().layer(DefaultBodyLimit::max(upload_limit)))
        .merge(api::archive_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
