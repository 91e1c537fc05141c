//! Ingestion pipeline
//!
//! Turns a playlist into a fresh store: one record per item whose thumbnail
//! could be downloaded and validated. Per-item problems skip that item;
//! only filesystem failures stop the run.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tubeset_common::archive::ArchiveManager;
use tubeset_common::store::Store;
use tubeset_common::{Collection, Record, ThumbnailDetails};

use crate::services::{
    CategoryLookup, ClientError, ImageValidator, PlaylistItem, PlaylistLister, PlaylistUrl,
    ThumbnailFetcher, TitleAnalyzer,
};

/// Ingestion failures that stop a run
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Playlist listing failed: {0}")]
    Listing(#[from] ClientError),

    #[error("Store error: {0}")]
    Store(#[from] tubeset_common::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub total_items: usize,
    pub accepted: usize,
    pub skipped: usize,
    pub records_written: usize,
}

/// Live progress of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestProgress {
    pub total: usize,
    pub processed: usize,
    pub accepted: usize,
    pub skipped: usize,
    pub current_title: Option<String>,
}

/// Why an item produced no record
#[derive(Debug)]
enum Skip {
    NoThumbnail,
    Rejected,
    DuplicateId,
}

/// The collaborators an ingestion run needs
pub struct IngestPipeline {
    lister: Arc<dyn PlaylistLister>,
    thumbnails: Arc<dyn ThumbnailFetcher>,
    validator: Arc<dyn ImageValidator>,
    categories: Arc<dyn CategoryLookup>,
    analyzer: Arc<TitleAnalyzer>,
}

impl IngestPipeline {
    pub fn new(
        lister: Arc<dyn PlaylistLister>,
        thumbnails: Arc<dyn ThumbnailFetcher>,
        validator: Arc<dyn ImageValidator>,
        categories: Arc<dyn CategoryLookup>,
        analyzer: Arc<TitleAnalyzer>,
    ) -> Self {
        Self {
            lister,
            thumbnails,
            validator,
            categories,
            analyzer,
        }
    }

    /// Build a store for `url` at the archive manager's active location
    ///
    /// The holding area is purged first. The previous collection is replaced
    /// once every item has been processed; a structural failure part way
    /// through still saves the records gathered so far before returning the
    /// error. Callers must hold the store lock.
    pub async fn run(
        &self,
        url: &PlaylistUrl,
        archive: &ArchiveManager,
        progress: &watch::Sender<IngestProgress>,
    ) -> Result<IngestReport, IngestError> {
        let store = archive.store();
        let purge_target = archive.clone();
        blocking(move || purge_target.purge()).await?;

        let items = self.lister.list(url).await?;
        tracing::info!(
            list_id = url.list_id(),
            items = items.len(),
            store = %store.root().display(),
            "Starting ingestion"
        );

        let layout = store.clone();
        blocking(move || layout.ensure_layout()).await?;

        let mut state = IngestProgress {
            total: items.len(),
            ..Default::default()
        };
        progress.send_replace(state.clone());

        let mut collection = Collection::new();
        let mut failure = None;

        for item in &items {
            state.current_title = Some(item.title.clone());
            progress.send_replace(state.clone());

            match self.ingest_item(&store, &collection, item).await {
                Ok(Ok(record)) => {
                    collection.push(record);
                    state.accepted += 1;
                }
                Ok(Err(reason)) => {
                    tracing::info!(video_id = %item.video_id, reason = ?reason, "Skipped item");
                    state.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(video_id = %item.video_id, error = %e, "Ingestion stopped");
                    failure = Some(e);
                    break;
                }
            }

            state.processed += 1;
            progress.send_replace(state.clone());
        }

        state.current_title = None;
        progress.send_replace(state.clone());

        let records_written = collection.len();
        let saved_store = store.clone();
        blocking(move || saved_store.save(&collection)).await?;

        if let Some(e) = failure {
            tracing::warn!(records = records_written, "Partial collection saved");
            return Err(e);
        }

        let report = IngestReport {
            total_items: items.len(),
            accepted: state.accepted,
            skipped: state.skipped,
            records_written,
        };

        tracing::info!(
            list_id = url.list_id(),
            accepted = report.accepted,
            skipped = report.skipped,
            "Ingestion complete"
        );

        Ok(report)
    }

    /// Outer error stops the run; inner error skips the item
    async fn ingest_item(
        &self,
        store: &Store,
        collection: &Collection,
        item: &PlaylistItem,
    ) -> Result<Result<Record, Skip>, IngestError> {
        if collection.contains_id(&item.video_id) {
            return Ok(Err(Skip::DuplicateId));
        }

        let bytes = match self.thumbnails.fetch(&item.video_id).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::warn!(video_id = %item.video_id, "No thumbnail available");
                return Ok(Err(Skip::NoThumbnail));
            }
            Err(e) => {
                tracing::warn!(video_id = %item.video_id, error = %e, "Thumbnail download failed");
                return Ok(Err(Skip::NoThumbnail));
            }
        };

        let file_name = format!("{}.jpg", item.video_id);
        let path = store.image_path(&file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| IngestError::Store(e.into()))?;

        let Some((width, height)) = self.check_image(path).await? else {
            return Ok(Err(Skip::Rejected));
        };

        let category = self.categories.category(&item.watch_url).await;
        let title_analysis = self.analyzer.analyze(&item.title);

        tracing::debug!(video_id = %item.video_id, width, height, category = %category, "Accepted item");

        Ok(Ok(Record {
            unique_id: item.video_id.clone(),
            category,
            thumbnail_details: ThumbnailDetails::new(
                Store::relative_image_path(&file_name),
                width,
                height,
            ),
            video_views: item.view_count,
            title_analysis,
            extra: Default::default(),
        }))
    }

    /// Validate on the blocking pool; `None` when rejected (file removed)
    async fn check_image(&self, path: PathBuf) -> Result<Option<(u32, u32)>, IngestError> {
        let validator = Arc::clone(&self.validator);
        tokio::task::spawn_blocking(move || {
            if !validator.validate(&path) {
                return None;
            }
            let dimensions = validator.dimensions(&path);
            if dimensions.is_none() {
                let _ = std::fs::remove_file(&path);
            }
            dimensions
        })
        .await
        .map_err(|e| IngestError::Task(e.to_string()))
    }
}

async fn blocking<T, F>(f: F) -> Result<T, IngestError>
where
    F: FnOnce() -> tubeset_common::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| IngestError::Task(e.to_string()))?
        .map_err(IngestError::from)
}
