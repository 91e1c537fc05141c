//! Collaborators used by the ingestion pipeline
//!
//! Each collaborator sits behind a trait so the pipeline can run against
//! fakes in tests. The `*Client` types are the live implementations talking
//! to the video platform.

pub mod category_client;
pub mod image_validator;
pub mod platform_http;
pub mod playlist_client;
pub mod playlist_url;
pub mod rate_limiter;
pub mod thumbnail_client;
pub mod title_analyzer;

pub use category_client::CategoryClient;
pub use image_validator::FormatValidator;
pub use platform_http::PlatformHttp;
pub use playlist_client::PlaylistClient;
pub use playlist_url::PlaylistUrl;
pub use thumbnail_client::ThumbnailClient;
pub use title_analyzer::TitleAnalyzer;

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Errors from the platform HTTP clients
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One playlist entry as listed by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistItem {
    pub video_id: String,
    pub title: String,
    pub watch_url: String,
    pub view_count: u64,
}

/// Enumerates the items of a playlist in playlist order
#[async_trait]
pub trait PlaylistLister: Send + Sync {
    async fn list(&self, url: &PlaylistUrl) -> Result<Vec<PlaylistItem>, ClientError>;
}

/// Downloads a thumbnail; `Ok(None)` when the platform has none
#[async_trait]
pub trait ThumbnailFetcher: Send + Sync {
    async fn fetch(&self, video_id: &str) -> Result<Option<Vec<u8>>, ClientError>;
}

/// Resolves an item's category; never fails, `"Unknown"` on any problem
#[async_trait]
pub trait CategoryLookup: Send + Sync {
    async fn category(&self, watch_url: &str) -> String;
}

/// Checks and normalizes an image file in place
///
/// Blocking; call from the blocking pool.
pub trait ImageValidator: Send + Sync {
    /// True when the file is an accepted image. A rejected file is deleted.
    fn validate(&self, path: &Path) -> bool;

    /// Pixel width and height of an image file
    fn dimensions(&self, path: &Path) -> Option<(u32, u32)>;
}
