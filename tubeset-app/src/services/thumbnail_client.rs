//! Thumbnail downloads

use async_trait::async_trait;

use super::platform_http::PlatformHttp;
use super::{ClientError, ThumbnailFetcher};

const THUMBNAIL_BASE_URL: &str = "https://img.youtube.com/vi";

/// Highest-resolution thumbnail URL for an item
pub fn thumbnail_url(video_id: &str) -> String {
    format!("{}/{}/maxresdefault.jpg", THUMBNAIL_BASE_URL, video_id)
}

/// Fetches `maxresdefault.jpg`; items without one are reported as absent
#[derive(Debug, Clone)]
pub struct ThumbnailClient {
    http: PlatformHttp,
}

impl ThumbnailClient {
    pub fn new(http: PlatformHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ThumbnailFetcher for ThumbnailClient {
    async fn fetch(&self, video_id: &str) -> Result<Option<Vec<u8>>, ClientError> {
        self.http.get_bytes(&thumbnail_url(video_id)).await
    }
}
