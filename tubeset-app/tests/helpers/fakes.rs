//! In-memory collaborators for the ingestion pipeline

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tubeset_app::services::{
    CategoryLookup, ClientError, PlaylistItem, PlaylistLister, PlaylistUrl, ThumbnailFetcher,
};

/// Returns a fixed item list, or a listing failure
pub struct FakeLister {
    items: Option<Vec<PlaylistItem>>,
}

impl FakeLister {
    pub fn new(items: Vec<PlaylistItem>) -> Self {
        Self { items: Some(items) }
    }

    pub fn failing() -> Self {
        Self { items: None }
    }
}

#[async_trait]
impl PlaylistLister for FakeLister {
    async fn list(&self, _url: &PlaylistUrl) -> Result<Vec<PlaylistItem>, ClientError> {
        self.items
            .clone()
            .ok_or_else(|| ClientError::Network("connection refused".to_string()))
    }
}

/// What the fake platform answers for one thumbnail
#[derive(Clone)]
pub enum Thumbnail {
    Bytes(Vec<u8>),
    Missing,
    NetworkError,
}

/// Serves thumbnails from a map; unknown ids are missing
#[derive(Default)]
pub struct FakeThumbnails {
    responses: HashMap<String, Thumbnail>,
    requested: Mutex<Vec<String>>,
}

impl FakeThumbnails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_images(ids: impl IntoIterator<Item = String>, bytes: Vec<u8>) -> Self {
        let mut fake = Self::new();
        for id in ids {
            fake = fake.respond(&id, Thumbnail::Bytes(bytes.clone()));
        }
        fake
    }

    pub fn respond(mut self, video_id: &str, thumbnail: Thumbnail) -> Self {
        self.responses.insert(video_id.to_string(), thumbnail);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ThumbnailFetcher for FakeThumbnails {
    async fn fetch(&self, video_id: &str) -> Result<Option<Vec<u8>>, ClientError> {
        self.requested.lock().unwrap().push(video_id.to_string());
        match self.responses.get(video_id) {
            Some(Thumbnail::Bytes(bytes)) => Ok(Some(bytes.clone())),
            Some(Thumbnail::NetworkError) => Err(ClientError::Network("timed out".to_string())),
            Some(Thumbnail::Missing) | None => Ok(None),
        }
    }
}

/// Same category for every item
pub struct FakeCategories {
    category: String,
}

impl FakeCategories {
    pub fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
        }
    }
}

#[async_trait]
impl CategoryLookup for FakeCategories {
    async fn category(&self, _watch_url: &str) -> String {
        self.category.clone()
    }
}
