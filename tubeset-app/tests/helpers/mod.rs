//! Shared fixtures for tubeset-app integration tests

#![allow(dead_code)]

pub mod fakes;

use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tubeset_app::pipeline::IngestPipeline;
use tubeset_app::services::{FormatValidator, PlaylistItem, TitleAnalyzer};
use tubeset_app::AppState;
use tubeset_common::config::Settings;

use fakes::{FakeCategories, FakeLister, FakeThumbnails};

pub const PLAYLIST_URL: &str = "https://www.youtube.com/playlist?list=PLtest_123";

/// Encoded image of the given size
pub fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img: RgbImage = ImageBuffer::from_pixel(width, height, Rgb([10, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

pub fn item(video_id: &str, title: &str, views: u64) -> PlaylistItem {
    PlaylistItem {
        video_id: video_id.to_string(),
        title: title.to_string(),
        watch_url: format!("https://www.youtube.com/watch?v={}", video_id),
        view_count: views,
    }
}

pub fn test_settings(root: &Path) -> Settings {
    Settings {
        root_folder: root.to_path_buf(),
        bind_address: "127.0.0.1:0".to_string(),
        http_timeout_secs: 5,
        request_interval_ms: 0,
        max_playlist_pages: 5,
        max_download_mb: 1024,
        max_upload_mb: 16,
        max_unpacked_mb: 64,
        bert_tokenizer: None,
        gpt_tokenizer: None,
        log_level: "debug".to_string(),
    }
}

pub fn pipeline(lister: FakeLister, thumbnails: FakeThumbnails) -> IngestPipeline {
    IngestPipeline::new(
        Arc::new(lister),
        Arc::new(thumbnails),
        Arc::new(FormatValidator::new()),
        Arc::new(FakeCategories::new("Music")),
        Arc::new(TitleAnalyzer::builtin()),
    )
}

/// App state over `root` whose ingestion sees `items`, each with a valid thumbnail
pub fn test_state(root: &Path, items: Vec<PlaylistItem>) -> AppState {
    let thumbnails = FakeThumbnails::with_images(
        items.iter().map(|i| i.video_id.clone()),
        image_bytes(64, 36, ImageFormat::Png),
    );
    AppState::new(test_settings(root), pipeline(FakeLister::new(items), thumbnails))
}
