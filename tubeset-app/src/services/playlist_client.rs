//! Playlist enumeration
//!
//! The playlist page embeds its first batch of items in the `ytInitialData`
//! JSON blob. Later batches come from the `youtubei/v1/browse` endpoint,
//! driven by continuation tokens. View counts are read from each item's
//! watch page.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use super::platform_http::PlatformHttp;
use super::{ClientError, PlaylistItem, PlaylistLister, PlaylistUrl};

const WATCH_BASE_URL: &str = "https://www.youtube.com/watch?v=";
const BROWSE_URL: &str = "https://www.youtube.com/youtubei/v1/browse";
const FALLBACK_CLIENT_VERSION: &str = "2.20240101.00.00";

const INITIAL_DATA_MARKERS: [&str; 2] = ["var ytInitialData = ", "window[\"ytInitialData\"] = "];

static CLIENT_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""INNERTUBE_CONTEXT_CLIENT_VERSION"\s*:\s*"([^"]+)""#)
        .unwrap_or_else(|e| panic!("invalid client version pattern: {}", e))
});

static API_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#)
        .unwrap_or_else(|e| panic!("invalid api key pattern: {}", e))
});

static VIEW_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""viewCount"\s*:\s*"(\d+)""#)
        .unwrap_or_else(|e| panic!("invalid view count pattern: {}", e))
});

/// Item as found in a listing page, before its view count is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedVideo {
    pub video_id: String,
    pub title: String,
}

/// One batch of listed items plus the token for the next batch
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub videos: Vec<ListedVideo>,
    pub continuation: Option<String>,
}

pub fn watch_url(video_id: &str) -> String {
    format!("{}{}", WATCH_BASE_URL, video_id)
}

/// Parse the `ytInitialData` object embedded in a page
pub fn extract_initial_data(html: &str) -> Option<Value> {
    INITIAL_DATA_MARKERS.iter().find_map(|marker| {
        let start = html.find(marker)? + marker.len();
        // Reads one JSON value and ignores the trailing `;</script>`
        serde_json::Deserializer::from_str(&html[start..])
            .into_iter::<Value>()
            .next()
            .and_then(|value| value.ok())
    })
}

pub fn extract_client_version(html: &str) -> String {
    CLIENT_VERSION
        .captures(html)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| FALLBACK_CLIENT_VERSION.to_string())
}

pub fn extract_api_key(html: &str) -> Option<String> {
    API_KEY.captures(html).map(|c| c[1].to_string())
}

/// View count from a watch page
pub fn parse_view_count(html: &str) -> Option<u64> {
    VIEW_COUNT.captures(html).and_then(|c| c[1].parse().ok())
}

/// Collect playlist items and the next continuation token from any
/// initial-data or browse response document
pub fn parse_listing(document: &Value) -> ListingPage {
    let mut page = ListingPage::default();
    walk(document, &mut page);
    page
}

fn walk(value: &Value, page: &mut ListingPage) {
    match value {
        Value::Object(map) => {
            if let Some(renderer) = map.get("playlistVideoRenderer") {
                if let Some(video) = parse_renderer(renderer) {
                    page.videos.push(video);
                }
                return;
            }
            if let Some(renderer) = map.get("continuationItemRenderer") {
                if page.continuation.is_none() {
                    page.continuation = find_continuation_token(renderer);
                }
                return;
            }
            for child in map.values() {
                walk(child, page);
            }
        }
        Value::Array(items) => {
            for child in items {
                walk(child, page);
            }
        }
        _ => {}
    }
}

fn parse_renderer(renderer: &Value) -> Option<ListedVideo> {
    let video_id = renderer.get("videoId")?.as_str()?.to_string();
    let title = renderer
        .get("title")
        .map(text_of)
        .unwrap_or_default();

    Some(ListedVideo { video_id, title })
}

/// Flatten a `{"runs": [{"text"}]}` or `{"simpleText"}` node
fn text_of(node: &Value) -> String {
    if let Some(text) = node.get("simpleText").and_then(Value::as_str) {
        return text.to_string();
    }
    node.get("runs")
        .and_then(Value::as_array)
        .map(|runs| {
            runs.iter()
                .filter_map(|run| run.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn find_continuation_token(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(token) = map
                .get("continuationCommand")
                .and_then(|c| c.get("token"))
                .and_then(Value::as_str)
            {
                return Some(token.to_string());
            }
            map.values().find_map(find_continuation_token)
        }
        Value::Array(items) => items.iter().find_map(find_continuation_token),
        _ => None,
    }
}

/// Lists a playlist by scraping its page and following continuations
#[derive(Debug, Clone)]
pub struct PlaylistClient {
    http: PlatformHttp,
    max_pages: usize,
}

impl PlaylistClient {
    pub fn new(http: PlatformHttp, max_pages: usize) -> Self {
        Self {
            http,
            max_pages: max_pages.max(1),
        }
    }

    async fn list_videos(&self, url: &PlaylistUrl) -> Result<Vec<ListedVideo>, ClientError> {
        let html = self.http.get_text(url.as_str()).await?;
        let initial = extract_initial_data(&html)
            .ok_or_else(|| ClientError::Parse("playlist page has no ytInitialData".to_string()))?;

        let client_version = extract_client_version(&html);
        let browse_url = match extract_api_key(&html) {
            Some(key) => format!("{}?key={}&prettyPrint=false", BROWSE_URL, key),
            None => format!("{}?prettyPrint=false", BROWSE_URL),
        };

        let first = parse_listing(&initial);
        let mut videos = first.videos;
        let mut continuation = first.continuation;
        let mut pages = 1;

        while let Some(token) = continuation.take() {
            if pages >= self.max_pages {
                tracing::warn!(
                    list_id = url.list_id(),
                    pages,
                    "Playlist page limit reached, remaining items ignored"
                );
                break;
            }

            let body = json!({
                "context": {
                    "client": {
                        "clientName": "WEB",
                        "clientVersion": client_version,
                        "hl": "en",
                    }
                },
                "continuation": token,
            });
            let response = self.http.post_json(&browse_url, &body).await?;
            let page = parse_listing(&response);
            pages += 1;

            tracing::debug!(
                list_id = url.list_id(),
                page = pages,
                items = page.videos.len(),
                "Fetched continuation page"
            );

            if page.videos.is_empty() {
                break;
            }
            videos.extend(page.videos);
            continuation = page.continuation;
        }

        Ok(videos)
    }

    async fn view_count(&self, watch_url: &str) -> u64 {
        match self.http.get_text(watch_url).await {
            Ok(html) => parse_view_count(&html).unwrap_or_else(|| {
                tracing::warn!(watch_url, "No view count on watch page, using 0");
                0
            }),
            Err(e) => {
                tracing::warn!(watch_url, error = %e, "View count lookup failed, using 0");
                0
            }
        }
    }
}

#[async_trait]
impl PlaylistLister for PlaylistClient {
    async fn list(&self, url: &PlaylistUrl) -> Result<Vec<PlaylistItem>, ClientError> {
        let videos = self.list_videos(url).await?;
        tracing::info!(list_id = url.list_id(), items = videos.len(), "Listed playlist");

        let mut items = Vec::with_capacity(videos.len());
        for video in videos {
            let watch_url = watch_url(&video.video_id);
            let view_count = self.view_count(&watch_url).await;
            items.push(PlaylistItem {
                video_id: video.video_id,
                title: video.title,
                watch_url,
                view_count,
            });
        }

        Ok(items)
    }
}
