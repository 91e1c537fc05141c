//! Category lookup from an item's watch page

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::platform_http::PlatformHttp;
use super::CategoryLookup;

/// Returned whenever the category cannot be determined
pub const UNKNOWN_CATEGORY: &str = "Unknown";

static GENRE_META: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<meta\s+itemprop="genre"\s+content="([^"]*)""#)
        .unwrap_or_else(|e| panic!("invalid genre pattern: {}", e))
});

static CATEGORY_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""category"\s*:\s*"((?:[^"\\]|\\.)*)""#)
        .unwrap_or_else(|e| panic!("invalid category pattern: {}", e))
});

/// Extract the category from watch page HTML
///
/// Prefers the `genre` meta tag and falls back to the embedded
/// `"category"` JSON field.
pub fn parse_category(html: &str) -> Option<String> {
    let raw = GENRE_META
        .captures(html)
        .or_else(|| CATEGORY_JSON.captures(html))
        .map(|c| c[1].to_string())?;

    let category = unescape_html(&unescape_json(&raw)).trim().to_string();
    if category.is_empty() {
        None
    } else {
        Some(category)
    }
}

fn unescape_json(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}

fn unescape_html(raw: &str) -> String {
    raw.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

/// Reads the category from the watch page
#[derive(Debug, Clone)]
pub struct CategoryClient {
    http: PlatformHttp,
}

impl CategoryClient {
    pub fn new(http: PlatformHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CategoryLookup for CategoryClient {
    async fn category(&self, watch_url: &str) -> String {
        match self.http.get_text(watch_url).await {
            Ok(html) => parse_category(&html).unwrap_or_else(|| {
                tracing::warn!(watch_url, "No category on watch page");
                UNKNOWN_CATEGORY.to_string()
            }),
            Err(e) => {
                tracing::warn!(watch_url, error = %e, "Category lookup failed");
                UNKNOWN_CATEGORY.to_string()
            }
        }
    }
}
