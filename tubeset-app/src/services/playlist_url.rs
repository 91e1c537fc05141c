//! Playlist URL gate
//!
//! Only canonical playlist URLs are accepted before any network or
//! filesystem work starts.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tubeset_common::{Error, Result};

static PLAYLIST_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://www\.youtube\.com/playlist\?list=([A-Za-z0-9_-]+)$")
        .unwrap_or_else(|e| panic!("invalid playlist URL pattern: {}", e))
});

/// A playlist URL that passed the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistUrl {
    url: String,
    list_id: String,
}

impl PlaylistUrl {
    /// Accept exactly `https://www.youtube.com/playlist?list=<id>`
    pub fn parse(input: &str) -> Result<Self> {
        let captures = PLAYLIST_URL.captures(input).ok_or_else(|| {
            Error::InvalidInput(format!(
                "not a playlist URL (expected https://www.youtube.com/playlist?list=...): {}",
                input
            ))
        })?;

        Ok(Self {
            url: input.to_string(),
            list_id: captures[1].to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn list_id(&self) -> &str {
        &self.list_id
    }
}

impl fmt::Display for PlaylistUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_canonical_url() {
        let url = PlaylistUrl::parse("https://www.youtube.com/playlist?list=PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG").unwrap();
        assert_eq!(url.list_id(), "PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG");
        assert_eq!(
            url.to_string(),
            "https://www.youtube.com/playlist?list=PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG"
        );
    }

    #[test]
    fn test_rejects_lookalikes() {
        for input in [
            "",
            "http://www.youtube.com/playlist?list=PL123",
            "https://youtube.com/playlist?list=PL123",
            "https://www.youtube.com/playlist?list=",
            "https://www.youtube.com/playlist?list=PL123&index=2",
            "https://www.youtube.com/watch?v=abc&list=PL123",
            "https://www.youtube.com/playlist?list=PL1 23",
            " https://www.youtube.com/playlist?list=PL123",
        ] {
            assert!(
                matches!(PlaylistUrl::parse(input), Err(Error::InvalidInput(_))),
                "should reject {:?}",
                input
            );
        }
    }
}
