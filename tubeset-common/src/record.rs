//! Record and collection model
//!
//! A record is one playlist item's metadata entry. `unique_id` is the only
//! field the core interprets; everything else is payload carried through
//! load/save and merge untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

use crate::{Error, Result};

/// Thumbnail file reference and geometry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailDetails {
    /// Image path relative to the store root (e.g. `images/abc123.jpg`)
    pub path: String,
    pub width: u32,
    pub height: u32,
    /// Unreduced `"{width}:{height}"`
    pub aspect_ratio: String,
}

impl ThumbnailDetails {
    pub fn new(path: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
            aspect_ratio: format!("{}:{}", width, height),
        }
    }

    /// File-name component of `path`
    ///
    /// Store lookups only use this, so `database/images/x.jpg` and
    /// `images/x.jpg` resolve to the same asset.
    pub fn file_name(&self) -> Option<&str> {
        Path::new(&self.path).file_name().and_then(|n| n.to_str())
    }
}

/// Title statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleAnalysis {
    pub title: String,
    /// Length in characters
    pub title_length: usize,
    /// Whitespace-separated words
    pub word_count: usize,
    pub num_tokens_bert: usize,
    pub num_tokens_gpt: usize,
}

/// One item's metadata entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Platform item identifier, unique within a store
    pub unique_id: String,
    pub category: String,
    pub thumbnail_details: ThumbnailDetails,
    pub video_views: u64,
    pub title_analysis: TitleAnalysis,
    /// Fields this version does not know about, preserved on save
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Ordered sequence of records with unique ids
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Collection {
    records: Vec<Record>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection, rejecting empty or duplicated ids
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if record.unique_id.trim().is_empty() {
                return Err(Error::Malformed(format!(
                    "record {} has an empty unique_id",
                    index
                )));
            }
            if !seen.insert(record.unique_id.as_str()) {
                return Err(Error::Malformed(format!(
                    "duplicate unique_id '{}' at record {}",
                    record.unique_id, index
                )));
            }
        }
        Ok(Self { records })
    }

    /// Parse a JSON document holding an array of records
    ///
    /// Every entry must conform; the first offending entry is named in the error.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(content)
            .map_err(|e| Error::Malformed(format!("invalid JSON: {}", e)))?;

        let entries = match document {
            Value::Array(entries) => entries,
            other => {
                return Err(Error::Malformed(format!(
                    "expected a JSON array of records, found {}",
                    json_kind(&other)
                )))
            }
        };

        let records = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                serde_json::from_value::<Record>(entry)
                    .map_err(|e| Error::Malformed(format!("record {}: {}", index, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_records(records)
    }

    /// Pretty JSON with 4-space indent and struct field order
    pub fn to_json_vec(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)?;
        out.push(b'\n');
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn ids(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.unique_id.as_str()).collect()
    }

    pub fn contains_id(&self, unique_id: &str) -> bool {
        self.records.iter().any(|r| r.unique_id == unique_id)
    }

    /// Append a record unless its id is already present
    ///
    /// Returns `false` (and drops the record) on a duplicate id.
    pub fn push(&mut self, record: Record) -> bool {
        if self.contains_id(&record.unique_id) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Append without the duplicate scan; callers track ids themselves
    pub(crate) fn push_unchecked(&mut self, record: Record) {
        self.records.push(record);
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
