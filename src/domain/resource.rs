//! The aggregated MCP resource document.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resource format version
pub const RESOURCE_VERSION: &str = "1.0";

/// Processing status for entries built without errors
pub const STATUS_SUCCESS: &str = "success";

/// Final aggregated output for one author
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResource {
    pub metadata: ResourceMetadata,
    pub content: Vec<ContentEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub author: String,
    pub version: String,
    pub last_updated: DateTime<Utc>,
    pub content_count: usize,

    /// Entry count per kind
    pub content_types: BTreeMap<String, usize>,
    pub processing_stats: ProcessingStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub total_items: usize,
    pub processed_items: usize,
    pub failed_items: usize,

    /// Wall-clock seconds spent assembling the resource
    pub processing_time: f64,
}

impl McpResource {
    /// Empty resource for an author, stamped now
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            metadata: ResourceMetadata {
                author: author.into(),
                version: RESOURCE_VERSION.to_string(),
                last_updated: Utc::now(),
                content_count: 0,
                content_types: BTreeMap::new(),
                processing_stats: ProcessingStats::default(),
            },
            content: Vec::new(),
        }
    }

    /// Append an entry and count it in the histogram
    pub fn push(&mut self, entry: ContentEntry) {
        *self
            .metadata
            .content_types
            .entry(entry.kind.clone())
            .or_insert(0) += 1;
        self.metadata.processing_stats.processed_items += 1;
        self.content.push(entry);
    }

    pub fn record_failure(&mut self) {
        self.metadata.processing_stats.failed_items += 1;
    }

    /// Finalize counters once all entries are in
    pub fn finish(&mut self, elapsed_secs: f64) {
        self.metadata.content_count = self.content.len();
        self.metadata.processing_stats.total_items = self.content.len();
        self.metadata.processing_stats.processing_time = elapsed_secs;
    }
}

/// One entry of the resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEntry {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub subkind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: EntryContent,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: EntryMetadata,
}

/// Kind-polymorphic content payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chapters: Vec<Chapter>,

    /// Processor-specific fields carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl EntryContent {
    /// The body text used for word counts, tags and summaries
    pub fn body(&self) -> Option<&str> {
        self.text.as_deref().or(self.transcript.as_deref())
    }

    pub fn word_count(&self) -> usize {
        self.body().map(word_count).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    #[serde(default)]
    pub word_count: usize,
    #[serde(default = "default_status")]
    pub processing_status: String,
    #[serde(default)]
    pub processing_errors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_count: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

fn default_status() -> String {
    STATUS_SUCCESS.to_string()
}

impl Default for EntryMetadata {
    fn default() -> Self {
        Self {
            word_count: 0,
            processing_status: default_status(),
            processing_errors: Vec::new(),
            character_count: None,
            excerpt: None,
        }
    }
}

impl EntryMetadata {
    pub fn with_word_count(word_count: usize) -> Self {
        Self {
            word_count,
            ..Self::default()
        }
    }
}

/// A chapter of a transcript-style entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Chapter {
    /// Convert a processor-written chapter object.
    ///
    /// Accepts string fields directly and yt-dlp style numeric
    /// `start_time` as the timestamp. Non-objects yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

        let timestamp = text("timestamp").or_else(|| {
            obj.get("start_time").and_then(|v| match v {
                Value::Number(n) => Some(n.to_string()),
                Value::String(s) => Some(s.clone()),
                _ => None,
            })
        });

        Some(Self {
            title: text("title"),
            content: text("content"),
            timestamp,
        })
    }
}

/// Whitespace-separated word count
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
