//! Processor output loading.
//!
//! Processors leave two kinds of files in `downloads/<author>/<kind>/`:
//! JSON objects (URL under `URL` or `url`) and text files whose first line
//! may carry the source URL.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::Workspace;
use crate::domain::{Chapter, EntryContent, PayloadStyle};

fn url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"https?://\S+").ok())
        .as_ref()
}

/// First `http(s)://` URL in a line
pub fn extract_url(line: &str) -> Option<String> {
    url_pattern()?.find(line).map(|m| m.as_str().to_string())
}

/// A text file split into its optional URL header and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    pub url: Option<String>,
    pub body: String,
}

impl TextDocument {
    /// When the first line holds a URL, it is taken as the source and
    /// dropped from the body.
    pub fn parse(raw: &str) -> Self {
        let (first, rest) = match raw.split_once('\n') {
            Some((first, rest)) => (first, rest),
            None => (raw, ""),
        };

        match extract_url(first) {
            Some(url) => Self {
                url: Some(url),
                body: rest.to_string(),
            },
            None => Self {
                url: None,
                body: raw.to_string(),
            },
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::parse(&raw))
    }
}

/// URL stored in a processor JSON object
pub fn json_url(payload: &Map<String, Value>) -> Option<String> {
    ["URL", "url"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Build an entry payload from a processor object.
///
/// Transcript kinds take `transcript` and `chapters`; the rest take `text`.
/// Each falls back to the other body field when its own is absent.
pub fn content_from_payload(payload: &Map<String, Value>, style: PayloadStyle) -> EntryContent {
    let text = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let summary = text("summary");

    match style {
        PayloadStyle::Transcript => EntryContent {
            transcript: text("transcript").or_else(|| text("text")),
            chapters: payload
                .get("chapters")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Chapter::from_value).collect())
                .unwrap_or_default(),
            summary,
            ..EntryContent::default()
        },
        PayloadStyle::Text => EntryContent {
            text: text("text").or_else(|| text("transcript")),
            summary,
            ..EntryContent::default()
        },
    }
}

/// One processed artifact of a manifest kind
#[derive(Debug, Clone)]
pub struct ProcessedItem {
    /// Source URL, or the workspace-relative path for text files without one
    pub url: Option<String>,
    pub title: String,
    pub path: PathBuf,
    pub payload: Map<String, Value>,

    /// `url` is the file's own path; the file is a sidecar of a manifest row
    pub path_url: bool,
}

impl ProcessedItem {
    pub fn content(&self, style: PayloadStyle) -> EntryContent {
        content_from_payload(&self.payload, style)
    }
}

/// Load `*.json` and `*.txt` directly inside `downloads/<author>/<kind>/`.
///
/// Unreadable files are logged and skipped.
pub fn load_processed_content(workspace: &Workspace, author: &str, kind: &str) -> Vec<ProcessedItem> {
    let dir = workspace.kind_dir(author, kind);
    let mut items = Vec::new();

    for path in sorted_files(&dir, "json") {
        match load_json(&path) {
            Ok(Some(item)) => items.push(item),
            Ok(None) => debug!(file = %path.display(), "Skipping non-object JSON"),
            Err(e) => warn!(file = %path.display(), error = %e, "Failed to load processed JSON"),
        }
    }

    for path in sorted_files(&dir, "txt") {
        if is_summary_sidecar(&path) {
            continue;
        }
        match load_text(workspace, &path) {
            Ok(item) => items.push(item),
            Err(e) => warn!(file = %path.display(), error = %e, "Failed to load processed text"),
        }
    }

    debug!(%kind, count = items.len(), "Loaded processed content");
    items
}

/// `<stem>_summary.txt` files hold summaries, not content
pub fn is_summary_sidecar(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with("_summary.txt"))
}

fn sorted_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        extension
    );
    let mut paths: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(paths) => paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect(),
        Err(_) => Vec::new(),
    };
    paths.sort();
    paths
}

fn load_json(path: &Path) -> Result<Option<ProcessedItem>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let Value::Object(payload) = value else {
        return Ok(None);
    };

    let title = payload
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| file_stem(path));

    Ok(Some(ProcessedItem {
        url: json_url(&payload),
        title,
        path: path.to_path_buf(),
        payload,
        path_url: false,
    }))
}

fn load_text(workspace: &Workspace, path: &Path) -> Result<ProcessedItem> {
    let doc = TextDocument::read(path)?;
    let path_url = doc.url.is_none();
    let url = doc.url.unwrap_or_else(|| workspace.relative(path));
    let title = file_stem(path);

    let mut payload = Map::new();
    payload.insert("text".to_string(), Value::String(doc.body));
    payload.insert("URL".to_string(), Value::String(url.clone()));
    payload.insert("title".to_string(), Value::String(title.clone()));

    Ok(ProcessedItem {
        url: Some(url),
        title,
        path: path.to_path_buf(),
        payload,
        path_url,
    })
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
