//! Recursive discovery of everything under `downloads/<author>/`.
//!
//! Top-level directories are classified as:
//! - blog archives (configured map): every `.txt` is a `blog_post`
//! - the file bucket: every file, subkind by extension
//! - anything else: `.json` and `.txt` files, kind = directory name
//!
//! The summary cache, top-level files (ledger, lock) and `*_summary.txt`
//! sidecars are never discovered. Items come out in sorted path order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{ResolvedConfig, SUMMARY_CACHE_DIR};
use crate::core::short_hash;
use crate::domain::{ContentEntry, ContentKind, EntryContent};

use super::processed::{content_from_payload, file_stem, is_summary_sidecar, json_url, TextDocument};

pub const SUBKIND_BLOG_POST: &str = "blog_post";
pub const SUBKIND_PRESENTATION: &str = "presentation";
pub const SUBKIND_DOCUMENT: &str = "document";

/// A file found by the walk
#[derive(Debug, Clone)]
pub struct DiscoveredItem {
    pub id: String,
    pub kind: String,
    pub subkind: String,
    pub title: String,
    pub source: String,
    /// Web URL from the file, or its workspace-relative path
    pub url: String,
    pub path: PathBuf,
    pub content: EntryContent,

    /// A complete entry written by a processor
    pub prebuilt: Option<Box<ContentEntry>>,
}

impl DiscoveredItem {
    pub fn content_kind(&self) -> ContentKind {
        ContentKind::parse(&self.kind)
    }

    pub fn is_pdf(&self) -> bool {
        has_extension(&self.path, "pdf")
    }
}

/// Result of one walk
#[derive(Debug, Default)]
pub struct Discovered {
    pub items: Vec<DiscoveredItem>,

    /// Files that could not be read or parsed
    pub failed: Vec<PathBuf>,
}

/// How a top-level output directory is read
#[derive(Debug, Clone, PartialEq, Eq)]
enum DirClass {
    BlogArchive { kind: String },
    FileBucket,
    Generic,
}

/// Walks one author's output tree
pub struct Discovery<'a> {
    config: &'a ResolvedConfig,
    author: &'a str,
}

impl<'a> Discovery<'a> {
    pub fn new(config: &'a ResolvedConfig, author: &'a str) -> Self {
        Self { config, author }
    }

    /// Discover every item; per-file failures are logged, skipped and
    /// returned in `failed`
    pub fn discover(&self) -> Discovered {
        let root = self.config.workspace.downloads_dir(self.author);
        let mut found = Discovered::default();

        let mut dirs: Vec<PathBuf> = match std::fs::read_dir(&root) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect(),
            Err(_) => return found,
        };
        dirs.sort();

        for dir in dirs {
            let name = dir_name(&dir);
            if name == SUMMARY_CACHE_DIR || name.starts_with('.') {
                continue;
            }

            let class = self.classify(&name);
            for path in walk_files(&dir) {
                if is_summary_sidecar(&path) {
                    continue;
                }
                match self.discover_file(&name, &class, &path) {
                    Ok(Some(item)) => found.items.push(item),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(file = %path.display(), error = %format!("{:#}", e), "Failed to read discovered file");
                        found.failed.push(path);
                    }
                }
            }
        }

        debug!(count = found.items.len(), failed = found.failed.len(), "Discovered items");
        found
    }

    fn classify(&self, dir_name: &str) -> DirClass {
        if let Some(kind) = self.config.blog_archives.get(dir_name) {
            DirClass::BlogArchive { kind: kind.clone() }
        } else if dir_name == self.config.file_bucket {
            DirClass::FileBucket
        } else {
            DirClass::Generic
        }
    }

    fn discover_file(&self, dir_name: &str, class: &DirClass, path: &Path) -> Result<Option<DiscoveredItem>> {
        match class {
            DirClass::BlogArchive { kind } => {
                if !has_extension(path, "txt") {
                    return Ok(None);
                }
                self.text_item(kind, SUBKIND_BLOG_POST, dir_name, path).map(Some)
            }
            DirClass::FileBucket => {
                let subkind = bucket_subkind(path);
                if subkind == SUBKIND_BLOG_POST {
                    return self.text_item(dir_name, subkind, dir_name, path).map(Some);
                }
                let url = self.config.workspace.relative(path);
                Ok(Some(self.item(dir_name, subkind, dir_name, url, path, EntryContent::default())))
            }
            DirClass::Generic => {
                if has_extension(path, "json") {
                    self.json_item(dir_name, path)
                } else if has_extension(path, "txt") {
                    self.text_item(dir_name, "", dir_name, path).map(Some)
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn text_item(&self, kind: &str, subkind: &str, source: &str, path: &Path) -> Result<DiscoveredItem> {
        let doc = TextDocument::read(path)?;
        let url = doc
            .url
            .unwrap_or_else(|| self.config.workspace.relative(path));
        let content = EntryContent {
            text: Some(doc.body),
            ..EntryContent::default()
        };
        Ok(self.item(kind, subkind, source, url, path, content))
    }

    fn json_item(&self, dir_name: &str, path: &Path) -> Result<Option<DiscoveredItem>> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        let Value::Object(payload) = value else {
            return Ok(None);
        };

        if is_prebuilt(&payload) {
            let entry: ContentEntry = serde_json::from_value(Value::Object(payload))
                .with_context(|| format!("Malformed prebuilt entry in {}", path.display()))?;
            let url = if entry.url.is_empty() {
                self.config.workspace.relative(path)
            } else {
                entry.url.clone()
            };
            let mut item = self.item(&entry.kind, &entry.subkind, &entry.source, url, path, entry.content.clone());
            item.title = entry.title.clone();
            item.prebuilt = Some(Box::new(entry));
            return Ok(Some(item));
        }

        let url = json_url(&payload).unwrap_or_else(|| self.config.workspace.relative(path));
        let style = ContentKind::parse(dir_name).payload_style();
        let content = content_from_payload(&payload, style);
        let mut item = self.item(dir_name, "", dir_name, url, path, content);
        if let Some(title) = payload.get("title").and_then(Value::as_str) {
            item.title = title.to_string();
        }
        Ok(Some(item))
    }

    fn item(
        &self,
        kind: &str,
        subkind: &str,
        source: &str,
        url: String,
        path: &Path,
        content: EntryContent,
    ) -> DiscoveredItem {
        DiscoveredItem {
            id: format!("{}_{}_{}", self.author, kind, short_hash(&url)),
            kind: kind.to_string(),
            subkind: subkind.to_string(),
            title: file_stem(path).replace('_', " "),
            source: source.to_string(),
            url,
            path: path.to_path_buf(),
            content,
            prebuilt: None,
        }
    }
}

/// Objects with both `id` and `kind` are complete entries
fn is_prebuilt(payload: &serde_json::Map<String, Value>) -> bool {
    payload.get("id").is_some_and(Value::is_string) && payload.get("kind").is_some_and(Value::is_string)
}

/// Subkind of a file-bucket file by extension
pub fn bucket_subkind(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" | "pptx" | "ppt" => SUBKIND_PRESENTATION,
        "txt" => SUBKIND_BLOG_POST,
        _ => SUBKIND_DOCUMENT,
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Regular, non-hidden files below `dir` in sorted order
fn walk_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}
