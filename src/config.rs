//! Configuration and workspace layout.
//!
//! Configuration sources (highest priority first):
//! 1. Explicit config file (`--config <file>`)
//! 2. `megpt.yaml` in the workspace root
//! 3. Convention defaults (`authors/`, `downloads/`, `mcp_resources/`, `processors/`)
//!
//! Paths in a config file are relative to the workspace root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Name of the config file looked up in the workspace root
pub const CONFIG_FILE_NAME: &str = "megpt.yaml";

/// Manifest file name inside `authors/<author>/`
pub const MANIFEST_FILE_NAME: &str = "published_content.csv";

/// Ledger file name inside `downloads/<author>/`
pub const STATE_FILE_NAME: &str = "state.json";

/// Summary cache directory name inside `downloads/<author>/`
pub const SUMMARY_CACHE_DIR: &str = "summaries";

/// Resource file name inside `mcp_resources/<author>/`
pub const RESOURCE_FILE_NAME: &str = "mcp_resource.json";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub archive_base_url: Option<String>,
    #[serde(default)]
    pub processors: Option<ProcessorsConfig>,
    #[serde(default)]
    pub summarizer: Option<SummarizerConfig>,
    #[serde(default)]
    pub blog_archives: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub file_bucket: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    pub authors: Option<String>,
    pub downloads: Option<String>,
    pub resources: Option<String>,
    pub processors: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessorsConfig {
    /// Program used to run `<kind>_processor.py` scripts
    pub interpreter: Option<String>,
    pub timeout_seconds: Option<u64>,
    /// Explicit kind -> command overrides
    #[serde(default)]
    pub commands: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummarizerConfig {
    /// Command reading text on stdin and writing a summary to stdout
    pub command: Option<Vec<String>>,
    pub chunk_chars: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

/// Directory layout of a workspace, all paths absolute or rooted at `root`
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub authors: PathBuf,
    pub downloads: PathBuf,
    pub resources: PathBuf,
    pub processors: PathBuf,
}

impl Workspace {
    /// Conventional layout under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            authors: root.join("authors"),
            downloads: root.join("downloads"),
            resources: root.join("mcp_resources"),
            processors: root.join("processors"),
            root,
        }
    }

    /// `authors/<author>/`
    pub fn author_dir(&self, author: &str) -> PathBuf {
        self.authors.join(author)
    }

    /// `authors/<author>/published_content.csv`
    pub fn manifest_path(&self, author: &str) -> PathBuf {
        self.author_dir(author).join(MANIFEST_FILE_NAME)
    }

    /// `downloads/<author>/`
    pub fn downloads_dir(&self, author: &str) -> PathBuf {
        self.downloads.join(author)
    }

    /// `downloads/<author>/<kind>/`
    pub fn kind_dir(&self, author: &str, kind: &str) -> PathBuf {
        self.downloads_dir(author).join(kind)
    }

    /// `downloads/<author>/state.json`
    pub fn state_path(&self, author: &str) -> PathBuf {
        self.downloads_dir(author).join(STATE_FILE_NAME)
    }

    /// `downloads/<author>/summaries/`
    pub fn summary_cache_dir(&self, author: &str) -> PathBuf {
        self.downloads_dir(author).join(SUMMARY_CACHE_DIR)
    }

    /// `mcp_resources/<author>/`
    pub fn resource_dir(&self, author: &str) -> PathBuf {
        self.resources.join(author)
    }

    /// `mcp_resources/<author>/pdfs/`
    pub fn pdf_dir(&self, author: &str) -> PathBuf {
        self.resource_dir(author).join("pdfs")
    }

    /// `mcp_resources/<author>/mcp_resource.json`
    pub fn resource_path(&self, author: &str) -> PathBuf {
        self.resource_dir(author).join(RESOURCE_FILE_NAME)
    }

    /// Resolve a manifest URL that may be a relative filesystem path
    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = PathBuf::from(path);
        if candidate.is_absolute() {
            candidate
        } else {
            self.root.join(candidate)
        }
    }

    /// Render a path relative to the workspace root with `/` separators.
    ///
    /// Used as the pseudo-url of files that carry no web URL, so the same
    /// file always yields the same dedup key.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Processor invocation settings
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub interpreter: String,
    pub timeout: Option<Duration>,
    pub commands: BTreeMap<String, Vec<String>>,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout: None,
            commands: BTreeMap::new(),
        }
    }
}

/// Summarizer settings
#[derive(Debug, Clone)]
pub struct SummarizerSettings {
    pub command: Option<Vec<String>>,
    pub chunk_chars: usize,
    pub timeout: Duration,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            command: None,
            chunk_chars: 1024,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub workspace: Workspace,
    /// Base URL that repository-relative paths are rewritten onto
    pub archive_base_url: Option<String>,
    pub processors: ProcessorSettings,
    pub summarizer: SummarizerSettings,
    /// Output directory name -> kind for blog archive dumps
    pub blog_archives: BTreeMap<String, String>,
    /// Output directory holding loose files
    pub file_bucket: String,
    /// Path to config file (if one was loaded)
    pub config_file: Option<PathBuf>,
}

/// Default blog archive directories
pub fn default_blog_archives() -> BTreeMap<String, String> {
    [
        ("medium_adrianco".to_string(), "medium".to_string()),
        ("blogger_perfcap_posts".to_string(), "blogger".to_string()),
    ]
    .into_iter()
    .collect()
}

impl ResolvedConfig {
    /// Convention defaults rooted at `root`
    pub fn defaults(root: impl Into<PathBuf>) -> Self {
        Self {
            workspace: Workspace::new(root),
            archive_base_url: None,
            processors: ProcessorSettings::default(),
            summarizer: SummarizerSettings::default(),
            blog_archives: default_blog_archives(),
            file_bucket: "file".to_string(),
            config_file: None,
        }
    }

    /// Load configuration for a workspace root.
    ///
    /// An explicit file must exist; otherwise `megpt.yaml` in the root is
    /// used when present.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let candidate = root.join(CONFIG_FILE_NAME);
                candidate.exists().then_some(candidate)
            }
        };

        let Some(config_path) = config_path else {
            return Ok(Self::defaults(root));
        };

        let file = load_config_file(&config_path)?;
        Ok(Self::from_file(root, file, Some(config_path)))
    }

    fn from_file(root: &Path, file: ConfigFile, config_file: Option<PathBuf>) -> Self {
        let mut config = Self::defaults(root);

        let paths = &file.paths;
        if let Some(ref p) = paths.authors {
            config.workspace.authors = resolve_path(root, p);
        }
        if let Some(ref p) = paths.downloads {
            config.workspace.downloads = resolve_path(root, p);
        }
        if let Some(ref p) = paths.resources {
            config.workspace.resources = resolve_path(root, p);
        }
        if let Some(ref p) = paths.processors {
            config.workspace.processors = resolve_path(root, p);
        }

        config.archive_base_url = file.archive_base_url.filter(|u| !u.trim().is_empty());

        if let Some(processors) = file.processors {
            if let Some(interpreter) = processors.interpreter {
                config.processors.interpreter = interpreter;
            }
            config.processors.timeout = processors.timeout_seconds.map(Duration::from_secs);
            config.processors.commands = processors
                .commands
                .into_iter()
                .map(|(kind, cmd)| (kind.to_lowercase(), cmd))
                .filter(|(_, cmd)| !cmd.is_empty())
                .collect();
        }

        if let Some(summarizer) = file.summarizer {
            config.summarizer.command = summarizer.command.filter(|c| !c.is_empty());
            if let Some(chunk) = summarizer.chunk_chars.filter(|c| *c > 0) {
                config.summarizer.chunk_chars = chunk;
            }
            if let Some(secs) = summarizer.timeout_seconds {
                config.summarizer.timeout = Duration::from_secs(secs);
            }
        }

        if let Some(archives) = file.blog_archives {
            config.blog_archives = archives;
        }
        if let Some(bucket) = file.file_bucket {
            config.file_bucket = bucket;
        }

        config.config_file = config_file;
        config
    }
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the workspace root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let config = ResolvedConfig::load(temp.path(), None).unwrap();

        assert!(config.config_file.is_none());
        assert_eq!(config.workspace.downloads, temp.path().join("downloads"));
        assert_eq!(config.file_bucket, "file");
        assert_eq!(
            config.blog_archives.get("medium_adrianco"),
            Some(&"medium".to_string())
        );
        assert_eq!(config.summarizer.chunk_chars, 1024);
        assert!(config.summarizer.command.is_none());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            r#"
version: "1.0"
paths:
  downloads: cache/downloads
archive_base_url: https://example.com/repo/
processors:
  interpreter: python3.12
  timeout_seconds: 60
  commands:
    Podcast: ["podcast-dl", "--quiet"]
summarizer:
  command: ["fabric", "-p", "summarize"]
  chunk_chars: 2048
blog_archives:
  substack_dump: substack
"#,
        )
        .unwrap();

        let config = ResolvedConfig::load(temp.path(), None).unwrap();

        assert_eq!(
            config.workspace.downloads,
            temp.path().join("cache/downloads")
        );
        assert_eq!(config.workspace.authors, temp.path().join("authors"));
        assert_eq!(
            config.archive_base_url.as_deref(),
            Some("https://example.com/repo/")
        );
        assert_eq!(config.processors.interpreter, "python3.12");
        assert_eq!(config.processors.timeout, Some(Duration::from_secs(60)));
        assert_eq!(
            config.processors.commands.get("podcast"),
            Some(&vec!["podcast-dl".to_string(), "--quiet".to_string()])
        );
        assert_eq!(config.summarizer.chunk_chars, 2048);
        assert_eq!(config.blog_archives.len(), 1);
        assert!(config.config_file.is_some());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.yaml");
        assert!(ResolvedConfig::load(temp.path(), Some(&missing)).is_err());
    }

    #[test]
    fn test_workspace_layout() {
        let ws = Workspace::new("/work");

        assert_eq!(
            ws.manifest_path("alice"),
            PathBuf::from("/work/authors/alice/published_content.csv")
        );
        assert_eq!(
            ws.state_path("alice"),
            PathBuf::from("/work/downloads/alice/state.json")
        );
        assert_eq!(
            ws.kind_dir("alice", "book"),
            PathBuf::from("/work/downloads/alice/book")
        );
        assert_eq!(
            ws.pdf_dir("alice"),
            PathBuf::from("/work/mcp_resources/alice/pdfs")
        );
    }

    #[test]
    fn test_relative_and_resolve() {
        let ws = Workspace::new("/work");

        assert_eq!(
            ws.relative(Path::new("/work/downloads/alice/file/a.pdf")),
            "downloads/alice/file/a.pdf"
        );
        assert_eq!(ws.resolve("authors/x.pdf"), PathBuf::from("/work/authors/x.pdf"));
        assert_eq!(ws.resolve("/abs/x.pdf"), PathBuf::from("/abs/x.pdf"));
    }
}
