//! Per-kind content processors.
//!
//! A processor fetches or extracts the content behind one manifest row and
//! writes its output files into the row's kind directory. Every processor
//! follows the same calling convention: `(url, output_dir, subkind)`.
//!
//! Processors are registered explicitly by [`ContentKind`] when the
//! registry is built, never looked up while dispatching.

pub mod script;
pub mod textfiles;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::domain::ContentKind;

pub use script::ScriptProcessor;
pub use textfiles::GitHubTextFilesProcessor;

/// File name suffix of convention-based processor scripts
pub const SCRIPT_SUFFIX: &str = "_processor.py";

/// Result of a successful processor run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// The processor finished; its output follows the kind's file conventions
    Completed,

    /// The processor reported the files it wrote
    Files(Vec<PathBuf>),
}

/// Errors a processor can report
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to spawn processor '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Processor '{processor}' exited with code {code}: {stderr}")]
    ExitStatus {
        processor: String,
        code: i32,
        stderr: String,
    },

    #[error("Processor '{processor}' timed out after {timeout:?}")]
    Timeout { processor: String, timeout: Duration },

    #[error("Unsupported URL for processor '{processor}': {url}")]
    UnsupportedUrl { processor: String, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A per-kind content processor
#[async_trait]
pub trait Processor: Send + Sync {
    /// Human-readable processor name
    fn name(&self) -> &str;

    /// Process one manifest row into `output_dir`
    async fn process(
        &self,
        url: &str,
        output_dir: &Path,
        subkind: &str,
    ) -> Result<ProcessingOutcome, ProcessingError>;
}

/// Explicit kind -> processor table
#[derive(Default, Clone)]
pub struct ProcessorRegistry {
    processors: BTreeMap<ContentKind, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor, returning the one it replaced
    pub fn register(
        &mut self,
        kind: ContentKind,
        processor: Arc<dyn Processor>,
    ) -> Option<Arc<dyn Processor>> {
        self.processors.insert(kind, processor)
    }

    /// Builder-style registration
    pub fn with(mut self, kind: ContentKind, processor: impl Processor + 'static) -> Self {
        self.register(kind, Arc::new(processor));
        self
    }

    pub fn get(&self, kind: &ContentKind) -> Option<Arc<dyn Processor>> {
        self.processors.get(kind).cloned()
    }

    pub fn contains(&self, kind: &ContentKind) -> bool {
        self.processors.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &ContentKind> {
        self.processors.keys()
    }

    /// Build the startup registry.
    ///
    /// Later sources override earlier ones:
    /// 1. Native processors (`textfiles`)
    /// 2. `<processors dir>/<kind>_processor.py` scripts
    /// 3. `processors.commands` from the config file
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let mut registry = Self::new().with(ContentKind::TextFiles, GitHubTextFilesProcessor::new());
        let settings = &config.processors;
        let root = &config.workspace.root;

        for (kind, script) in discover_scripts(&config.workspace.processors)? {
            debug!(%kind, script = %script.display(), "Registering script processor");
            let processor = ScriptProcessor::new(format!("{}{}", kind, SCRIPT_SUFFIX), &settings.interpreter)
                .arg(script.to_string_lossy())
                .in_dir(root)
                .with_timeout(settings.timeout);
            registry.register(kind, Arc::new(processor));
        }

        for (kind, command) in &settings.commands {
            let Some((program, args)) = command.split_first() else {
                continue;
            };
            debug!(%kind, %program, "Registering configured processor");
            let processor = ScriptProcessor::new(kind.clone(), program)
                .args(args.iter().cloned())
                .in_dir(root)
                .with_timeout(settings.timeout);
            registry.register(ContentKind::parse(kind), Arc::new(processor));
        }

        Ok(registry)
    }
}

/// Find `<kind>_processor.py` files in `dir`, sorted by kind
fn discover_scripts(dir: &Path) -> Result<Vec<(ContentKind, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut scripts = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list processors in {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(kind) = name.strip_suffix(SCRIPT_SUFFIX) {
            if !kind.is_empty() {
                scripts.push((ContentKind::parse(kind), entry.path()));
            }
        }
    }

    scripts.sort();
    Ok(scripts)
}
