//! Summaries with a content-addressed cache.
//!
//! The summarizer is an external command reading text on stdin and writing
//! the summary to stdout. Cache entries live at
//! `downloads/<author>/summaries/<sha256>_summary.txt` and never expire.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::SummarizerSettings;
use crate::core::content_hash;

/// Produces a summary for one chunk of text
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    async fn summarize(&self, text: &str) -> Result<String>;
}

/// Summarizer backed by a subprocess
pub struct CommandSummarizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSummarizer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// `None` when no command is configured
    pub fn from_settings(settings: &SummarizerSettings) -> Option<Self> {
        let (program, args) = settings.command.as_ref()?.split_first()?;
        Some(Self::new(program.clone(), args.to_vec(), settings.timeout))
    }
}

#[async_trait]
impl Summarizer for CommandSummarizer {
    fn name(&self) -> &str {
        &self.program
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn summarizer '{}'", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .context("Failed to write to summarizer stdin")?;
            // Dropping stdin signals EOF
        }

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .with_context(|| format!("Summarizer timed out after {:?}", self.timeout))?
            .context("Failed to wait for summarizer")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Summarizer '{}' failed with exit code {}: {}",
                self.program,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
        }

        let stdout = String::from_utf8(output.stdout).context("Summarizer output is not valid UTF-8")?;
        Ok(stdout.trim().to_string())
    }
}

/// On-disk summary cache keyed by the hash of the input text
#[derive(Debug, Clone)]
pub struct SummaryCache {
    dir: PathBuf,
}

impl SummaryCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key(text: &str) -> String {
        content_hash(text)
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}_summary.txt", key))
    }

    pub async fn load(&self, key: &str) -> Option<String> {
        let raw = tokio::fs::read_to_string(self.path(key)).await.ok()?;
        let summary = raw.trim();
        (!summary.is_empty()).then(|| summary.to_string())
    }

    pub async fn store(&self, key: &str, summary: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path(key);
        tokio::fs::write(&path, summary)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Cache-first summarization with chunking
pub struct SummaryService {
    cache: SummaryCache,
    summarizer: Option<Arc<dyn Summarizer>>,
    chunk_chars: usize,
}

impl SummaryService {
    pub fn new(cache: SummaryCache, summarizer: Option<Arc<dyn Summarizer>>, chunk_chars: usize) -> Self {
        Self {
            cache,
            summarizer,
            chunk_chars: chunk_chars.max(1),
        }
    }

    /// Summary for `text`, or `None` when there is nothing to summarize,
    /// no summarizer, or the summarizer fails.
    pub async fn summarize(&self, text: &str, title: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }

        let key = SummaryCache::key(text);
        if let Some(cached) = self.cache.load(&key).await {
            debug!(%title, "Using cached summary");
            return Some(cached);
        }

        let summarizer = self.summarizer.as_ref()?;
        info!(%title, chars = text.chars().count(), summarizer = summarizer.name(), "Generating summary");

        let mut parts = Vec::new();
        for chunk in chunk_text(text, self.chunk_chars) {
            match summarizer.summarize(&chunk).await {
                Ok(part) if !part.is_empty() => parts.push(part),
                Ok(_) => {}
                Err(e) => {
                    warn!(%title, error = %format!("{:#}", e), "Summarization failed");
                    return None;
                }
            }
        }
        if parts.is_empty() {
            return None;
        }

        let summary = parts.join(" ");
        if let Err(e) = self.cache.store(&key, &summary).await {
            warn!(%title, error = %e, "Failed to cache summary");
        }
        Some(summary)
    }
}

/// Split into pieces of at most `size` characters
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Echoes the first word of each chunk and counts calls
    struct FirstWord {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Summarizer for FirstWord {
        fn name(&self) -> &str {
            "first-word"
        }

        async fn summarize(&self, text: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(text.split_whitespace().next().unwrap_or("").to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl Summarizer for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn summarize(&self, _text: &str) -> Result<String> {
            anyhow::bail!("model unavailable")
        }
    }

    #[test]
    fn test_chunk_text_respects_char_boundaries() {
        let chunks = chunk_text("héllo wörld", 4);
        assert_eq!(chunks, vec!["héll", "o wö", "rld"]);
        assert_eq!(chunk_text("", 4), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_summaries_are_cached() {
        let temp = TempDir::new().unwrap();
        let summarizer = Arc::new(FirstWord {
            calls: AtomicUsize::new(0),
        });
        let service = SummaryService::new(SummaryCache::new(temp.path()), Some(summarizer.clone()), 6);

        let first = service.summarize("alpha beta gamma", "t").await;
        // chunks: "alpha ", "beta g", "amma"
        assert_eq!(first.as_deref(), Some("alpha beta amma"));
        let calls = summarizer.calls.load(Ordering::SeqCst);
        assert_eq!(calls, 3);

        let second = service.summarize("alpha beta gamma", "t").await;
        assert_eq!(second, first);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), calls);

        let key = SummaryCache::key("alpha beta gamma");
        assert!(temp.path().join(format!("{key}_summary.txt")).exists());
    }

    #[tokio::test]
    async fn test_cache_is_read_without_summarizer() {
        let temp = TempDir::new().unwrap();
        let cache = SummaryCache::new(temp.path());
        cache.store(&SummaryCache::key("text"), "cached\n").await.unwrap();

        let service = SummaryService::new(cache, None, 1024);
        assert_eq!(service.summarize("text", "t").await.as_deref(), Some("cached"));
        assert!(service.summarize("other", "t").await.is_none());
    }

    #[tokio::test]
    async fn test_failure_degrades_to_none() {
        let temp = TempDir::new().unwrap();
        let service = SummaryService::new(SummaryCache::new(temp.path()), Some(Arc::new(Failing)), 1024);

        assert!(service.summarize("some text", "t").await.is_none());
        assert!(service.summarize("   ", "t").await.is_none());
    }
}
