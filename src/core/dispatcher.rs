//! Build dispatcher: manifest rows -> downloads.
//!
//! Each row goes through one pass of
//! `Unseen -> {Skipped | Copied | Ignored | FallbackWritten | Processed | Failed}`.
//! Rows are handled one at a time in manifest order; a failing row is
//! recorded and the batch moves on.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info, instrument, warn};

use crate::config::Workspace;
use crate::domain::{Manifest, ManifestRow};
use crate::processors::ProcessorRegistry;

use super::hashing::short_hash;
use super::ledger::{write_json_atomic, LedgerEntry, StateLedger};

/// What happened to one manifest row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Already in the ledger
    Skipped,
    /// Local file or directory copied; holds the number of files
    Copied(usize),
    /// Kind `file` with nothing to copy
    Ignored,
    /// A registered processor succeeded
    Processed,
    /// No processor for the kind; the row was written as JSON
    FallbackWritten(PathBuf),
    Failed(String),
}

impl RowOutcome {
    /// Whether the row should be recorded in the ledger
    pub fn is_recorded(&self) -> bool {
        matches!(
            self,
            Self::Copied(_) | Self::Processed | Self::FallbackWritten(_)
        )
    }
}

/// Per-kind counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindTally {
    pub total: usize,
    pub processed: usize,
    pub copied: usize,
    pub fallback: usize,
    pub ignored: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl KindTally {
    fn add(&mut self, other: &KindTally) {
        self.total += other.total;
        self.processed += other.processed;
        self.copied += other.copied;
        self.fallback += other.fallback;
        self.ignored += other.ignored;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

impl fmt::Display for KindTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows: {} processed, {} copied, {} fallback, {} ignored, {} skipped, {} failed",
            self.total,
            self.processed,
            self.copied,
            self.fallback,
            self.ignored,
            self.skipped,
            self.failed
        )
    }
}

/// A row that failed, for the end-of-run report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub index: usize,
    pub url: String,
    pub kind: String,
    pub error: String,
}

/// End-of-run summary of a build
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub author: String,
    pub kinds: BTreeMap<String, KindTally>,
    pub failures: Vec<RowFailure>,
    /// Rows without a URL; never dispatched
    pub empty_urls: usize,
}

impl BuildReport {
    fn new(author: &str) -> Self {
        Self {
            author: author.to_string(),
            ..Self::default()
        }
    }

    fn record(&mut self, row: &ManifestRow, outcome: &RowOutcome) {
        let tally = self
            .kinds
            .entry(row.content_kind().as_str().to_string())
            .or_default();
        tally.total += 1;
        match outcome {
            RowOutcome::Skipped => tally.skipped += 1,
            RowOutcome::Copied(_) => tally.copied += 1,
            RowOutcome::Ignored => tally.ignored += 1,
            RowOutcome::Processed => tally.processed += 1,
            RowOutcome::FallbackWritten(_) => tally.fallback += 1,
            RowOutcome::Failed(error) => {
                tally.failed += 1;
                self.failures.push(RowFailure {
                    index: row.index,
                    url: row.url.clone(),
                    kind: row.kind.clone(),
                    error: error.clone(),
                });
            }
        }
    }

    /// Counters summed over every kind
    pub fn totals(&self) -> KindTally {
        let mut totals = KindTally::default();
        for tally in self.kinds.values() {
            totals.add(tally);
        }
        totals
    }

    /// Rows that did work this run (processed, copied or fallback)
    pub fn handled(&self) -> usize {
        let t = self.totals();
        t.processed + t.copied + t.fallback
    }

    pub fn tally(&self, kind: &str) -> KindTally {
        self.kinds.get(kind).copied().unwrap_or_default()
    }

    fn log(&self) {
        for (kind, tally) in &self.kinds {
            info!(%kind, "{}", tally);
        }
        for failure in &self.failures {
            warn!(
                row = failure.index,
                url = %failure.url,
                kind = %failure.kind,
                error = %failure.error,
                "Row failed"
            );
        }
        info!(author = %self.author, "Build finished: {}", self.totals());
    }
}

/// Drives manifest rows through copying, processors or fallback records
pub struct Dispatcher<'a> {
    workspace: &'a Workspace,
    registry: &'a ProcessorRegistry,
}

impl<'a> Dispatcher<'a> {
    pub fn new(workspace: &'a Workspace, registry: &'a ProcessorRegistry) -> Self {
        Self {
            workspace,
            registry,
        }
    }

    /// Build downloads for an author.
    ///
    /// With `kind_filter`, only rows of that kind are considered and the
    /// ledger check is bypassed for them; successes are still recorded.
    #[instrument(skip(self), fields(author = %author))]
    pub async fn run(&self, author: &str, kind_filter: Option<&str>) -> Result<BuildReport> {
        let manifest = Manifest::load(&self.workspace.manifest_path(author))?;
        let downloads = self.workspace.downloads_dir(author);
        tokio::fs::create_dir_all(&downloads)
            .await
            .with_context(|| format!("Failed to create {}", downloads.display()))?;

        let mut ledger = StateLedger::open(&self.workspace.state_path(author))?;
        let filter = kind_filter
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty());
        let forced = filter.is_some();

        info!(rows = manifest.rows.len(), kind = ?filter, "Starting build");

        let mut report = BuildReport::new(author);
        for row in &manifest.rows {
            if let Some(ref kind) = filter {
                if row.kind.to_lowercase() != *kind {
                    continue;
                }
            }

            if !row.has_url() {
                info!(row = row.index, kind = %row.kind, "Skipping row with empty URL");
                report.empty_urls += 1;
                continue;
            }

            let key = row.state_key();
            if !forced && ledger.has(&key) {
                debug!(url = %row.url, "Already processed, skipping");
                report.record(row, &RowOutcome::Skipped);
                continue;
            }

            let mut outcome = match self.dispatch_row(author, row).await {
                Ok(outcome) => outcome,
                Err(e) => RowOutcome::Failed(format!("{:#}", e)),
            };

            if outcome.is_recorded() {
                if let Err(e) = ledger.put(key, LedgerEntry::from(row)) {
                    error!(url = %row.url, error = %e, "Failed to record row in ledger");
                    outcome = RowOutcome::Failed(e.to_string());
                }
            }

            report.record(row, &outcome);
        }

        report.log();
        Ok(report)
    }

    async fn dispatch_row(&self, author: &str, row: &ManifestRow) -> Result<RowOutcome> {
        let kind = row.content_kind();
        let out_dir = self.workspace.kind_dir(author, kind.as_str());
        tokio::fs::create_dir_all(&out_dir)
            .await
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;

        if !is_web_url(&row.url) {
            let source = self.workspace.resolve(&row.url);
            if source.exists() {
                let copied = copy_local(&source, &out_dir).await?;
                info!(source = %source.display(), files = copied, "Copied local content");
                return Ok(RowOutcome::Copied(copied));
            }
        }

        if kind.is_file_bucket() {
            info!(url = %row.url, "Nothing to copy for kind 'file'");
            return Ok(RowOutcome::Ignored);
        }

        let Some(processor) = self.registry.get(&kind) else {
            let path = write_fallback(&out_dir, row)?;
            info!(%kind, file = %path.display(), "No processor for kind, wrote fallback record");
            return Ok(RowOutcome::FallbackWritten(path));
        };

        let subkind = match kind.default_subkind() {
            Some(default) if row.subkind.is_empty() => default,
            _ => row.subkind.as_str(),
        };

        info!(
            url = %row.url,
            %kind,
            subkind,
            processor = processor.name(),
            "Processing"
        );
        match processor.process(&row.url, &out_dir, subkind).await {
            Ok(_) => {
                info!(url = %row.url, "Processed");
                Ok(RowOutcome::Processed)
            }
            Err(e) => {
                error!(url = %row.url, %kind, error = %e, "Processor failed");
                Ok(RowOutcome::Failed(e.to_string()))
            }
        }
    }
}

fn is_web_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Copy a file, or the regular files directly inside a directory
async fn copy_local(source: &Path, out_dir: &Path) -> Result<usize> {
    if source.is_file() {
        let name = source
            .file_name()
            .with_context(|| format!("No file name in {}", source.display()))?;
        tokio::fs::copy(source, out_dir.join(name))
            .await
            .with_context(|| format!("Failed to copy {}", source.display()))?;
        return Ok(1);
    }

    let mut copied = 0;
    let mut entries = tokio::fs::read_dir(source)
        .await
        .with_context(|| format!("Failed to list {}", source.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        tokio::fs::copy(entry.path(), out_dir.join(entry.file_name()))
            .await
            .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        copied += 1;
    }
    Ok(copied)
}

/// Record every manifest column of a row that no processor handles
fn write_fallback(out_dir: &Path, row: &ManifestRow) -> Result<PathBuf> {
    let path = out_dir.join(format!("fallback_{}.json", short_hash(&row.url)));
    write_json_atomic(&path, &row.fields)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
