//! Resource aggregator: downloads + manifest -> `mcp_resource.json`.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{error, info, instrument, warn};

use crate::config::ResolvedConfig;
use crate::core::{write_json_atomic, Dispatcher};
use crate::domain::{ContentEntry, ContentKind, EntryMetadata, Manifest, ManifestRow, McpResource};
use crate::processors::ProcessorRegistry;

use super::discovery::{DiscoveredItem, Discovery};
use super::enrich::Enricher;
use super::index::ContentIndex;
use super::processed::load_processed_content;
use super::schema::validate_resource;
use super::summary::{CommandSummarizer, Summarizer, SummaryCache, SummaryService};
use super::tags::extract_tags;
use super::urls::ArchiveUrls;

const UNTITLED: &str = "Untitled";

/// Builds, validates and writes one author's resource
pub struct Aggregator<'a> {
    config: &'a ResolvedConfig,
    registry: &'a ProcessorRegistry,
    summarizer: Option<Arc<dyn Summarizer>>,
}

/// Everything an entry builder needs for one run
struct RunContext<'r> {
    author: &'r str,
    index: &'r ContentIndex,
    urls: &'r ArchiveUrls,
    summaries: &'r SummaryService,
    enricher: Enricher<'r>,
}

impl<'a> Aggregator<'a> {
    /// Aggregator using the configured summarizer command, if any
    pub fn new(config: &'a ResolvedConfig, registry: &'a ProcessorRegistry) -> Self {
        let summarizer = CommandSummarizer::from_settings(&config.summarizer)
            .map(|s| Arc::new(s) as Arc<dyn Summarizer>);
        Self {
            config,
            registry,
            summarizer,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Option<Arc<dyn Summarizer>>) -> Self {
        self.summarizer = summarizer;
        self
    }

    /// Build, validate and write the resource; returns the output path
    #[instrument(skip(self), fields(author = %author))]
    pub async fn create(&self, author: &str) -> Result<PathBuf> {
        self.ensure_downloads(author).await?;

        let resource = self.assemble(author).await?;
        validate_resource(&resource)?;
        let path = self.save(author, &resource)?;

        let stats = &resource.metadata.processing_stats;
        info!(
            path = %path.display(),
            entries = resource.metadata.content_count,
            failed = stats.failed_items,
            seconds = stats.processing_time,
            "Resource written"
        );
        for (kind, count) in &resource.metadata.content_types {
            info!(%kind, count, "Content type");
        }
        Ok(path)
    }

    /// Run the dispatcher when the author has no downloads yet
    pub async fn ensure_downloads(&self, author: &str) -> Result<()> {
        let dir = self.config.workspace.downloads_dir(author);
        let empty = match std::fs::read_dir(&dir) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        };

        if empty {
            info!(dir = %dir.display(), "No downloads found, running build");
            Dispatcher::new(&self.config.workspace, self.registry)
                .run(author, None)
                .await?;
        } else {
            info!("Downloads found, skipping build");
        }
        Ok(())
    }

    /// Assemble the resource in memory
    pub async fn assemble(&self, author: &str) -> Result<McpResource> {
        let started = Instant::now();
        let workspace = &self.config.workspace;
        let manifest = Manifest::load(&workspace.manifest_path(author))?;

        let mut processed = Vec::new();
        for kind in manifest.kinds() {
            processed.extend(load_processed_content(workspace, author, &kind));
        }
        let discovered = Discovery::new(self.config, author).discover();
        info!(
            rows = manifest.rows.len(),
            processed = processed.len(),
            discovered = discovered.items.len(),
            unreadable = discovered.failed.len(),
            "Loaded content sources"
        );

        let index = ContentIndex::build(&manifest, processed, discovered.items);
        let urls = ArchiveUrls::new(self.config.archive_base_url.as_deref(), author);
        let summaries = SummaryService::new(
            SummaryCache::new(workspace.summary_cache_dir(author)),
            self.summarizer.clone(),
            self.config.summarizer.chunk_chars,
        );
        let ctx = RunContext {
            author,
            index: &index,
            urls: &urls,
            summaries: &summaries,
            enricher: Enricher::new(workspace, author, &urls, &summaries),
        };

        let mut resource = McpResource::new(author);
        let mut emitted: HashSet<String> = HashSet::new();
        for _ in &discovered.failed {
            resource.record_failure();
        }

        for row in &manifest.rows {
            if !row.has_url() || row.content_kind().is_file_bucket() {
                continue;
            }
            match manifest_entry(&ctx, row).await {
                Ok(entry) => push_unique(&mut resource, &mut emitted, entry),
                Err(e) => {
                    error!(url = %row.url, error = %format!("{:#}", e), "Failed to build entry");
                    resource.record_failure();
                }
            }
        }

        for item in index.discovered_only() {
            match discovered_entry(&ctx, item).await {
                Ok(entry) => push_unique(&mut resource, &mut emitted, entry),
                Err(e) => {
                    error!(file = %item.path.display(), error = %format!("{:#}", e), "Failed to build discovered entry");
                    resource.record_failure();
                }
            }
        }

        resource.finish(started.elapsed().as_secs_f64());
        Ok(resource)
    }

    /// Write the resource atomically to `mcp_resources/<author>/mcp_resource.json`
    pub fn save(&self, author: &str, resource: &McpResource) -> Result<PathBuf> {
        let path = self.config.workspace.resource_path(author);
        write_json_atomic(&path, resource)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

fn push_unique(resource: &mut McpResource, emitted: &mut HashSet<String>, entry: ContentEntry) {
    if emitted.insert(entry.url.clone()) {
        resource.push(entry);
    } else {
        warn!(url = %entry.url, id = %entry.id, "Duplicate URL, entry dropped");
    }
}

async fn manifest_entry(ctx: &RunContext<'_>, row: &ManifestRow) -> Result<ContentEntry> {
    let discovered = ctx.index.discovered(&row.url);
    let kind = match (row.kind.is_empty(), discovered) {
        (true, Some(item)) => item.content_kind(),
        _ => row.content_kind(),
    };
    let title = if !row.title.is_empty() {
        row.title.clone()
    } else {
        discovered
            .map(|d| d.title.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string())
    };

    let mut entry = ContentEntry {
        id: format!("{}_{}_{}", ctx.author, kind, row.index),
        kind: kind.as_str().to_string(),
        subkind: row.subkind.clone(),
        title,
        source: row.source.clone(),
        published_date: row.published_date.clone(),
        url: ctx.urls.to_full_url(&row.url),
        content: Default::default(),
        tags: Vec::new(),
        metadata: EntryMetadata::default(),
    };

    if let Some((_, mut content)) = ctx.index.payload_for(&row.url, kind.payload_style()) {
        if content.summary.is_none() {
            let summary = match content.body() {
                Some(body) => ctx.summaries.summarize(body, &entry.title).await,
                None => None,
            };
            content.summary = summary;
        }
        entry.metadata = EntryMetadata::with_word_count(content.word_count());
        entry.content = content;
    }

    ctx.enricher.enrich_manifest(&kind, row, &mut entry).await?;
    entry.tags = extract_tags(&entry.title, entry.content.body());
    Ok(entry)
}

async fn discovered_entry(ctx: &RunContext<'_>, item: &DiscoveredItem) -> Result<ContentEntry> {
    if let Some(ref prebuilt) = item.prebuilt {
        let mut entry = (**prebuilt).clone();
        entry.url = ctx.urls.to_full_url(&item.url);
        if entry.title.is_empty() {
            entry.title = UNTITLED.to_string();
        }
        if entry.tags.is_empty() {
            entry.tags = extract_tags(&entry.title, entry.content.body());
        }
        return Ok(entry);
    }

    let title = if item.title.is_empty() {
        UNTITLED.to_string()
    } else {
        item.title.clone()
    };
    let mut entry = ContentEntry {
        id: item.id.clone(),
        kind: ContentKind::parse(&item.kind).as_str().to_string(),
        subkind: item.subkind.clone(),
        title,
        source: item.source.clone(),
        published_date: String::new(),
        url: ctx.urls.to_full_url(&item.url),
        content: item.content.clone(),
        tags: Vec::new(),
        metadata: EntryMetadata::with_word_count(item.content.word_count()),
    };

    ctx.enricher.enrich_discovered(item, &mut entry).await?;
    entry.tags = extract_tags(&entry.title, entry.content.body());
    Ok(entry)
}
