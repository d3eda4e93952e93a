//! Per-kind enrichment of resource entries from processor artifacts.
//!
//! Processors leave derived files next to their output:
//! - `book/<stem>.txt`, `book/<stem>_summary.txt`, `book/<stem>_extracted_<pages>.pdf`
//! - `story/<title>.pdf` or `story/<title>.txt` + `story/<title>_summary.txt`
//!
//! PDFs referenced by entries are copied into `mcp_resources/<author>/pdfs/`
//! and the entry URL is pointed at the copy.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::Workspace;
use crate::domain::{sanitize_title, word_count, ContentEntry, ContentKind, Enrichment, EntryMetadata, ManifestRow};

use super::discovery::{DiscoveredItem, SUBKIND_PRESENTATION};
use super::processed::{file_stem, TextDocument};
use super::summary::SummaryService;
use super::urls::ArchiveUrls;

pub const STATUS_NO_PDF_CONTENT: &str = "no_pdf_content";
pub const STATUS_PDF_COPIED: &str = "pdf_copied";

pub const ERR_NO_SUMMARY: &str = "No preprocessed summary found";
pub const ERR_NO_PDF_CONTENT: &str = "No preprocessed PDF content found";
pub const ERR_PDF_COPY: &str = "Failed to copy PDF to MCP resources";

const EXCERPT_LINES: usize = 3;
const EXCERPT_MIN_LINE_CHARS: usize = 50;
const EXCERPT_MAX_CHARS: usize = 500;

/// Applies enrichment strategies for one author
pub struct Enricher<'a> {
    workspace: &'a Workspace,
    author: &'a str,
    urls: &'a ArchiveUrls,
    summaries: &'a SummaryService,
}

impl<'a> Enricher<'a> {
    pub fn new(
        workspace: &'a Workspace,
        author: &'a str,
        urls: &'a ArchiveUrls,
        summaries: &'a SummaryService,
    ) -> Self {
        Self {
            workspace,
            author,
            urls,
            summaries,
        }
    }

    /// Enrich an entry built from a manifest row
    pub async fn enrich_manifest(&self, kind: &ContentKind, row: &ManifestRow, entry: &mut ContentEntry) -> Result<()> {
        match kind.enrichment() {
            Enrichment::BookPdf => self.book(row, entry).await,
            Enrichment::StoryArtifacts => self.story(row, entry).await,
            Enrichment::Presentation | Enrichment::None => Ok(()),
        }
    }

    /// Enrich an entry built from a discovered file
    pub async fn enrich_discovered(&self, item: &DiscoveredItem, entry: &mut ContentEntry) -> Result<()> {
        let presentation = item.content_kind().enrichment() == Enrichment::Presentation
            && item.subkind == SUBKIND_PRESENTATION
            && item.is_pdf();
        if presentation {
            self.presentation(item, entry).await?;
        }
        Ok(())
    }

    async fn book(&self, row: &ManifestRow, entry: &mut ContentEntry) -> Result<()> {
        let Some(filename) = pdf_file_name(&row.url) else {
            return Ok(());
        };
        let stem = &filename[..filename.len() - ".pdf".len()];
        let book_dir = self.workspace.kind_dir(self.author, ContentKind::Book.as_str());

        let Some(text) = read_trimmed(&book_dir.join(format!("{}.txt", stem))).await else {
            info!(file = %filename, "No preprocessed text for book");
            let mut metadata = EntryMetadata::default();
            metadata.processing_status = STATUS_NO_PDF_CONTENT.to_string();
            metadata.processing_errors.push(ERR_NO_PDF_CONTENT.to_string());
            entry.metadata = metadata;
            return Ok(());
        };

        let mut metadata = pdf_metadata(&text);

        match find_extracted_pdf(&book_dir, stem, &row.subkind, filename) {
            Some(pdf) => match self.copy_pdf(&pdf).await {
                Ok(url) => entry.url = url,
                Err(e) => {
                    warn!(pdf = %pdf.display(), error = %format!("{:#}", e), "Failed to copy book PDF");
                    metadata.processing_errors.push(ERR_PDF_COPY.to_string());
                }
            },
            None => warn!(file = %filename, "No extracted PDF found for book"),
        }

        match read_trimmed(&book_dir.join(format!("{}_summary.txt", stem))).await {
            Some(summary) => entry.content.summary = Some(summary),
            None => {
                warn!(title = %row.title, "No preprocessed summary for book");
                metadata.processing_errors.push(ERR_NO_SUMMARY.to_string());
            }
        }

        entry.metadata = metadata;
        Ok(())
    }

    async fn story(&self, row: &ManifestRow, entry: &mut ContentEntry) -> Result<()> {
        let story_dir = self.workspace.kind_dir(self.author, ContentKind::Story.as_str());
        let mut metadata = EntryMetadata::default();

        if story_dir.is_dir() {
            let stem = sanitize_title(&entry.title);
            let pdf = story_dir.join(format!("{}.pdf", stem));
            let text_path = story_dir.join(format!("{}.txt", stem));

            if pdf.is_file() {
                match self.copy_pdf(&pdf).await {
                    Ok(url) => {
                        entry.url = url;
                        metadata.processing_status = STATUS_PDF_COPIED.to_string();
                    }
                    Err(e) => {
                        warn!(pdf = %pdf.display(), error = %format!("{:#}", e), "Failed to copy story PDF");
                        metadata.processing_errors.push(ERR_PDF_COPY.to_string());
                    }
                }
            } else if text_path.is_file() {
                let raw = tokio::fs::read_to_string(&text_path)
                    .await
                    .with_context(|| format!("Failed to read {}", text_path.display()))?;
                let doc = TextDocument::parse(&raw);
                metadata.word_count = word_count(&doc.body);
                entry.content.text = Some(doc.body);

                if let Some(summary) = read_trimmed(&story_dir.join(format!("{}_summary.txt", stem))).await {
                    debug!(title = %row.title, "Loaded story summary");
                    entry.content.summary = Some(summary);
                }
            }
        }

        entry.metadata = metadata;
        Ok(())
    }

    async fn presentation(&self, item: &DiscoveredItem, entry: &mut ContentEntry) -> Result<()> {
        let stem = file_stem(&item.path);
        let book_dir = self.workspace.kind_dir(self.author, ContentKind::Book.as_str());
        let dirs: Vec<PathBuf> = item
            .path
            .parent()
            .map(Path::to_path_buf)
            .into_iter()
            .chain(std::iter::once(book_dir))
            .collect();

        let mut text = None;
        for dir in &dirs {
            if let Some(found) = read_trimmed(&dir.join(format!("{}.txt", stem))).await {
                text = Some(found);
                break;
            }
        }
        let Some(text) = text else {
            return Ok(());
        };

        let mut summary = None;
        for dir in &dirs {
            if let Some(found) = read_trimmed(&dir.join(format!("{}_summary.txt", stem))).await {
                summary = Some(found);
                break;
            }
        }
        if summary.is_none() {
            summary = self.summaries.summarize(&text, &entry.title).await;
        }

        info!(title = %entry.title, "Added PDF content to presentation");
        entry.metadata = EntryMetadata::with_word_count(word_count(&text));
        entry.content.text = Some(text);
        entry.content.summary = summary;
        Ok(())
    }

    /// Copy a PDF into the resource PDF directory and return its URL
    async fn copy_pdf(&self, source: &Path) -> Result<String> {
        let name = source
            .file_name()
            .with_context(|| format!("No file name in {}", source.display()))?;
        let pdf_dir = self.workspace.pdf_dir(self.author);
        tokio::fs::create_dir_all(&pdf_dir)
            .await
            .with_context(|| format!("Failed to create {}", pdf_dir.display()))?;

        let dest = pdf_dir.join(name);
        tokio::fs::copy(source, &dest)
            .await
            .with_context(|| format!("Failed to copy {} to {}", source.display(), dest.display()))?;
        info!(pdf = %dest.display(), "Copied PDF to resources");

        Ok(self.urls.artifact_url(&self.workspace.relative(&dest)))
    }
}

/// File name of a URL ending in `.pdf` (case-insensitive), query ignored
pub fn pdf_file_name(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    let is_pdf = name.len() > 4 && name.to_ascii_lowercase().ends_with(".pdf");
    is_pdf.then_some(name)
}

/// The PDF extracted for a row's page range.
///
/// Looks for `<stem>_extracted_<subkind>.pdf`, then any
/// `<stem>_extracted_*.pdf` in `dir` (first in sorted order), then `<filename>`.
pub fn find_extracted_pdf(dir: &Path, stem: &str, subkind: &str, filename: &str) -> Option<PathBuf> {
    if !subkind.is_empty() {
        let exact = dir.join(format!("{}_extracted_{}.pdf", stem, subkind));
        if exact.is_file() {
            return Some(exact);
        }
    }

    let pattern = format!(
        "{}/{}_extracted_*.pdf",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(stem)
    );
    if let Ok(paths) = glob::glob(&pattern) {
        if let Some(found) = paths.filter_map(|p| p.ok()).find(|p| p.is_file()) {
            return Some(found);
        }
    }

    let original = dir.join(filename);
    original.is_file().then_some(original)
}

/// Word/character counts and an excerpt of the first substantial lines
pub fn pdf_metadata(text: &str) -> EntryMetadata {
    let excerpt = text
        .lines()
        .map(str::trim)
        .filter(|l| l.chars().count() > EXCERPT_MIN_LINE_CHARS)
        .take(EXCERPT_LINES)
        .collect::<Vec<_>>()
        .join("\n\n");
    let excerpt = if excerpt.chars().count() > EXCERPT_MAX_CHARS {
        let cut: String = excerpt.chars().take(EXCERPT_MAX_CHARS).collect();
        format!("{}...", cut)
    } else {
        excerpt
    };

    EntryMetadata {
        word_count: word_count(text),
        character_count: Some(text.chars().count()),
        excerpt: Some(excerpt),
        ..EntryMetadata::default()
    }
}

/// Trimmed file contents; `None` when missing, unreadable or blank
async fn read_trimmed(path: &Path) -> Option<String> {
    let raw = tokio::fs::read_to_string(path).await.ok()?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_file_name() {
        assert_eq!(pdf_file_name("https://x.com/books/My_Book.pdf"), Some("My_Book.pdf"));
        assert_eq!(pdf_file_name("./authors/a/B.PDF?dl=1"), Some("B.PDF"));
        assert_eq!(pdf_file_name("https://x.com/page.html"), None);
        assert_eq!(pdf_file_name(".pdf"), None);
    }

    #[test]
    fn test_pdf_metadata_excerpt() {
        let long = "a".repeat(60);
        let text = format!("Title\n{long}\nshort line\n{long}\n{long}\n{long}\n");
        let metadata = pdf_metadata(&text);

        assert_eq!(metadata.word_count, 7);
        assert_eq!(metadata.character_count, Some(text.chars().count()));
        let excerpt = metadata.excerpt.unwrap();
        assert_eq!(excerpt, format!("{long}\n\n{long}\n\n{long}"));
    }

    #[test]
    fn test_pdf_metadata_truncates_excerpt() {
        let long = "b".repeat(300);
        let metadata = pdf_metadata(&format!("{long}\n{long}"));
        let excerpt = metadata.excerpt.unwrap();
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.chars().count(), EXCERPT_MAX_CHARS + 3);
    }

    #[test]
    fn test_find_extracted_pdf() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path();
        assert!(find_extracted_pdf(dir, "book", "", "book.pdf").is_none());

        std::fs::write(dir.join("book.pdf"), "").unwrap();
        assert_eq!(find_extracted_pdf(dir, "book", "", "book.pdf"), Some(dir.join("book.pdf")));

        std::fs::write(dir.join("book_extracted_1-10.pdf"), "").unwrap();
        std::fs::write(dir.join("book_extracted_11-20.pdf"), "").unwrap();
        assert_eq!(
            find_extracted_pdf(dir, "book", "", "book.pdf"),
            Some(dir.join("book_extracted_1-10.pdf"))
        );
        assert_eq!(
            find_extracted_pdf(dir, "book", "11-20", "book.pdf"),
            Some(dir.join("book_extracted_11-20.pdf"))
        );
        assert_eq!(
            find_extracted_pdf(dir, "book", "30-40", "book.pdf"),
            Some(dir.join("book_extracted_1-10.pdf"))
        );
    }
}
