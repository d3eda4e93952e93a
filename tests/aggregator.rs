//! Resource Aggregator Integration Tests
//!
//! End-to-end runs over temporary workspaces: dedup between the manifest
//! and the walk, book and story enrichment, schema validity of the written
//! resource, and the automatic build when downloads are missing.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use megpt::config::ResolvedConfig;
use megpt::domain::McpResource;
use megpt::library::{validate_value, Aggregator, Summarizer};
use megpt::processors::ProcessorRegistry;
use tempfile::TempDir;

/// Summarizer returning a fixed prefix plus the first word
struct StubSummarizer;

#[async_trait]
impl Summarizer for StubSummarizer {
    fn name(&self) -> &str {
        "stub"
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        Ok(format!(
            "summary of {}",
            text.split_whitespace().next().unwrap_or("nothing")
        ))
    }
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn setup(manifest_rows: &[&str]) -> (TempDir, ResolvedConfig) {
    let temp = TempDir::new().unwrap();
    let config = ResolvedConfig::defaults(temp.path());
    let mut csv = String::from("Kind,SubKind,What,Where,Published,URL\n");
    for row in manifest_rows {
        csv.push_str(row);
        csv.push('\n');
    }
    write(&config.workspace.manifest_path("alice"), &csv);
    (temp, config)
}

fn read_resource(path: &Path) -> (serde_json::Value, McpResource) {
    let raw = std::fs::read_to_string(path).unwrap();
    (
        serde_json::from_str(&raw).unwrap(),
        serde_json::from_str(&raw).unwrap(),
    )
}

#[tokio::test]
async fn test_book_end_to_end() {
    let (_temp, config) = setup(&["book,1-10,MyBook,Self,2020,https://example.com/books/book.pdf"]);
    let ws = &config.workspace;
    let book_dir = ws.kind_dir("alice", "book");
    let long_line = "Cloud architecture needs resilience engineering at every single layer.";
    write(&book_dir.join("book_extracted_1-10.pdf"), "%PDF-1.4");
    write(&book_dir.join("book.txt"), &format!("{long_line}\nshort\n"));
    write(&book_dir.join("book_summary.txt"), "A book about clouds.\n");

    let registry = ProcessorRegistry::new();
    let path = Aggregator::new(&config, &registry)
        .with_summarizer(None)
        .create("alice")
        .await
        .unwrap();

    let (raw, resource) = read_resource(&path);
    validate_value(&raw).unwrap();

    assert_eq!(resource.content.len(), 1);
    let entry = &resource.content[0];
    assert_eq!(entry.id, "alice_book_0");
    assert_eq!(entry.kind, "book");
    assert_eq!(entry.title, "MyBook");
    assert_eq!(entry.url, "./mcp_resources/alice/pdfs/book_extracted_1-10.pdf");
    assert_eq!(entry.content.summary.as_deref(), Some("A book about clouds."));
    assert_eq!(entry.metadata.processing_status, "success");
    assert!(entry.metadata.processing_errors.is_empty());
    assert_eq!(entry.metadata.excerpt.as_deref(), Some(long_line));
    assert_eq!(entry.metadata.word_count, 10);

    assert!(ws.pdf_dir("alice").join("book_extracted_1-10.pdf").exists());
    assert_eq!(resource.metadata.content_types.get("book"), Some(&1));
    assert_eq!(resource.metadata.processing_stats.failed_items, 0);
}

#[tokio::test]
async fn test_book_page_ranges_resolve_to_their_own_pdfs() {
    let (_temp, config) = setup(&[
        "book,1-10,Part One,Self,2020,https://example.com/books/book.pdf",
        "book,11-20,Part Two,Self,2020,https://example.com/books/book.pdf",
    ]);
    let book_dir = config.workspace.kind_dir("alice", "book");
    write(&book_dir.join("book_extracted_1-10.pdf"), "%PDF-a");
    write(&book_dir.join("book_extracted_11-20.pdf"), "%PDF-b");
    write(&book_dir.join("book.txt"), "Some book text");
    write(&book_dir.join("book_summary.txt"), "About the book.");

    let registry = ProcessorRegistry::new();
    let resource = Aggregator::new(&config, &registry)
        .with_summarizer(None)
        .assemble("alice")
        .await
        .unwrap();

    let urls: Vec<(&str, &str)> = resource
        .content
        .iter()
        .map(|e| (e.id.as_str(), e.url.as_str()))
        .collect();
    assert_eq!(
        urls,
        vec![
            ("alice_book_0", "./mcp_resources/alice/pdfs/book_extracted_1-10.pdf"),
            ("alice_book_1", "./mcp_resources/alice/pdfs/book_extracted_11-20.pdf"),
        ]
    );
}

#[tokio::test]
async fn test_processor_entries_without_manifest_rows_are_kept() {
    let (_temp, config) = setup(&[
        "youtube_playlist,,My Playlist,YouTube,2021,https://youtube.com/playlist?list=PL1",
    ]);
    let dir = config.workspace.kind_dir("alice", "youtube_playlist");
    for (file, video) in [("a.json", "A"), ("b.json", "B")] {
        write(
            &dir.join(file),
            &serde_json::json!({
                "id": format!("alice_youtube_{video}"),
                "kind": "youtube",
                "subkind": "video",
                "title": format!("Video {video}"),
                "url": format!("https://youtube.com/watch?v={video}"),
                "content": {"transcript": "talking about docker"}
            })
            .to_string(),
        );
    }
    write(
        &dir.join("c.json"),
        r#"{"URL": "https://youtube.com/watch?v=C", "transcript": "legacy output"}"#,
    );

    let registry = ProcessorRegistry::new();
    let resource = Aggregator::new(&config, &registry)
        .with_summarizer(None)
        .assemble("alice")
        .await
        .unwrap();

    let urls: Vec<&str> = resource.content.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://youtube.com/playlist?list=PL1",
            "https://youtube.com/watch?v=A",
            "https://youtube.com/watch?v=B",
            "https://youtube.com/watch?v=C",
        ]
    );

    let video = &resource.content[1];
    assert_eq!(video.id, "alice_youtube_A");
    assert_eq!(video.kind, "youtube");
    assert_eq!(video.title, "Video A");
    assert_eq!(video.tags, vec!["docker", "video"]);
    assert_eq!(resource.content[3].content.transcript.as_deref(), Some("legacy output"));
}

#[tokio::test]
async fn test_unreadable_files_count_as_failures() {
    let (_temp, config) = setup(&["podcast,,Ep,Show,2023,https://example.com/ep"]);
    let dir = config.workspace.kind_dir("alice", "podcast");
    write(&dir.join("broken.json"), "{\"URL\": ");
    write(&dir.join("ep.json"), r#"{"URL": "https://example.com/ep", "transcript": "hi"}"#);

    let registry = ProcessorRegistry::new();
    let resource = Aggregator::new(&config, &registry)
        .with_summarizer(None)
        .assemble("alice")
        .await
        .unwrap();

    assert_eq!(resource.content.len(), 1);
    assert_eq!(resource.content[0].content.transcript.as_deref(), Some("hi"));
    assert_eq!(resource.metadata.processing_stats.failed_items, 1);
}

#[tokio::test]
async fn test_book_without_preprocessed_text() {
    let (_temp, config) = setup(&["book,,Unread,Self,2020,https://example.com/unread.pdf"]);
    write(&config.workspace.kind_dir("alice", "book").join("other.txt"), "x");

    let registry = ProcessorRegistry::new();
    let resource = Aggregator::new(&config, &registry)
        .with_summarizer(None)
        .assemble("alice")
        .await
        .unwrap();

    let entry = resource.content.iter().find(|e| e.kind == "book" && e.title == "Unread").unwrap();
    assert_eq!(entry.url, "https://example.com/unread.pdf");
    assert_eq!(entry.metadata.processing_status, "no_pdf_content");
    assert_eq!(
        entry.metadata.processing_errors,
        vec!["No preprocessed PDF content found"]
    );
}

#[tokio::test]
async fn test_one_entry_per_url_across_sources() {
    let (_temp, config) = setup(&[
        "podcast,,Kubernetes and Microservices at Netflix,Show,2023,https://example.com/ep1",
        "medium,,Post,Medium,2019,https://medium.com/p/1",
    ]);
    let ws = &config.workspace;
    write(
        &ws.kind_dir("alice", "podcast").join("ep1.json"),
        r#"{"URL": "https://example.com/ep1", "transcript": "we talk", "chapters": [{"title": "Intro", "timestamp": "00:00"}]}"#,
    );
    write(
        &ws.kind_dir("alice", "medium_adrianco").join("post.txt"),
        "https://medium.com/p/1\nA post body",
    );
    write(
        &ws.kind_dir("alice", "medium_adrianco").join("extra_post.txt"),
        "https://medium.com/p/2\nAnother body",
    );
    write(&ws.kind_dir("alice", "file").join("deck.pptx"), "pptx");

    let registry = ProcessorRegistry::new();
    let resource = Aggregator::new(&config, &registry)
        .with_summarizer(Some(Arc::new(StubSummarizer)))
        .assemble("alice")
        .await
        .unwrap();

    let urls: Vec<&str> = resource.content.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://example.com/ep1",
            "https://medium.com/p/1",
            "downloads/alice/file/deck.pptx",
            "https://medium.com/p/2",
        ]
    );

    let podcast = &resource.content[0];
    assert_eq!(podcast.tags, vec!["kubernetes", "microservices", "netflix"]);
    assert_eq!(podcast.content.transcript.as_deref(), Some("we talk"));
    assert_eq!(podcast.content.chapters.len(), 1);
    assert_eq!(podcast.content.summary.as_deref(), Some("summary of we"));
    assert_eq!(podcast.metadata.word_count, 2);

    let medium = &resource.content[1];
    assert_eq!(medium.title, "Post");
    assert_eq!(medium.content.text.as_deref(), Some("A post body"));

    let deck = &resource.content[2];
    assert_eq!(deck.kind, "file");
    assert_eq!(deck.subkind, "presentation");
    assert_eq!(deck.title, "deck");

    // Summaries land in the cache
    let cache = ws.summary_cache_dir("alice");
    assert!(std::fs::read_dir(cache).unwrap().count() >= 2);
}

#[tokio::test]
async fn test_story_pdf_and_text() {
    let (_temp, config) = setup(&[
        "story,,My Story: Part 1,Blog,2018,https://example.com/story1",
        "story,,Second Tale,Blog,2018,https://example.com/story2",
    ]);
    let story_dir = config.workspace.kind_dir("alice", "story");
    write(&story_dir.join("My_Story-_Part_1.pdf"), "%PDF");
    write(&story_dir.join("Second_Tale.txt"), "Once upon a cloud");
    write(&story_dir.join("Second_Tale_summary.txt"), "A short tale.");

    let registry = ProcessorRegistry::new();
    let resource = Aggregator::new(&config, &registry)
        .with_summarizer(None)
        .assemble("alice")
        .await
        .unwrap();

    let first = &resource.content[0];
    assert_eq!(first.url, "./mcp_resources/alice/pdfs/My_Story-_Part_1.pdf");
    assert_eq!(first.metadata.processing_status, "pdf_copied");

    let second = resource
        .content
        .iter()
        .find(|e| e.title == "Second Tale")
        .unwrap();
    assert_eq!(second.url, "https://example.com/story2");
    assert_eq!(second.content.text.as_deref(), Some("Once upon a cloud"));
    assert_eq!(second.content.summary.as_deref(), Some("A short tale."));
    assert_eq!(second.metadata.word_count, 4);
    assert_eq!(second.tags, vec!["cloud"]);
}

#[tokio::test]
async fn test_presentation_pdf_enrichment() {
    let (_temp, config) = setup(&[]);
    let ws = &config.workspace;
    write(&ws.kind_dir("alice", "file").join("talk.pdf"), "%PDF");
    write(&ws.kind_dir("alice", "book").join("talk.txt"), "Serverless at scale");

    let registry = ProcessorRegistry::new();
    let resource = Aggregator::new(&config, &registry)
        .with_summarizer(Some(Arc::new(StubSummarizer)))
        .assemble("alice")
        .await
        .unwrap();

    let talk = resource
        .content
        .iter()
        .find(|e| e.url == "downloads/alice/file/talk.pdf")
        .unwrap();
    assert_eq!(talk.content.text.as_deref(), Some("Serverless at scale"));
    assert_eq!(talk.content.summary.as_deref(), Some("summary of Serverless"));
    assert_eq!(talk.metadata.word_count, 3);
    assert_eq!(talk.tags, vec!["serverless"]);
}

#[tokio::test]
async fn test_archive_base_url_rewrites_paths() {
    let (_temp, mut config) = setup(&[]);
    config.archive_base_url = Some("https://example.org/repo/".to_string());
    write(&config.workspace.kind_dir("alice", "file").join("notes.docx"), "doc");

    let registry = ProcessorRegistry::new();
    let resource = Aggregator::new(&config, &registry)
        .with_summarizer(None)
        .assemble("alice")
        .await
        .unwrap();

    assert_eq!(resource.content.len(), 1);
    assert_eq!(
        resource.content[0].url,
        "https://example.org/repo/downloads/alice/file/notes.docx"
    );
    assert_eq!(resource.content[0].subkind, "document");
}

#[tokio::test]
async fn test_missing_downloads_trigger_build() {
    let (_temp, config) = setup(&["talk,,Keynote,QCon,2019,https://example.com/keynote"]);
    let ws = &config.workspace;
    assert!(!ws.downloads_dir("alice").exists());

    let registry = ProcessorRegistry::new();
    let path = Aggregator::new(&config, &registry)
        .with_summarizer(None)
        .create("alice")
        .await
        .unwrap();

    assert!(ws.state_path("alice").exists());
    let (_, resource) = read_resource(&path);
    assert_eq!(resource.content.len(), 1);
    let entry = &resource.content[0];
    assert_eq!(entry.url, "https://example.com/keynote");
    assert_eq!(entry.kind, "talk");
    assert_eq!(entry.title, "Keynote");
}

#[tokio::test]
async fn test_missing_manifest_fails() {
    let temp = TempDir::new().unwrap();
    let config = ResolvedConfig::defaults(temp.path());
    let registry = ProcessorRegistry::new();

    let result = Aggregator::new(&config, &registry).create("nobody").await;
    assert!(result.is_err());
    assert!(!config.workspace.resource_path("nobody").exists());
}
