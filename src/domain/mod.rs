//! Domain types for the archival pipeline.
//!
//! This module contains the core data structures:
//! - Kind: content kinds and the per-kind strategy table
//! - Manifest: the author's published-content CSV
//! - Resource: the aggregated MCP resource document

pub mod kind;
pub mod manifest;
pub mod resource;

// Re-export commonly used types
pub use kind::{ContentKind, Enrichment, PayloadStyle, UNKNOWN_KIND};
pub use manifest::{sanitize_title, Manifest, ManifestError, ManifestRow};
pub use resource::{
    word_count, Chapter, ContentEntry, EntryContent, EntryMetadata, McpResource,
    ProcessingStats, ResourceMetadata,
};
