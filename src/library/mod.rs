//! Resource aggregation over an author's downloads.
//!
//! # Sources
//!
//! ```text
//! authors/<author>/published_content.csv   # manifest (metadata owner)
//! downloads/<author>/
//! ├── <kind>/*.json, *.txt                  # processed content
//! ├── <blog archive>/**/*.txt               # blog posts
//! ├── file/**                               # loose files
//! └── summaries/<sha256>_summary.txt        # summary cache
//! mcp_resources/<author>/
//! ├── mcp_resource.json                     # output
//! └── pdfs/                                 # copied PDFs
//! ```

pub mod aggregator;
pub mod discovery;
pub mod enrich;
pub mod index;
pub mod processed;
pub mod schema;
pub mod summary;
pub mod tags;
pub mod urls;

pub use aggregator::Aggregator;
pub use discovery::{Discovered, DiscoveredItem, Discovery};
pub use index::{precedence, ContentIndex, Source};
pub use processed::{load_processed_content, ProcessedItem, TextDocument};
pub use schema::{resource_schema, validate_resource, validate_value, ValidationError};
pub use summary::{CommandSummarizer, Summarizer, SummaryCache, SummaryService};
pub use tags::extract_tags;
pub use urls::ArchiveUrls;
