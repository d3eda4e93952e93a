//! megpt - per-author content archive builder
//!
//! Turns an author's published-content manifest into local downloads and
//! then into a single validated MCP resource document.
//!
//! # Pipeline
//!
//! - Build: each manifest row is copied (local paths), handed to the
//!   processor registered for its kind, or recorded as a fallback JSON.
//!   A per-author ledger makes repeated builds idempotent.
//! - Aggregate: processed output, a recursive walk of the downloads tree and
//!   the manifest are merged by URL, enriched per kind, tagged, summarised
//!   and validated against a fixed JSON Schema.
//!
//! # Modules
//!
//! - `config`: workspace layout and the optional `megpt.yaml`
//! - `domain`: manifest rows, content kinds, resource entries
//! - `core`: ledger and build dispatcher
//! - `processors`: per-kind processor registry (scripts, GitHub text files)
//! - `library`: resource aggregation
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Build downloads for an author
//! megpt build virtual_adrianco
//!
//! # Re-run every podcast row
//! megpt build virtual_adrianco podcast
//!
//! # Assemble mcp_resources/virtual_adrianco/mcp_resource.json
//! megpt create-mcp virtual_adrianco
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod library;
pub mod processors;

// Re-export main types at crate root for convenience
pub use config::{ResolvedConfig, Workspace};
pub use core::{BuildReport, Dispatcher, StateLedger};
pub use domain::{ContentEntry, ContentKind, Manifest, ManifestRow, McpResource};
pub use library::Aggregator;
pub use processors::{Processor, ProcessorRegistry};
