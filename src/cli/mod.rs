//! Command-line interface for megpt.
//!
//! Provides commands for building an author's downloads from the manifest,
//! assembling the MCP resource, and showing the resolved configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::ResolvedConfig;
use crate::core::{BuildReport, Dispatcher};
use crate::library::Aggregator;
use crate::processors::ProcessorRegistry;

/// Environment variable holding the log filter (`RUST_LOG` syntax)
pub const LOG_ENV: &str = "MEGPT_LOG";

const DEFAULT_LOG_FILTER: &str = "info";

/// Log filter from a directive string; blank or invalid falls back to `info`
pub fn log_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// megpt - per-author content archive builder
#[derive(Parser, Debug)]
#[command(name = "megpt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Workspace root holding authors/, downloads/ and mcp_resources/
    #[arg(long, global = true, default_value = ".", env = "MEGPT_ROOT")]
    pub root: PathBuf,

    /// Config file (defaults to <root>/megpt.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download and process every manifest row of an author
    Build {
        /// Author directory name under authors/
        author: String,

        /// Only rows of this kind, reprocessing them even if already done
        kind: Option<String>,
    },

    /// Assemble mcp_resources/<author>/mcp_resource.json
    #[command(name = "create-mcp", alias = "create_mcp")]
    CreateMcp {
        /// Author directory name under authors/
        author: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let root = if self.root.is_absolute() {
            self.root.clone()
        } else {
            std::env::current_dir()
                .context("Failed to determine current directory")?
                .join(&self.root)
        };
        let config = ResolvedConfig::load(&root, self.config.as_deref())?;

        match self.command {
            Commands::Build { author, kind } => build(&config, &author, kind.as_deref()).await,
            Commands::CreateMcp { author } => create_mcp(&config, &author).await,
            Commands::Config => show_config(&config),
        }
    }
}

async fn build(config: &ResolvedConfig, author: &str, kind: Option<&str>) -> Result<()> {
    let registry = ProcessorRegistry::from_config(config)?;
    let report = Dispatcher::new(&config.workspace, &registry)
        .run(author, kind)
        .await?;

    print_report(&report);
    Ok(())
}

async fn create_mcp(config: &ResolvedConfig, author: &str) -> Result<()> {
    let registry = ProcessorRegistry::from_config(config)?;
    let path = Aggregator::new(config, &registry).create(author).await?;

    println!("MCP resource written to {}", path.display());
    Ok(())
}

fn print_report(report: &BuildReport) {
    println!("Build for {}", report.author);
    for (kind, tally) in &report.kinds {
        println!("  {:<18} {}", kind, tally);
    }
    if report.empty_urls > 0 {
        println!("  {:<18} {}", "(no url)", report.empty_urls);
    }
    println!("  {:<18} {}", "total", report.totals());

    if !report.failures.is_empty() {
        println!();
        println!("Failures:");
        for failure in &report.failures {
            println!(
                "  row {} [{}] {}: {}",
                failure.index, failure.kind, failure.url, failure.error
            );
        }
    }
}

fn show_config(config: &ResolvedConfig) -> Result<()> {
    let ws = &config.workspace;
    let registry = ProcessorRegistry::from_config(config)?;

    println!("megpt configuration");
    println!();
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Root:       {}", ws.root.display());
    println!("  Authors:    {}", ws.authors.display());
    println!("  Downloads:  {}", ws.downloads.display());
    println!("  Resources:  {}", ws.resources.display());
    println!("  Processors: {}", ws.processors.display());
    println!();
    println!(
        "Archive base URL: {}",
        config.archive_base_url.as_deref().unwrap_or("(none)")
    );
    println!();
    println!("Processors:");
    for kind in registry.kinds() {
        if let Some(processor) = registry.get(kind) {
            println!("  {:<18} {}", kind, processor.name());
        }
    }
    println!();
    println!("Blog archives:");
    for (dir, kind) in &config.blog_archives {
        println!("  {} -> {}", dir, kind);
    }
    println!("File bucket: {}", config.file_bucket);
    println!();
    println!(
        "Summarizer: {}",
        config
            .summarizer
            .command
            .as_ref()
            .map(|c| c.join(" "))
            .unwrap_or_else(|| "(none)".to_string())
    );

    Ok(())
}
