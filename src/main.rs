//! megpt binary: logs go to stderr, reports to stdout

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use megpt::cli::{log_filter, Cli, LOG_ENV};

#[tokio::main]
async fn main() -> Result<()> {
    let directive = std::env::var(LOG_ENV).ok();
    tracing_subscriber::registry()
        .with(log_filter(directive.as_deref()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    Cli::parse().execute().await
}
