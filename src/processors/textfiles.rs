//! Native processor for GitHub directories of `.txt` files.
//!
//! `https://github.com/<owner>/<repo>/tree/<branch>/<path>` is listed through
//! the contents API and every `.txt` entry is downloaded into the output
//! directory under its own name.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{ProcessingError, ProcessingOutcome, Processor};

pub const GITHUB_API_BASE: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("megpt/", env!("CARGO_PKG_VERSION"));

/// One item of a contents API directory listing
#[derive(Debug, Deserialize)]
struct ContentsEntry {
    name: String,
    #[serde(default)]
    download_url: Option<String>,
}

pub struct GitHubTextFilesProcessor {
    client: reqwest::Client,
    api_base: String,
}

impl Default for GitHubTextFilesProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubTextFilesProcessor {
    pub fn new() -> Self {
        Self::with_api_base(GITHUB_API_BASE)
    }

    /// Point the processor at another contents API host
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Map a repository tree URL onto the contents API
    pub fn contents_url(&self, url: &str) -> Option<String> {
        if url.starts_with(&self.api_base) {
            return Some(url.to_string());
        }

        let rest = url
            .strip_prefix("https://github.com/")
            .or_else(|| url.strip_prefix("http://github.com/"))?;
        let mut parts = rest.trim_end_matches('/').splitn(5, '/');
        let owner = parts.next().filter(|s| !s.is_empty())?;
        let repo = parts.next().filter(|s| !s.is_empty())?;
        if parts.next()? != "tree" {
            return None;
        }
        let branch = parts.next().filter(|s| !s.is_empty())?;
        let path = parts.next().unwrap_or("");

        Some(format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.api_base, owner, repo, path, branch
        ))
    }
}

#[async_trait]
impl Processor for GitHubTextFilesProcessor {
    fn name(&self) -> &str {
        "textfiles"
    }

    async fn process(
        &self,
        url: &str,
        output_dir: &Path,
        _subkind: &str,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let api_url = self
            .contents_url(url)
            .ok_or_else(|| ProcessingError::UnsupportedUrl {
                processor: self.name().to_string(),
                url: url.to_string(),
            })?;

        debug!(%api_url, "Listing directory");
        let listing: Vec<ContentsEntry> = self
            .client
            .get(&api_url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tokio::fs::create_dir_all(output_dir).await?;

        let mut written = Vec::new();
        for entry in listing.iter().filter(|e| e.name.ends_with(".txt")) {
            let Some(ref download_url) = entry.download_url else {
                continue;
            };
            // Entry names come from a remote listing
            let Some(file_name) = Path::new(&entry.name).file_name() else {
                continue;
            };

            let body = self
                .client
                .get(download_url)
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;

            let path = output_dir.join(file_name);
            tokio::fs::write(&path, body).await?;
            info!(file = %path.display(), "Downloaded text file");
            written.push(path);
        }

        Ok(ProcessingOutcome::Files(written))
    }
}
