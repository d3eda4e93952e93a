//! Archival URL rewriting.
//!
//! Without a configured base, URLs are left as they are and copied
//! artifacts get `./`-prefixed repository paths. With a base, repository
//! paths are turned into absolute URLs under it.

/// Rewrites repository paths for one author
#[derive(Debug, Clone)]
pub struct ArchiveUrls {
    base: Option<String>,
    author: String,
}

impl ArchiveUrls {
    pub fn new(base: Option<&str>, author: impl Into<String>) -> Self {
        let base = base
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(|b| {
                if b.ends_with('/') {
                    b.to_string()
                } else {
                    format!("{}/", b)
                }
            });
        Self {
            base,
            author: author.into(),
        }
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Rewrite a manifest URL or a discovered path.
    ///
    /// Web URLs and absolute paths pass through. `authors/`, `downloads/`
    /// and `mcp_resources/` paths map onto the base directly; any other
    /// relative path is taken to live under `authors/<author>/`.
    pub fn to_full_url(&self, url_or_path: &str) -> String {
        let Some(ref base) = self.base else {
            return url_or_path.to_string();
        };
        if url_or_path.is_empty() || is_absolute(url_or_path) {
            return url_or_path.to_string();
        }

        let rel = url_or_path.trim_start_matches("./");
        if ["authors/", "downloads/", "mcp_resources/"]
            .iter()
            .any(|prefix| rel.starts_with(prefix))
        {
            format!("{}{}", base, rel)
        } else {
            format!("{}authors/{}/{}", base, self.author, rel)
        }
    }

    /// URL of an artifact copied into the repository, given its
    /// workspace-relative path
    pub fn artifact_url(&self, relative_path: &str) -> String {
        let rel = relative_path.trim_start_matches("./");
        match self.base {
            Some(ref base) => format!("{}{}", base, rel),
            None => format!("./{}", rel),
        }
    }
}

fn is_absolute(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || url.starts_with('/')
}
