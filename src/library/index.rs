//! URL-keyed index over the three content sources.

use std::collections::{HashMap, HashSet};

use crate::domain::{EntryContent, Manifest, PayloadStyle};

use super::discovery::DiscoveredItem;
use super::processed::ProcessedItem;

/// Where a url was seen, in increasing precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    Discovered,
    Processed,
    Manifest,
}

/// The source that owns a url seen by both
pub fn precedence(a: Source, b: Source) -> Source {
    a.max(b)
}

/// Which source a url belongs to, and the payloads known for it.
///
/// Manifest rows own metadata; processed content wins over discovered
/// content for the payload. Processed files only claim path urls (sidecar
/// text without a source URL); anything else a processor wrote is still
/// emitted through discovery unless a manifest row owns it. Within one
/// source the first occurrence wins.
#[derive(Debug, Default)]
pub struct ContentIndex {
    owners: HashMap<String, Source>,
    processed: Vec<ProcessedItem>,
    processed_by_url: HashMap<String, usize>,
    discovered: Vec<DiscoveredItem>,
    discovered_by_url: HashMap<String, usize>,
}

impl ContentIndex {
    pub fn build(manifest: &Manifest, processed: Vec<ProcessedItem>, discovered: Vec<DiscoveredItem>) -> Self {
        let mut index = Self::default();

        for url in manifest.urls() {
            index.claim(url, Source::Manifest);
        }

        for (i, item) in processed.iter().enumerate() {
            if let Some(ref url) = item.url {
                index.processed_by_url.entry(url.clone()).or_insert(i);
                // Output carrying its own source URL stays discoverable
                if item.path_url {
                    index.claim(url.clone(), Source::Processed);
                }
            }
        }

        for (i, item) in discovered.iter().enumerate() {
            index.discovered_by_url.entry(item.url.clone()).or_insert(i);
            index.claim(item.url.clone(), Source::Discovered);
        }

        index.processed = processed;
        index.discovered = discovered;
        index
    }

    fn claim(&mut self, url: String, source: Source) {
        self.owners
            .entry(url)
            .and_modify(|s| *s = precedence(*s, source))
            .or_insert(source);
    }

    /// Highest-precedence source that knows `url`
    pub fn owner(&self, url: &str) -> Option<Source> {
        self.owners.get(url).copied()
    }

    pub fn processed(&self, url: &str) -> Option<&ProcessedItem> {
        self.processed_by_url.get(url).map(|&i| &self.processed[i])
    }

    pub fn discovered(&self, url: &str) -> Option<&DiscoveredItem> {
        self.discovered_by_url.get(url).map(|&i| &self.discovered[i])
    }

    /// Content for a manifest url: processed first, then discovered
    pub fn payload_for(&self, url: &str, style: PayloadStyle) -> Option<(Source, EntryContent)> {
        if let Some(item) = self.processed(url) {
            return Some((Source::Processed, item.content(style)));
        }
        self.discovered(url)
            .map(|item| (Source::Discovered, item.content.clone()))
    }

    /// Discovered items no other source claims, one per url, in walk order
    pub fn discovered_only(&self) -> Vec<&DiscoveredItem> {
        let mut seen = HashSet::new();
        self.discovered
            .iter()
            .filter(|item| self.owner(&item.url) == Some(Source::Discovered))
            .filter(|item| seen.insert(item.url.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::path::{Path, PathBuf};

    fn manifest(urls: &[&str]) -> Manifest {
        let mut csv = String::from("Kind,URL\n");
        for url in urls {
            csv.push_str(&format!("medium,{url}\n"));
        }
        Manifest::from_reader(csv.as_bytes(), Path::new("m.csv")).unwrap()
    }

    fn processed(url: &str, text: &str) -> ProcessedItem {
        let mut payload = Map::new();
        payload.insert("text".into(), text.into());
        ProcessedItem {
            url: Some(url.to_string()),
            title: String::new(),
            path: PathBuf::from("p.json"),
            payload,
            path_url: false,
        }
    }

    fn sidecar(path: &str) -> ProcessedItem {
        ProcessedItem {
            path_url: true,
            ..processed(path, "sidecar text")
        }
    }

    fn discovered(url: &str, text: &str) -> DiscoveredItem {
        DiscoveredItem {
            id: format!("a_medium_{url}"),
            kind: "medium".into(),
            subkind: "blog_post".into(),
            title: "t".into(),
            source: "medium_adrianco".into(),
            url: url.to_string(),
            path: PathBuf::from(format!("{url}.txt")),
            content: EntryContent {
                text: Some(text.to_string()),
                ..EntryContent::default()
            },
            prebuilt: None,
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(precedence(Source::Discovered, Source::Manifest), Source::Manifest);
        assert_eq!(precedence(Source::Processed, Source::Discovered), Source::Processed);
        assert_eq!(precedence(Source::Processed, Source::Manifest), Source::Manifest);
    }

    #[test]
    fn test_payload_prefers_processed() {
        let index = ContentIndex::build(
            &manifest(&["u1", "u2"]),
            vec![processed("u1", "from processor")],
            vec![discovered("u1", "from walk"), discovered("u2", "walk only")],
        );

        let (source, content) = index.payload_for("u1", PayloadStyle::Text).unwrap();
        assert_eq!(source, Source::Processed);
        assert_eq!(content.text.as_deref(), Some("from processor"));

        let (source, content) = index.payload_for("u2", PayloadStyle::Text).unwrap();
        assert_eq!(source, Source::Discovered);
        assert_eq!(content.text.as_deref(), Some("walk only"));

        assert!(index.payload_for("u3", PayloadStyle::Text).is_none());
    }

    #[test]
    fn test_discovered_only_excludes_claimed_urls() {
        let index = ContentIndex::build(
            &manifest(&["u1"]),
            vec![sidecar("downloads/a/book/b.txt"), processed("u2", "x")],
            vec![
                discovered("u1", "a"),
                discovered("downloads/a/book/b.txt", "b"),
                discovered("u2", "from processor, no manifest row"),
                discovered("u3", "c"),
                discovered("u3", "duplicate"),
            ],
        );

        let only: Vec<&str> = index.discovered_only().iter().map(|d| d.url.as_str()).collect();
        assert_eq!(only, vec!["u2", "u3"]);
        assert_eq!(index.owner("u1"), Some(Source::Manifest));
        assert_eq!(index.owner("downloads/a/book/b.txt"), Some(Source::Processed));
        assert_eq!(index.owner("u2"), Some(Source::Discovered));
        assert_eq!(index.len(), 4);
    }
}
