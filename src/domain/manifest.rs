//! Author content manifest (`published_content.csv`).
//!
//! One row per published item, header `Kind,SubKind,What,Where,Published,URL`.
//! The manifest is read fresh on every run and never written.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::kind::ContentKind;

pub const COL_KIND: &str = "Kind";
pub const COL_SUBKIND: &str = "SubKind";
pub const COL_TITLE: &str = "What";
pub const COL_SOURCE: &str = "Where";
pub const COL_PUBLISHED: &str = "Published";
pub const COL_URL: &str = "URL";

/// Columns that must be present in the header
const REQUIRED_COLUMNS: [&str; 2] = [COL_KIND, COL_URL];

/// Errors that can occur while loading a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("No published_content.csv found at {0}")]
    NotFound(PathBuf),

    #[error("Manifest {path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    /// Zero-based position in the file (header excluded)
    pub index: usize,
    pub url: String,
    pub kind: String,
    pub subkind: String,
    pub title: String,
    pub source: String,
    pub published_date: String,

    /// Every column of the row, as written
    pub fields: BTreeMap<String, String>,
}

impl ManifestRow {
    /// Build a row from a header -> value map
    pub fn from_fields(index: usize, fields: BTreeMap<String, String>) -> Self {
        let get = |col: &str| fields.get(col).map(|v| v.trim().to_string()).unwrap_or_default();

        Self {
            index,
            url: get(COL_URL),
            kind: get(COL_KIND),
            subkind: get(COL_SUBKIND),
            title: get(COL_TITLE),
            source: get(COL_SOURCE),
            published_date: get(COL_PUBLISHED),
            fields,
        }
    }

    pub fn content_kind(&self) -> ContentKind {
        ContentKind::parse(&self.kind)
    }

    /// Ledger key: `"<url>_<kind>_<subkind>"`
    pub fn state_key(&self) -> String {
        format!("{}_{}_{}", self.url, self.kind, self.subkind)
    }

    pub fn has_url(&self) -> bool {
        !self.url.is_empty()
    }
}

/// File stem derived from a title, as story processors name their output.
///
/// Spaces become `_`; path separators and `:` become `-`.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '/' | '\\' | ':' => '-',
            c => c,
        })
        .collect()
}

/// A parsed manifest
#[derive(Debug, Clone)]
pub struct Manifest {
    pub path: PathBuf,
    pub rows: Vec<ManifestRow>,
}

impl Manifest {
    /// Load the manifest from disk
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound(path.to_path_buf()));
        }

        let file = std::fs::File::open(path)?;
        Self::from_reader(file, path)
    }

    /// Parse a manifest from any reader; `path` is used for error messages
    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<Self, ManifestError> {
        let csv_err = |source| ManifestError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(ManifestError::MissingColumn {
                    path: path.to_path_buf(),
                    column,
                });
            }
        }

        let mut rows = Vec::new();
        for (index, record) in rdr.records().enumerate() {
            let record = record.map_err(csv_err)?;
            let fields: BTreeMap<String, String> = headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect();
            rows.push(ManifestRow::from_fields(index, fields));
        }

        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }

    /// Distinct lowercased kinds referenced by the manifest
    pub fn kinds(&self) -> BTreeSet<String> {
        self.rows
            .iter()
            .filter(|r| !r.kind.is_empty())
            .map(|r| r.kind.to_lowercase())
            .collect()
    }

    /// Distinct non-empty URLs
    pub fn urls(&self) -> BTreeSet<String> {
        self.rows
            .iter()
            .filter(|r| r.has_url())
            .map(|r| r.url.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Kind,SubKind,What,Where,Published,URL
podcast,,Cloud Native Chat,Some Show,2023-01-02,https://example.com/ep1
book,1-10,MyBook,Self,2020,https://example.com/book.pdf
story,,Empty URL,Blog,2019,
";

    fn parse(s: &str) -> Result<Manifest, ManifestError> {
        Manifest::from_reader(s.as_bytes(), Path::new("test.csv"))
    }

    #[test]
    fn test_parse_rows() {
        let manifest = parse(SAMPLE).unwrap();
        assert_eq!(manifest.rows.len(), 3);

        let book = &manifest.rows[1];
        assert_eq!(book.index, 1);
        assert_eq!(book.kind, "book");
        assert_eq!(book.subkind, "1-10");
        assert_eq!(book.title, "MyBook");
        assert_eq!(book.source, "Self");
        assert_eq!(book.published_date, "2020");
        assert_eq!(book.url, "https://example.com/book.pdf");
        assert_eq!(book.content_kind(), ContentKind::Book);
        assert_eq!(book.fields.get("What"), Some(&"MyBook".to_string()));

        assert!(!manifest.rows[2].has_url());
    }

    #[test]
    fn test_state_key() {
        let manifest = parse(SAMPLE).unwrap();
        assert_eq!(
            manifest.rows[1].state_key(),
            "https://example.com/book.pdf_book_1-10"
        );
        assert_eq!(
            manifest.rows[0].state_key(),
            "https://example.com/ep1_podcast_"
        );
    }

    #[test]
    fn test_missing_required_column() {
        let err = parse("Kind,What\nbook,x\n").unwrap_err();
        assert!(matches!(
            err,
            ManifestError::MissingColumn { column: "URL", .. }
        ));
    }

    #[test]
    fn test_optional_columns_default_empty() {
        let manifest = parse("\u{feff}Kind,URL\nfile,./a.pdf\n").unwrap();
        let row = &manifest.rows[0];
        assert_eq!(row.kind, "file");
        assert_eq!(row.url, "./a.pdf");
        assert!(row.subkind.is_empty());
        assert!(row.title.is_empty());
    }

    #[test]
    fn test_kinds_and_urls() {
        let manifest = parse(SAMPLE).unwrap();
        let kinds: Vec<_> = manifest.kinds().into_iter().collect();
        assert_eq!(kinds, vec!["book", "podcast", "story"]);
        assert_eq!(manifest.urls().len(), 2);
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("A Tale: Part 1/2"), "A_Tale-_Part_1-2");
        assert_eq!(sanitize_title("plain"), "plain");
    }

    #[test]
    fn test_missing_file() {
        let err = Manifest::load(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
    }
}
