//! Content kinds and their per-kind strategy table.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Name used for rows whose `Kind` column is blank
pub const UNKNOWN_KIND: &str = "unknown";

/// Kind of published content.
///
/// Parsed case-insensitively from the manifest `Kind` column. Unknown kinds
/// are kept verbatim (lowercased) so they still get an output directory
/// and a fallback record; a blank kind becomes [`UNKNOWN_KIND`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentKind {
    Podcast,
    YouTube,
    YouTubePlaylist,
    Book,
    Story,
    File,
    Medium,
    Blogger,
    TextFiles,
    Other(String),
}

/// Shape of the content payload for a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadStyle {
    /// `transcript` + `chapters` (+ generated summary)
    Transcript,

    /// `text` (+ generated summary)
    Text,
}

/// Enrichment applied to entries of a kind during aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrichment {
    /// Copy the extracted PDF, load the preprocessed text and summary
    BookPdf,

    /// Copy a rendered page PDF, or load the extracted text and summary
    StoryArtifacts,

    /// PDF presentations in the file bucket get text and summary
    Presentation,

    None,
}

impl ContentKind {
    /// Parse a kind name (case-insensitive, surrounding whitespace ignored)
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "podcast" => Self::Podcast,
            "youtube" => Self::YouTube,
            "youtube_playlist" => Self::YouTubePlaylist,
            "book" => Self::Book,
            "story" => Self::Story,
            "file" => Self::File,
            "medium" => Self::Medium,
            "blogger" => Self::Blogger,
            "textfiles" => Self::TextFiles,
            "" => Self::Other(UNKNOWN_KIND.to_string()),
            other => Self::Other(other.to_string()),
        }
    }

    /// Canonical lowercase name, also the output subdirectory name
    pub fn as_str(&self) -> &str {
        match self {
            Self::Podcast => "podcast",
            Self::YouTube => "youtube",
            Self::YouTubePlaylist => "youtube_playlist",
            Self::Book => "book",
            Self::Story => "story",
            Self::File => "file",
            Self::Medium => "medium",
            Self::Blogger => "blogger",
            Self::TextFiles => "textfiles",
            Self::Other(name) => name,
        }
    }

    pub fn payload_style(&self) -> PayloadStyle {
        match self {
            Self::Podcast | Self::YouTube | Self::YouTubePlaylist => PayloadStyle::Transcript,
            _ => PayloadStyle::Text,
        }
    }

    /// Subkind handed to the processor when the manifest leaves it empty
    pub fn default_subkind(&self) -> Option<&'static str> {
        match self {
            Self::Podcast => Some("episode"),
            _ => None,
        }
    }

    pub fn enrichment(&self) -> Enrichment {
        match self {
            Self::Book => Enrichment::BookPdf,
            Self::Story => Enrichment::StoryArtifacts,
            Self::File => Enrichment::Presentation,
            _ => Enrichment::None,
        }
    }

    /// Manifest rows of this kind are represented by the file bucket walk
    pub fn is_file_bucket(&self) -> bool {
        matches!(self, Self::File)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for ContentKind {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}
