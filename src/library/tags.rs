//! Closed-vocabulary tag extraction.

use std::collections::{BTreeSet, HashSet};

/// Technical terms recognised as tags
pub const VOCABULARY: &[&str] = &[
    "cloud",
    "aws",
    "azure",
    "gcp",
    "microservices",
    "devops",
    "kubernetes",
    "docker",
    "containers",
    "serverless",
    "ai",
    "ml",
    "sustainability",
    "netflix",
    "architecture",
    "platform",
    "engineering",
    "monitoring",
    "performance",
    "scaling",
    "resilience",
    "hpc",
    "podcast",
    "video",
    "machine learning",
    "artificial intelligence",
    "data science",
    "big data",
    "distributed systems",
    "cloud native",
    "infrastructure",
    "security",
    "automation",
    "ci/cd",
    "continuous integration",
    "continuous deployment",
    "agile",
    "scrum",
    "lean",
    "kanban",
    "sre",
    "site reliability",
    "observability",
    "logging",
    "metrics",
    "tracing",
    "apm",
];

const STRIP_CHARS: &[char] = &['.', ',', '!', '?', '(', ')', '[', ']', '{', '}', '"', ':', ';'];

/// Sorted, deduplicated vocabulary terms found in a title and body.
///
/// Single-word terms match whole tokens after lowercasing and stripping
/// surrounding punctuation. Multi-word terms match as case-insensitive
/// substrings of `"<title> <body>"`.
pub fn extract_tags(title: &str, body: Option<&str>) -> Vec<String> {
    let body = body.unwrap_or("");
    let combined = format!("{} {}", title, body).to_lowercase();

    let tokens: HashSet<&str> = combined
        .split_whitespace()
        .map(|w| w.trim_matches(STRIP_CHARS))
        .filter(|w| !w.is_empty())
        .collect();

    let tags: BTreeSet<&str> = VOCABULARY
        .iter()
        .copied()
        .filter(|term| {
            if term.contains(' ') {
                combined.contains(term)
            } else {
                tokens.contains(term)
            }
        })
        .collect();

    tags.into_iter().map(str::to_string).collect()
}
