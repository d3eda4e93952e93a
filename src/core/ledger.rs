//! Processing-state ledger with atomic file persistence.
//!
//! The ledger is a JSON object mapping `"<url>_<kind>_<subkind>"` to the
//! original `{url, kind, subkind}`. Presence of a key means the manifest row
//! has been handled. Every `put` rewrites the whole file through a temp file
//! and a rename, so a crash leaves either the old or the new ledger.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::domain::ManifestRow;

/// Errors that can occur with the ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger {0} is locked by another build")]
    Locked(PathBuf),

    #[error("Failed to parse ledger {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to replace ledger: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// A recorded manifest row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub url: String,
    pub kind: String,
    pub subkind: String,
}

impl From<&ManifestRow> for LedgerEntry {
    fn from(row: &ManifestRow) -> Self {
        Self {
            url: row.url.clone(),
            kind: row.kind.clone(),
            subkind: row.subkind.clone(),
        }
    }
}

/// File-backed key-value store of processed rows.
///
/// Holds an exclusive advisory lock on `<ledger>.lock` for its lifetime so
/// two builds of the same author cannot interleave ledger rewrites.
pub struct StateLedger {
    path: PathBuf,
    entries: BTreeMap<String, LedgerEntry>,
    _lock: File,
}

impl StateLedger {
    /// Open (or create empty) the ledger at `path` and take its lock
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock_path = lock_path(path);
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;
        lock.try_lock_exclusive()
            .map_err(|_| LedgerError::Locked(path.to_path_buf()))?;

        let entries = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|source| LedgerError::Corrupt {
                    path: path.to_path_buf(),
                    source,
                })?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a key has been recorded
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&LedgerEntry> {
        self.entries.get(key)
    }

    /// Record a key and persist the ledger immediately
    pub fn put(&mut self, key: impl Into<String>, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.entries.insert(key.into(), entry);
        self.persist()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LedgerEntry)> {
        self.entries.iter()
    }

    fn persist(&self) -> Result<(), LedgerError> {
        write_json_atomic(&self.path, &self.entries)
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

/// Write pretty JSON to `path` via a sibling temp file and rename
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), LedgerError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    Ok(())
}
