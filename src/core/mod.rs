//! Core build logic.
//!
//! This module contains:
//! - Ledger: processing-state store with atomic persistence
//! - Dispatcher: manifest rows -> copies, processors or fallback records
//! - Hashing: cache keys and synthetic ids

pub mod dispatcher;
pub mod hashing;
pub mod ledger;

// Re-export commonly used types
pub use dispatcher::{BuildReport, Dispatcher, KindTally, RowFailure, RowOutcome};
pub use hashing::{content_hash, short_hash};
pub use ledger::{write_json_atomic, LedgerEntry, LedgerError, StateLedger};
