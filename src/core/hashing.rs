//! Content hashes used for cache keys and synthetic ids.

use sha2::{Digest, Sha256};

/// Full SHA-256 of `input` as lowercase hex
pub fn content_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// First 8 hex chars (4 bytes) of the SHA-256 of `input`
pub fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(&hasher.finalize()[..4])
}
