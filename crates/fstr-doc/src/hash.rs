#![forbid(unsafe_code)]

//! Short content hashes for change detection.

use sha2::{Digest, Sha256};

/// Bytes of the SHA-256 digest kept in a content hash.
pub const HASH_BYTES: usize = 8;

/// Lower-case hex of the first [`HASH_BYTES`] bytes of SHA-256 over the
/// UTF-8 text.
///
/// Advisory only: readers never validate it.
#[must_use]
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex_encode(&hasher.finalize()[..HASH_BYTES])
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
