//! Content hashing for field identity.
//!
//! Field values are identified across edits by a SHA-256 digest of
//! their raw bytes. The hex form is 64 characters, which the schema
//! enforces with a CHECK constraint.

use sha2::{Digest, Sha256};

/// Length of a hex-encoded content hash.
pub const CONTENT_HASH_LEN: usize = 64;

/// Compute the content hash of a field value.
pub fn content_hash(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_fixed_length() {
        assert_eq!(content_hash("").len(), CONTENT_HASH_LEN);
        assert_eq!(content_hash("bonjour").len(), CONTENT_HASH_LEN);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
        assert_ne!(content_hash("hello"), content_hash("hello "));
    }
}
