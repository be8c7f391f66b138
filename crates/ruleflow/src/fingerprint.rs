//! Program-identity fingerprint.

use sha1::{Digest, Sha1};

/// Hex SHA-1 of the raw bytes of a program-description source.
///
/// The batch runner stores this per job and per batch to detect program
/// drift between runs; the engine only computes it, it never interprets it.
pub fn source_fingerprint(source: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(source);
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(
            source_fingerprint(b""),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(
            source_fingerprint(b"The quick brown fox jumps over the lazy dog"),
            "2fd4e1c67a2d28fced849ee1bb76e7391b93eb12"
        );
    }

    #[test]
    fn test_distinct_sources_differ() {
        assert_ne!(source_fingerprint(b"a"), source_fingerprint(b"b"));
    }
}
