//! Content fingerprints used to recognise repeated broadcasts.

use sha2::{Digest, Sha256};

/// Separator placed between title and content before hashing.
const SEPARATOR: &str = "||";

/// Hex-encoded SHA-256 over `title || "||" || content`.
///
/// Identical inputs always produce the same string.
///
/// # Examples
/// ```
/// let a = matchcast_common::content_fingerprint("Football APP", "TeamA vs TeamB");
/// let b = matchcast_common::content_fingerprint("Football APP", "TeamA vs TeamB");
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn content_fingerprint(title: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(SEPARATOR.as_bytes());
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_messages_hash_identically() {
        let a = content_fingerprint("Hello", "World");
        let b = content_fingerprint("Hello", "World");
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn different_title_or_content_changes_hash() {
        let base = content_fingerprint("Hello", "World");
        assert_ne!(base, content_fingerprint("Hola", "World"));
        assert_ne!(base, content_fingerprint("Hello", "Mundo"));
    }

    #[test]
    fn matches_manual_concatenation() {
        let expected = hex::encode(Sha256::digest(b"Football APP||TeamA vs TeamB - LIVE"));
        assert_eq!(
            content_fingerprint("Football APP", "TeamA vs TeamB - LIVE"),
            expected
        );
    }
}
