use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

/// Compute the BLAKE3 hash of a byte slice, returning the hex-encoded digest.
#[must_use]
pub fn blake3_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// BLAKE3 over several parts, each length-prefixed so that part boundaries
/// cannot shift between inputs.
#[must_use]
pub fn blake3_parts(parts: &[&[u8]]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.finalize()
}

/// First `len` characters of the URL-safe base64 encoding of the BLAKE3
/// digest of `parts`.
#[must_use]
pub fn short_base64_hash(parts: &[&[u8]], len: usize) -> String {
    let digest = blake3_parts(parts);
    let mut encoded = URL_SAFE_NO_PAD.encode(digest.as_bytes());
    encoded.truncate(len);
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_bytes() {
        let hash = blake3_bytes(b"hello world");
        assert_eq!(
            hash,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn test_parts_are_length_prefixed() {
        assert_ne!(
            blake3_parts(&[b"ab", b"c"]),
            blake3_parts(&[b"a", b"bc"])
        );
    }

    #[test]
    fn test_short_base64_hash() {
        let a = short_base64_hash(&[b"src/App.module.scss", b"app"], 5);
        let b = short_base64_hash(&[b"src/App.module.scss", b"app"], 5);
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
