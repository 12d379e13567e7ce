//! BLAKE3 content hashing.
//!
//! Used to derive log-safe fingerprints of signed payloads.

use std::fmt;

/// A BLAKE3 hash (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash arbitrary data.
    #[must_use]
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash under a derive-key context for domain separation.
    #[must_use]
    pub fn hash_with_domain(domain: &str, data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(domain);
        hasher.update(data);
        Self(*hasher.finalize().as_bytes())
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 bytes as hex, for log lines.
    #[must_use]
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(ContentHash::hash(b"abc"), ContentHash::hash(b"abc"));
        assert_ne!(ContentHash::hash(b"abc"), ContentHash::hash(b"abd"));
    }

    #[test]
    fn test_domain_separation() {
        let plain = ContentHash::hash(b"data");
        let a = ContentHash::hash_with_domain("agentmesh test a", b"data");
        let b = ContentHash::hash_with_domain("agentmesh test b", b"data");
        assert_ne!(a, b);
        assert_ne!(a, plain);
    }

    #[test]
    fn test_short_hex_is_prefix() {
        let h = ContentHash::hash(b"x");
        assert_eq!(h.short_hex().len(), 16);
        assert!(h.to_hex().starts_with(&h.short_hex()));
    }
}
