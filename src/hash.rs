// src/hash.rs

//! Content hashing shared by the build-id (C6), the build cache (C7), and
//! the fetched-package layout (C3).
//!
//! SHA-256 is used throughout (a 256-bit digest is required by `spec.md`
//! §4.6 for the build-id itself).

use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// A 256-bit digest, displayed as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest256(pub [u8; 32]);

impl std::fmt::Display for Digest256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// An incremental SHA-256 accumulator used to build the canonical,
/// fixed-order hash over every build-id input (`spec.md` §4.6).
pub struct CanonicalHasher {
    inner: Sha256,
}

impl CanonicalHasher {
    pub fn new() -> Self {
        CanonicalHasher { inner: Sha256::new() }
    }

    /// Feed a length-prefixed field so that e.g. `["ab", "c"]` and
    /// `["a", "bc"]` never collide.
    pub fn update_field(&mut self, bytes: &[u8]) -> &mut Self {
        self.inner.update((bytes.len() as u64).to_le_bytes());
        self.inner.update(bytes);
        self
    }

    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.update_field(s.as_bytes())
    }

    pub fn update_digest(&mut self, d: &Digest256) -> &mut Self {
        self.inner.update(d.0);
        self
    }

    pub fn finalize(self) -> Digest256 {
        let out = self.inner.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&out);
        Digest256(bytes)
    }
}

impl Default for CanonicalHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash the content of a file on disk. Absolute paths are never fed into
/// the hash — only bytes — so moving a checked-out package tree does not
/// change any build-id (`spec.md` §4.6).
pub fn hash_file(path: &Path) -> io::Result<Digest256> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let out = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&out);
    Ok(Digest256(bytes))
}

pub fn hash_bytes(bytes: &[u8]) -> Digest256 {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    let mut b = [0u8; 32];
    b.copy_from_slice(&out);
    Digest256(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_deterministic() {
        assert_eq!(hash_bytes(b"hello"), hash_bytes(b"hello"));
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"hellp"));
    }

    #[test]
    fn length_prefixing_avoids_field_boundary_collisions() {
        let mut a = CanonicalHasher::new();
        a.update_str("ab").update_str("c");
        let mut b = CanonicalHasher::new();
        b.update_str("a").update_str("bc");
        assert_ne!(a.finalize(), b.finalize());
    }
}
