//! Deterministic structural hashing.
//!
//! Provides domain-separated, length-prefixed SHA-256 hashing used for graph
//! fingerprints and audit commit identifiers. Fingerprints are stable across
//! fresh builds: they depend only on canonical (sorted) serializations, never
//! on wall-clock time or process-global counters.
//!
//! # Citations
//! - SHA-256: NIST FIPS 180-4 (2015)
//! - Domain separation & length prefixing: Bernstein et al., "How to hash into elliptic curves" (2009)

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A 256-bit hash value.
///
/// Wraps a byte array for type safety; equality and ordering are on the raw
/// bytes.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashValue(pub [u8; 32]);

impl HashValue {
    /// Creates a zero hash (all zeros).
    #[inline]
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Creates a hash from a raw byte array.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw byte array.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Computes SHA-256 of the given data with domain separation.
    ///
    /// The digest input is `b"RGR:" || domain || b":v1" || length_prefix(data) || data`
    /// where the length prefix is a 64-bit little-endian byte count.
    pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"RGR:");
        hasher.update(domain);
        hasher.update(b":v1");
        let len = data.len() as u64;
        hasher.update(len.to_le_bytes());
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Renders the full hash as lowercase hex.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in &self.0 {
            out.push_str(&format!("{:02x}", byte));
        }
        out
    }
}

impl std::fmt::Display for HashValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "HashValue({:02x}{:02x}{:02x}{:02x}…)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let a = HashValue::hash_with_domain(b"TEST", b"payload");
        let b = HashValue::hash_with_domain(b"TEST", b"payload");
        assert_eq!(a, b);
    }

    #[test]
    fn domains_separate() {
        let a = HashValue::hash_with_domain(b"LEFT", b"payload");
        let b = HashValue::hash_with_domain(b"RIGHT", b"payload");
        assert_ne!(a, b);
    }

    #[test]
    fn hex_rendering() {
        let zero = HashValue::zero();
        assert_eq!(zero.to_hex().len(), 64);
        assert!(zero.to_hex().chars().all(|c| c == '0'));
    }
}
