//! # Content Hash
//!
//! A 32-bit content hash used to verify resource payloads and to name the
//! hash-addressed copies in the Full output tree.
//!
//! The hash is the first four bytes of the SHA-256 digest of the payload,
//! read little-endian. It is stored as a fixed-width 4-byte field in every
//! version list format, and its little-endian bytes double as the XOR key
//! for per-resource strings and for payload obfuscation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A 32-bit content hash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(u32);

impl ContentHash {
    /// Compute the hash of a byte payload.
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]))
    }

    /// Wrap a raw hash value read from a version list.
    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    /// The raw hash value.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// The little-endian bytes of the hash. Used as a 4-byte XOR key.
    pub const fn to_le_bytes(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Render as 8 lowercase hex digits.
    pub fn to_hex(&self) -> String {
        format!("{:08x}", self.0)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl From<u32> for ContentHash {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
