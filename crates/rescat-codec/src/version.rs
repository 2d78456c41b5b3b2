//! # Format Versions
//!
//! The closed set of binary layouts. Every serializer dispatches with an
//! exhaustive `match` on [`FormatVersion`], so adding a version forces
//! each list kind to grow an encode and a decode path.
//!
//! | Version | Integers | String length | Extension field | File systems | Group indices |
//! |---|---|---|---|---|---|
//! | V0 | fixed 4-byte LE | 1 byte, strings up to 254 bytes | no | no | fixed 2-byte |
//! | V1 | 7-bit varint | varint | yes | no | varint |
//! | V2 | 7-bit varint | varint | yes | yes | varint |
//!
//! Content hashes are a fixed 4-byte field in every version.
//!
//! A string length field stores `len + 1`, with `0` meaning null, so the
//! one-byte V0 field caps strings at 254 bytes.

use serde::{Deserialize, Serialize};

use crate::cipher::{random_salt, StringKey};
use crate::envelope::ListKind;
use crate::error::CodecError;

/// The largest resource count a V0 list can hold.
pub const V0_MAX_RESOURCES: usize = u16::MAX as usize;

/// A version list layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatVersion {
    /// Fixed-width integers, one-byte string lengths, nested asset names.
    V0,
    /// Varints, flat asset table, extension override.
    V1,
    /// V1 plus the file system table.
    V2,
}

impl FormatVersion {
    /// Every version, oldest first.
    pub const ALL: [FormatVersion; 3] = [Self::V0, Self::V1, Self::V2];

    /// The newest version.
    pub const LATEST: FormatVersion = Self::V2;

    /// The version byte used by the file envelope.
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::V0 => 0,
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    /// Parse a version byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::V0),
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            _ => None,
        }
    }

    /// Whether integers are 7-bit varints.
    pub fn uses_varint(&self) -> bool {
        match self {
            Self::V0 => false,
            Self::V1 | Self::V2 => true,
        }
    }

    /// Whether resources carry an extension override string.
    pub fn has_extension(&self) -> bool {
        match self {
            Self::V0 => false,
            Self::V1 | Self::V2 => true,
        }
    }

    /// Whether the file system table is present.
    pub fn has_file_systems(&self) -> bool {
        match self {
            Self::V0 | Self::V1 => false,
            Self::V2 => true,
        }
    }

    /// Reject resource counts the version cannot index.
    pub fn check_resource_count(&self, count: usize) -> Result<(), CodecError> {
        match self {
            Self::V0 if count > V0_MAX_RESOURCES => Err(CodecError::Capacity {
                what: "resource count",
                value: count as u64,
                max: V0_MAX_RESOURCES as u64,
            }),
            Self::V0 | Self::V1 | Self::V2 => Ok(()),
        }
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "V{}", self.as_u8())
    }
}

impl std::str::FromStr for FormatVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v0" | "0" => Ok(Self::V0),
            "v1" | "1" => Ok(Self::V1),
            "v2" | "2" => Ok(Self::V2),
            other => Err(format!("unknown format version {other:?}")),
        }
    }
}

/// Encode and decode one version list kind.
pub trait VersionListCodec: Sized {
    /// The kind tag written by the file envelope.
    const KIND: ListKind;

    /// Encode with an explicit salt.
    fn encode(&self, version: FormatVersion, salt: &StringKey) -> Result<Vec<u8>, CodecError>;

    /// Decode a body produced by [`encode`](Self::encode) for the same version.
    fn decode(bytes: &[u8], version: FormatVersion) -> Result<Self, CodecError>;

    /// Encode with a fresh random salt.
    fn serialize(&self, version: FormatVersion) -> Result<Vec<u8>, CodecError> {
        self.encode(version, &random_salt())
    }

    /// Decode a body. Alias of [`decode`](Self::decode).
    fn deserialize(bytes: &[u8], version: FormatVersion) -> Result<Self, CodecError> {
        Self::decode(bytes, version)
    }
}
