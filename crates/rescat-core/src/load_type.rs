//! # Load Types
//!
//! The load type tells the runtime loader how a resource payload is stored
//! and whether it must be decrypted before use. It is written as a single
//! byte tag in every version list format.

use serde::{Deserialize, Serialize};

/// Number of leading payload bytes obfuscated by the "quick" load types.
pub const QUICK_ENCRYPT_LENGTH: usize = 220;

/// How a resource is loaded at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    /// Loaded directly from a file.
    #[default]
    LoadFromFile,
    /// Read into memory, then loaded.
    LoadFromMemory,
    /// Read into memory, first bytes XOR-decrypted, then loaded.
    LoadFromMemoryAndQuickDecrypt,
    /// Read into memory, fully XOR-decrypted, then loaded.
    LoadFromMemoryAndDecrypt,
    /// Raw binary file, handed to the caller as bytes.
    LoadFromBinary,
    /// Raw binary file, first bytes XOR-decrypted.
    LoadFromBinaryAndQuickDecrypt,
    /// Raw binary file, fully XOR-decrypted.
    LoadFromBinaryAndDecrypt,
}

/// How much of a payload is XOR-obfuscated for a load type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Obfuscation {
    /// Payload is stored as-is.
    None,
    /// Only the first [`QUICK_ENCRYPT_LENGTH`] bytes are obfuscated.
    Quick,
    /// The whole payload is obfuscated.
    Full,
}

impl LoadType {
    /// All load types in tag order.
    pub const ALL: [LoadType; 7] = [
        Self::LoadFromFile,
        Self::LoadFromMemory,
        Self::LoadFromMemoryAndQuickDecrypt,
        Self::LoadFromMemoryAndDecrypt,
        Self::LoadFromBinary,
        Self::LoadFromBinaryAndQuickDecrypt,
        Self::LoadFromBinaryAndDecrypt,
    ];

    /// The wire tag.
    pub fn tag(&self) -> u8 {
        match self {
            Self::LoadFromFile => 0,
            Self::LoadFromMemory => 1,
            Self::LoadFromMemoryAndQuickDecrypt => 2,
            Self::LoadFromMemoryAndDecrypt => 3,
            Self::LoadFromBinary => 4,
            Self::LoadFromBinaryAndQuickDecrypt => 5,
            Self::LoadFromBinaryAndDecrypt => 6,
        }
    }

    /// Parse a wire tag. Returns `None` for unknown tags.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Whether the payload is a raw binary file rather than a compiled bundle.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            Self::LoadFromBinary | Self::LoadFromBinaryAndQuickDecrypt | Self::LoadFromBinaryAndDecrypt
        )
    }

    /// The payload obfuscation this load type demands.
    pub fn obfuscation(&self) -> Obfuscation {
        match self {
            Self::LoadFromFile | Self::LoadFromMemory | Self::LoadFromBinary => Obfuscation::None,
            Self::LoadFromMemoryAndQuickDecrypt | Self::LoadFromBinaryAndQuickDecrypt => {
                Obfuscation::Quick
            }
            Self::LoadFromMemoryAndDecrypt | Self::LoadFromBinaryAndDecrypt => Obfuscation::Full,
        }
    }
}

impl std::fmt::Display for LoadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::LoadFromFile => "LoadFromFile",
            Self::LoadFromMemory => "LoadFromMemory",
            Self::LoadFromMemoryAndQuickDecrypt => "LoadFromMemoryAndQuickDecrypt",
            Self::LoadFromMemoryAndDecrypt => "LoadFromMemoryAndDecrypt",
            Self::LoadFromBinary => "LoadFromBinary",
            Self::LoadFromBinaryAndQuickDecrypt => "LoadFromBinaryAndQuickDecrypt",
            Self::LoadFromBinaryAndDecrypt => "LoadFromBinaryAndDecrypt",
        };
        f.write_str(name)
    }
}
