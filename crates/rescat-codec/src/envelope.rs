//! # File Envelope
//!
//! The codec layouts are not self-describing. Files on disk are wrapped
//! in a 4-byte header naming the list kind and format version:
//!
//! ```text
//! +-----+-----+-----+---------+----------------------+
//! | 'R' | 'C' | tag | version | codec body ...       |
//! +-----+-----+-----+---------+----------------------+
//! ```
//!
//! | Kind | Signature |
//! |---|---|
//! | Package | `RCP` |
//! | Updatable | `RCU` |
//! | Local | `RCL` |
//! | ResourcePack | `RCR` |
//!
//! A resource pack file continues with its data blob after the codec body;
//! the body's `data_offset` (absolute in the file) marks where it starts.

use serde::Serialize;

use crate::cipher::StringKey;
use crate::error::CodecError;
use crate::indexed::{PackageVersionList, UpdatableVersionList};
use crate::local::LocalVersionList;
use crate::resource_pack::ResourcePackVersionList;
use crate::version::{FormatVersion, VersionListCodec};

/// Length of the envelope header.
pub const HEADER_LEN: usize = 4;

const MAGIC: [u8; 2] = *b"RC";

/// The four version list kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    /// Full list for standalone deployment.
    Package,
    /// Full list with compressed payload fields.
    Updatable,
    /// Packed resources shipped with the application.
    Local,
    /// Header of a single-file resource pack.
    ResourcePack,
}

impl ListKind {
    /// Every kind.
    pub const ALL: [ListKind; 4] = [
        Self::Package,
        Self::Updatable,
        Self::Local,
        Self::ResourcePack,
    ];

    /// The third signature byte.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Package => b'P',
            Self::Updatable => b'U',
            Self::Local => b'L',
            Self::ResourcePack => b'R',
        }
    }

    /// Parse the third signature byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Updatable => "updatable",
            Self::Local => "local",
            Self::ResourcePack => "resource_pack",
        }
    }
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix a codec body with the envelope header.
pub fn wrap(kind: ListKind, version: FormatVersion, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&MAGIC);
    out.push(kind.tag());
    out.push(version.as_u8());
    out.extend_from_slice(body);
    out
}

/// Parse the envelope header, returning kind, version and the rest.
pub fn split(bytes: &[u8]) -> Result<(ListKind, FormatVersion, &[u8]), CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Envelope(format!(
            "file is {} bytes, shorter than the header",
            bytes.len()
        )));
    }
    if bytes[..2] != MAGIC {
        return Err(CodecError::Envelope("missing RC signature".into()));
    }
    let kind = ListKind::from_tag(bytes[2])
        .ok_or_else(|| CodecError::Envelope(format!("unknown list kind tag {:#04x}", bytes[2])))?;
    let version = FormatVersion::from_u8(bytes[3])
        .ok_or_else(|| CodecError::Envelope(format!("unsupported format version {}", bytes[3])))?;
    Ok((kind, version, &bytes[HEADER_LEN..]))
}

/// Split a resource pack body into its list header and data blob.
pub fn split_resource_pack(body: &[u8]) -> Result<(&[u8], &[u8]), CodecError> {
    let offset = ResourcePackVersionList::peek_data_offset(body)?;
    let header_len = usize::try_from(offset)
        .ok()
        .and_then(|o| o.checked_sub(HEADER_LEN))
        .filter(|len| *len <= body.len())
        .ok_or_else(|| {
            CodecError::Envelope(format!(
                "data offset {offset} outside the {}-byte file",
                body.len() + HEADER_LEN
            ))
        })?;
    Ok(body.split_at(header_len))
}

/// Encode a list with a fresh salt and wrap it.
pub fn write<L: VersionListCodec>(list: &L, version: FormatVersion) -> Result<Vec<u8>, CodecError> {
    Ok(wrap(L::KIND, version, &list.serialize(version)?))
}

/// Encode a list with an explicit salt and wrap it.
pub fn write_with_salt<L: VersionListCodec>(
    list: &L,
    version: FormatVersion,
    salt: &StringKey,
) -> Result<Vec<u8>, CodecError> {
    Ok(wrap(L::KIND, version, &list.encode(version, salt)?))
}

/// Read an enveloped list of a known kind.
pub fn read<L: VersionListCodec>(bytes: &[u8]) -> Result<(L, FormatVersion), CodecError> {
    let (kind, version, body) = split(bytes)?;
    if kind != L::KIND {
        return Err(CodecError::Envelope(format!(
            "expected a {} list, found {kind}",
            L::KIND
        )));
    }
    let body = match kind {
        ListKind::ResourcePack => split_resource_pack(body)?.0,
        ListKind::Package | ListKind::Updatable | ListKind::Local => body,
    };
    Ok((L::deserialize(body, version)?, version))
}

/// A decoded list of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "list", rename_all = "snake_case")]
pub enum AnyVersionList {
    /// A Package list.
    Package(PackageVersionList),
    /// An Updatable list.
    Updatable(UpdatableVersionList),
    /// A Local list.
    Local(LocalVersionList),
    /// A ResourcePack header.
    ResourcePack(ResourcePackVersionList),
}

impl AnyVersionList {
    /// The kind of list held.
    pub fn kind(&self) -> ListKind {
        match self {
            Self::Package(_) => ListKind::Package,
            Self::Updatable(_) => ListKind::Updatable,
            Self::Local(_) => ListKind::Local,
            Self::ResourcePack(_) => ListKind::ResourcePack,
        }
    }

    /// Number of resources in the list.
    pub fn resource_count(&self) -> usize {
        match self {
            Self::Package(l) => l.resources.len(),
            Self::Updatable(l) => l.resources.len(),
            Self::Local(l) => l.resources.len(),
            Self::ResourcePack(l) => l.resources.len(),
        }
    }
}

/// Read an enveloped list of whatever kind the header names.
pub fn read_any(bytes: &[u8]) -> Result<(AnyVersionList, FormatVersion), CodecError> {
    let (kind, version, _) = split(bytes)?;
    let list = match kind {
        ListKind::Package => AnyVersionList::Package(read(bytes)?.0),
        ListKind::Updatable => AnyVersionList::Updatable(read(bytes)?.0),
        ListKind::Local => AnyVersionList::Local(read(bytes)?.0),
        ListKind::ResourcePack => AnyVersionList::ResourcePack(read(bytes)?.0),
    };
    Ok((list, version))
}
