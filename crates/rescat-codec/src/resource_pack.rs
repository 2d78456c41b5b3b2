//! # Resource Pack Lists
//!
//! Header of a single-file container: one concatenated data blob preceded
//! by this list. Each resource records its byte offset into the blob and
//! the length and hash of the stored (compressed) bytes.
//!
//! `data_offset` is always a fixed 8-byte field right after the salt, so a
//! reader can find the blob without decoding the rest of the header, and a
//! writer can compute the header length before knowing the offset.

use rescat_core::ContentHash;
use serde::{Deserialize, Serialize};

use crate::cipher::StringKey;
use crate::envelope::ListKind;
use crate::error::CodecError;
use crate::model::{
    check_resource_references, read_file_systems, write_file_systems, FileSystemEntry,
    ResourceEntry,
};
use crate::version::{FormatVersion, VersionListCodec};
use crate::wire::{Reader, Writer};

/// One resource inside the data blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedResource {
    /// Name, variant, extension, load type, length and hash.
    #[serde(flatten)]
    pub entry: ResourceEntry,
    /// Byte offset into the data blob.
    pub offset: u64,
    /// Stored length.
    pub compressed_length: u32,
    /// Stored hash.
    pub compressed_hash: ContentHash,
}

impl PackedResource {
    /// The byte range of this resource within the data blob.
    pub fn range(&self) -> std::ops::Range<u64> {
        self.offset..self.offset.saturating_add(u64::from(self.compressed_length))
    }
}

/// A ResourcePack version list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePackVersionList {
    /// Absolute file offset of the data blob.
    pub data_offset: u64,
    /// Length of the data blob.
    pub data_length: u64,
    /// Hash of the data blob.
    pub data_hash: ContentHash,
    /// Resources stored in the blob.
    pub resources: Vec<PackedResource>,
    /// File system table (V2 only).
    pub file_systems: Vec<FileSystemEntry>,
}

impl ResourcePackVersionList {
    /// Read `data_offset` from an encoded body without decoding the rest.
    pub fn peek_data_offset(body: &[u8]) -> Result<u64, CodecError> {
        // The field width is the same in every version.
        let mut r = Reader::new(body, FormatVersion::V0);
        r.read_key()?;
        r.read_fixed_u64("data offset")
    }

    /// Check that every resource lies inside the blob.
    pub fn validate(&self) -> Result<(), CodecError> {
        for resource in &self.resources {
            if resource.range().end > self.data_length {
                return Err(CodecError::InvalidList(format!(
                    "resource {} spans {}..{} past the {}-byte data blob",
                    resource.entry.full_name(),
                    resource.range().start,
                    resource.range().end,
                    self.data_length
                )));
            }
        }
        check_resource_references(&self.file_systems, &[], self.resources.len())
    }
}

impl VersionListCodec for ResourcePackVersionList {
    const KIND: ListKind = ListKind::ResourcePack;

    fn encode(&self, version: FormatVersion, salt: &StringKey) -> Result<Vec<u8>, CodecError> {
        version.check_resource_count(self.resources.len())?;
        self.validate()?;

        let mut w = Writer::new(version);
        w.write_key(salt);
        w.write_fixed_u64(self.data_offset)?;
        w.write_long(self.data_length)?;
        w.write_hash(self.data_hash)?;
        w.write_count("resource count", self.resources.len())?;
        for resource in &self.resources {
            resource.entry.write_head(&mut w, salt)?;
            w.write_long(resource.offset)?;
            w.write_int(resource.compressed_length)?;
            w.write_hash(resource.compressed_hash)?;
        }
        write_file_systems(&mut w, salt, &self.file_systems)?;
        Ok(w.into_bytes())
    }

    fn decode(bytes: &[u8], version: FormatVersion) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes, version);
        let salt = r.read_key()?;
        let data_offset = r.read_fixed_u64("data offset")?;
        let data_length = r.read_long("data length")?;
        let data_hash = r.read_hash("data hash")?;
        let count = r.read_count("resource count")?;
        version.check_resource_count(count)?;
        let mut resources = Vec::with_capacity(count);
        for _ in 0..count {
            let entry = ResourceEntry::read_head(&mut r, &salt)?;
            let offset = r.read_long("resource offset")?;
            let compressed_length = r.read_int("compressed length")?;
            let compressed_hash = r.read_hash("compressed hash")?;
            resources.push(PackedResource {
                entry,
                offset,
                compressed_length,
                compressed_hash,
            });
        }
        let file_systems = read_file_systems(&mut r, &salt)?;
        r.finish()?;

        let list = Self {
            data_offset,
            data_length,
            data_hash,
            resources,
            file_systems,
        };
        list.validate()?;
        Ok(list)
    }
}
